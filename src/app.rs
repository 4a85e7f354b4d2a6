// SPDX-FileCopyrightText: 2026 GSI Helmholtzzentrum f. Schwerionenforschung GmbH, Darmstadt, Germany
// SPDX-License-Identifier: LGPL-3.0-or-later

use std::sync::Arc;

use crate::refresh::{Orchestrator, RefreshState, Snapshot};
use crate::scheduler::SchedulerKind;

/// Presentation state of the dashboard.
///
/// Holds only what the renderer needs beyond the published snapshot:
/// cursor position and the partition catalog for hotkeys.
pub struct App {
    /// Latest snapshot handed over by the orchestrator
    pub snapshot: Arc<Snapshot>,
    /// Selected row in the node table
    pub selected: usize,
    /// Scroll offset
    pub scroll: usize,
    /// Should quit
    pub should_quit: bool,
    /// Partitions reachable via number keys, in order
    pub partitions: Vec<String>,
    /// Host the dashboard runs on
    pub host: String,
    pub system: SchedulerKind,
    /// Partition being fetched; the snapshot may still show the previous one
    pub active_partition: String,
    pub refresh_state: RefreshState,
}

impl App {
    pub fn new(snapshot: Arc<Snapshot>, partitions: Vec<String>, system: SchedulerKind) -> Self {
        let host = hostname::get()
            .map(|h| h.to_string_lossy().into_owned())
            .unwrap_or_else(|_| "localhost".to_string());

        Self {
            active_partition: snapshot.partition.clone(),
            snapshot,
            selected: 0,
            scroll: 0,
            should_quit: false,
            partitions,
            host,
            system,
            refresh_state: RefreshState::Uninitialized,
        }
    }

    /// Pull the published state out of the orchestrator
    pub fn sync(&mut self, orchestrator: &Orchestrator) {
        self.update(orchestrator.snapshot());
        self.active_partition = orchestrator.partition().to_string();
        self.refresh_state = orchestrator.state();
    }

    /// Take a new snapshot, keeping the cursor inside the node list
    pub fn update(&mut self, snapshot: Arc<Snapshot>) {
        if snapshot.partition != self.snapshot.partition {
            self.selected = 0;
            self.scroll = 0;
        }
        self.snapshot = snapshot;
        self.selected = self.selected.min(self.len().saturating_sub(1));
    }

    fn len(&self) -> usize {
        self.snapshot.nodes.len()
    }

    /// Partition behind a hotkey: b/m/p for the standard queues,
    /// 1-9 for the n-th catalog entry
    pub fn partition_for_key(&self, key: char) -> Option<String> {
        match key {
            'b' => Some("batch".to_string()),
            'm' => Some("highmem_q".to_string()),
            'p' => Some("gpu_q".to_string()),
            '1'..='9' => {
                let index = key.to_digit(10)? as usize - 1;
                self.partitions.get(index).cloned()
            }
            _ => None,
        }
    }

    /// Running jobs in the partition and how many belong to the user
    pub fn job_counts(&self) -> (usize, usize) {
        let mine = self
            .snapshot
            .user_jobs
            .iter()
            .filter(|j| j.partition == self.snapshot.partition)
            .count();
        (self.snapshot.jobs.len(), mine)
    }

    /// Move selection up
    pub fn select_prev(&mut self) {
        if self.selected > 0 {
            self.selected -= 1;
        }
    }

    /// Move selection down
    pub fn select_next(&mut self) {
        if self.selected + 1 < self.len() {
            self.selected += 1;
        }
    }

    pub fn page_up(&mut self, page_size: usize) {
        self.selected = self.selected.saturating_sub(page_size);
    }

    pub fn page_down(&mut self, page_size: usize) {
        self.selected = (self.selected + page_size).min(self.len().saturating_sub(1));
    }

    /// Jump to top
    pub fn select_first(&mut self) {
        self.selected = 0;
    }

    /// Jump to bottom
    pub fn select_last(&mut self) {
        self.selected = self.len().saturating_sub(1);
    }
}
