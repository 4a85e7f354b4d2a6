// SPDX-FileCopyrightText: 2026 GSI Helmholtzzentrum f. Schwerionenforschung GmbH, Darmstadt, Germany
// SPDX-License-Identifier: LGPL-3.0-or-later

//! Immutable startup configuration.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Result};

use crate::scheduler::SchedulerKind;

/// Partition catalog used until the scheduler reports its own
pub const DEFAULT_PARTITIONS: [&str; 3] = ["batch", "highmem_q", "gpu_q"];

pub const DEFAULT_PARTITION: &str = "batch";

#[derive(Debug, Clone)]
pub struct Config {
    pub scheduler: SchedulerKind,
    /// Partition shown at startup
    pub partition: String,
    /// User whose jobs are highlighted
    pub user: String,
    pub refresh_interval: Duration,
    pub partitions: Vec<String>,
    pub log_file: Option<PathBuf>,
    /// Print one snapshot and exit instead of starting the TUI
    pub once: bool,
}

impl Config {
    pub fn new(scheduler: SchedulerKind, partition: &str, refresh_secs: u64) -> Result<Self> {
        if refresh_secs == 0 {
            bail!("refresh interval must be at least one second");
        }
        if partition.trim().is_empty() {
            bail!("partition name must not be empty");
        }

        Ok(Self {
            scheduler,
            partition: partition.trim().to_string(),
            user: detect_user(None),
            refresh_interval: Duration::from_secs(refresh_secs),
            partitions: DEFAULT_PARTITIONS.iter().map(|p| p.to_string()).collect(),
            log_file: None,
            once: false,
        })
    }

    pub fn with_user(mut self, user: Option<String>) -> Self {
        self.user = detect_user(user);
        self
    }

    pub fn with_log_file(mut self, path: Option<PathBuf>) -> Self {
        self.log_file = path;
        self
    }

    pub fn with_once(mut self, once: bool) -> Self {
        self.once = once;
        self
    }

    /// Replace the catalog with what the scheduler reported.
    ///
    /// An empty report keeps the defaults. The startup partition is always
    /// part of the catalog.
    pub fn set_partitions(&mut self, reported: Vec<String>) {
        if !reported.is_empty() {
            self.partitions = reported;
        }
        if !self.partitions.contains(&self.partition) {
            self.partitions.insert(0, self.partition.clone());
        }
    }
}

/// Explicit user, then `$USER`, then `$LOGNAME`, else "unknown"
pub fn detect_user(explicit: Option<String>) -> String {
    resolve_user(explicit, env::var("USER").ok(), env::var("LOGNAME").ok())
}

fn resolve_user(explicit: Option<String>, user: Option<String>, logname: Option<String>) -> String {
    [explicit, user, logname]
        .into_iter()
        .flatten()
        .map(|u| u.trim().to_string())
        .find(|u| !u.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}
