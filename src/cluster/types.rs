// SPDX-FileCopyrightText: 2026 GSI Helmholtzzentrum f. Schwerionenforschung GmbH, Darmstadt, Germany
// SPDX-License-Identifier: LGPL-3.0-or-later

//! Scheduler-independent data model shared by all adapters and the UI.
//!
//! Memory is carried in megabytes (1 GB = 1000 MB) so that re-aggregation
//! never accumulates rounding drift; gigabyte views are derived.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Megabytes per gigabyte, matching the schedulers' decimal units.
pub const MB_PER_GB: u64 = 1000;

/// Lifecycle state of a compute node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeState {
    Idle,
    Running,
    Busy,
    Drained,
    Down,
    Offline,
}

impl NodeState {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeState::Idle => "Idle",
            NodeState::Running => "Running",
            NodeState::Busy => "Busy",
            NodeState::Drained => "Drained",
            NodeState::Down => "Down",
            NodeState::Offline => "Offline",
        }
    }
}

impl fmt::Display for NodeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A compute host as reported by the scheduler
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Host name, unique within one scheduler instance
    pub id: String,
    pub state: NodeState,
    pub total_cores: u32,
    /// Allocated cores. May exceed `total_cores` on bad scheduler data.
    pub used_cores: u32,
    pub total_mem_mb: u64,
    pub used_mem_mb: u64,
    /// Partitions (queues) this node belongs to
    pub partitions: Vec<String>,
    /// Ids of jobs currently scheduled on this node
    pub jobs: Vec<String>,
}

impl Node {
    pub fn new(id: impl Into<String>, state: NodeState) -> Self {
        Self {
            id: id.into(),
            state,
            total_cores: 0,
            used_cores: 0,
            total_mem_mb: 0,
            used_mem_mb: 0,
            partitions: Vec::new(),
            jobs: Vec::new(),
        }
    }

    pub fn available_cores(&self) -> u32 {
        self.total_cores.saturating_sub(self.used_cores)
    }

    pub fn available_mem_mb(&self) -> u64 {
        self.total_mem_mb.saturating_sub(self.used_mem_mb)
    }

    pub fn available_mem_gb(&self) -> u64 {
        self.available_mem_mb() / MB_PER_GB
    }

    pub fn total_mem_gb(&self) -> u64 {
        self.total_mem_mb / MB_PER_GB
    }

    pub fn used_mem_gb(&self) -> u64 {
        self.used_mem_mb / MB_PER_GB
    }

    /// Fraction of cores in use, clamped to [0, 1]
    pub fn cpu_utilization(&self) -> f64 {
        ratio(self.used_cores as u64, self.total_cores as u64)
    }

    /// Fraction of memory in use, clamped to [0, 1]
    pub fn mem_utilization(&self) -> f64 {
        ratio(self.used_mem_mb, self.total_mem_mb)
    }

    /// A node can take more work when it is Idle or Running and still has
    /// both free cores and at least one free gigabyte of memory.
    pub fn is_available(&self) -> bool {
        matches!(self.state, NodeState::Idle | NodeState::Running)
            && self.available_cores() > 0
            && self.available_mem_gb() > 0
    }

    pub fn in_partition(&self, partition: &str) -> bool {
        self.partitions.iter().any(|p| p == partition)
    }
}

fn ratio(used: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (used as f64 / total as f64).clamp(0.0, 1.0)
}

/// Job state, normalized across schedulers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobState {
    Running,
    Pending,
    Completed,
    Cancelled,
    Failed,
}

impl JobState {
    /// Short code as printed by squeue/qstat
    pub fn code(&self) -> &'static str {
        match self {
            JobState::Running => "R",
            JobState::Pending => "PD",
            JobState::Completed => "C",
            JobState::Cancelled => "CA",
            JobState::Failed => "F",
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A scheduled unit of work. Value snapshot, never updated in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub user: String,
    pub name: String,
    pub state: JobState,
    /// Individual host names the job occupies
    pub node_list: Vec<String>,
    pub partition: String,
    pub req_nodes: u32,
    pub req_cpus: u32,
    pub req_mem_mb: u64,
    pub time_limit: Duration,
    pub elapsed: Duration,
    pub cpu_time: Duration,
}

impl Job {
    pub fn new(id: impl Into<String>, state: JobState) -> Self {
        Self {
            id: id.into(),
            user: String::new(),
            name: String::new(),
            state,
            node_list: Vec::new(),
            partition: String::new(),
            req_nodes: 0,
            req_cpus: 0,
            req_mem_mb: 0,
            time_limit: Duration::ZERO,
            elapsed: Duration::ZERO,
            cpu_time: Duration::ZERO,
        }
    }

    pub fn runs_on(&self, node_id: &str) -> bool {
        self.node_list.iter().any(|n| n == node_id)
    }
}

/// Aggregate over a node list at one instant.
///
/// Counts are signed: `used > total` on bad input shows up as a negative
/// available count instead of wrapping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterStats {
    pub total_nodes: i64,
    pub avail_nodes: i64,
    pub total_cores: i64,
    pub used_cores: i64,
    pub avail_cores: i64,
    pub total_mem_gb: i64,
    pub used_mem_gb: i64,
    pub avail_mem_gb: i64,
}
