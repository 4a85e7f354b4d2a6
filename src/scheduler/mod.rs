// SPDX-FileCopyrightText: 2026 GSI Helmholtzzentrum f. Schwerionenforschung GmbH, Darmstadt, Germany
// SPDX-License-Identifier: LGPL-3.0-or-later

//! Scheduler adapters: translate batch-system reports into the cluster model.
//!
//! Architecture:
//! - Slurm: `scontrol show nodes`, `sacct -p`, `sinfo`
//! - Torque/Moab: `mdiag -n -v`, `qstat -f`
//! - Mock: synthetic populations for demos and tests
//!
//! Every adapter is read-only. A malformed record is dropped on its own and
//! never fails the listing it came from.

pub mod command;
pub mod mock;
pub mod parser;
pub mod slurm;
pub mod torque;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cluster::{Job, Node};

pub use mock::MockScheduler;
pub use slurm::SlurmScheduler;
pub use torque::TorqueScheduler;

/// Failure of one adapter query
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchedulerError {
    /// The reporting command could not be run or exited with an error
    #[error("{command} unavailable: {reason}")]
    BackendUnavailable { command: String, reason: String },
    /// The query ran but nothing matched
    #[error("no {what} found in {scope}")]
    NotFound { what: &'static str, scope: String },
}

impl SchedulerError {
    pub fn unavailable(command: impl Into<String>, reason: impl fmt::Display) -> Self {
        SchedulerError::BackendUnavailable {
            command: command.into(),
            reason: reason.to_string(),
        }
    }

    pub fn no_nodes(partition: &str) -> Self {
        SchedulerError::NotFound {
            what: "nodes",
            scope: format!("partition '{}'", partition),
        }
    }
}

pub type SchedulerResult<T> = Result<T, SchedulerError>;

/// The batch systems nodestat can talk to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SchedulerKind {
    Slurm,
    Torque,
    Mock,
}

impl SchedulerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SchedulerKind::Slurm => "slurm",
            SchedulerKind::Torque => "torque",
            SchedulerKind::Mock => "mock",
        }
    }
}

impl fmt::Display for SchedulerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read-only query contract shared by all backends
#[async_trait]
pub trait Scheduler: Send + Sync {
    /// Nodes belonging to `partition`; `NotFound` if none match
    async fn get_nodes(&self, partition: &str) -> SchedulerResult<Vec<Node>>;

    /// Running jobs in `partition`
    async fn get_jobs(&self, partition: &str) -> SchedulerResult<Vec<Job>>;

    /// Running jobs owned by `user`, across partitions
    async fn get_user_jobs(&self, user: &str) -> SchedulerResult<Vec<Job>>;

    /// Selectable partitions, possibly a static catalog
    async fn get_partitions(&self) -> SchedulerResult<Vec<String>>;

    fn system_type(&self) -> SchedulerKind;
}

/// Build the adapter for a scheduler kind
pub fn create_scheduler(kind: SchedulerKind) -> Arc<dyn Scheduler> {
    match kind {
        SchedulerKind::Slurm => Arc::new(SlurmScheduler::new()),
        SchedulerKind::Torque => Arc::new(TorqueScheduler::new()),
        SchedulerKind::Mock => Arc::new(MockScheduler::new()),
    }
}
