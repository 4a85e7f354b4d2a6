// SPDX-FileCopyrightText: 2026 GSI Helmholtzzentrum f. Schwerionenforschung GmbH, Darmstadt, Germany
// SPDX-License-Identifier: LGPL-3.0-or-later

//! Refresh orchestration.
//!
//! The orchestrator is the only writer of the published [`Snapshot`]. Each
//! trigger (timer tick, manual refresh, partition switch) spawns one fetch
//! task; the task posts its result back as a [`Message`] and the event loop
//! feeds it to [`Orchestrator::handle`]. Attempts are never cancelled or
//! coalesced.
//!
//! Every trigger takes the next sequence number. A completed attempt is
//! published only if it is newer than the last one published, so a slow
//! attempt can never overwrite the result of a later trigger.

use std::sync::Arc;

use chrono::{DateTime, Local};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::cluster::{attach_jobs, compute_stats, rank_nodes, ClusterStats, Job, Node};
use crate::config::Config;
use crate::scheduler::{Scheduler, SchedulerError, SchedulerKind};

/// Immutable result of one refresh cycle
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    /// Partition the data was fetched for
    pub partition: String,
    /// Ranked, best candidate first
    pub nodes: Vec<Node>,
    pub jobs: Vec<Job>,
    pub user_jobs: Vec<Job>,
    pub stats: ClusterStats,
    /// Shared by everything fetched in the cycle; `None` before the first one
    pub timestamp: Option<DateTime<Local>>,
    /// Error of the latest attempt; the data above is from the last good one
    pub error: Option<String>,
}

impl Snapshot {
    pub fn empty(partition: &str) -> Self {
        Self {
            partition: partition.to_string(),
            nodes: Vec::new(),
            jobs: Vec::new(),
            user_jobs: Vec::new(),
            stats: ClusterStats::default(),
            timestamp: None,
            error: None,
        }
    }

    /// Cross-reference, rank and aggregate one fetch cycle
    pub fn build(
        partition: &str,
        mut nodes: Vec<Node>,
        jobs: Vec<Job>,
        user_jobs: Vec<Job>,
        timestamp: DateTime<Local>,
    ) -> Self {
        attach_jobs(&mut nodes, &jobs);
        let nodes = rank_nodes(nodes);
        let stats = compute_stats(&nodes);
        Self {
            partition: partition.to_string(),
            nodes,
            jobs,
            user_jobs,
            stats,
            timestamp: Some(timestamp),
            error: None,
        }
    }

    /// Copy of this snapshot flagged with a failed attempt
    fn with_error(&self, error: &SchedulerError) -> Self {
        Self {
            error: Some(error.to_string()),
            ..self.clone()
        }
    }

    pub fn user_job_on(&self, node_id: &str) -> bool {
        self.user_jobs.iter().any(|j| j.runs_on(node_id))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshState {
    Uninitialized,
    Loading,
    Ready,
}

impl RefreshState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RefreshState::Uninitialized => "starting",
            RefreshState::Loading => "loading",
            RefreshState::Ready => "ready",
        }
    }
}

#[derive(Debug)]
pub enum Message {
    /// Refresh timer fired
    Tick,
    /// User asked for a refresh
    Refresh,
    SwitchPartition(String),
    FetchCompleted {
        seq: u64,
        result: Result<Snapshot, SchedulerError>,
    },
}

pub struct Orchestrator {
    scheduler: Arc<dyn Scheduler>,
    user: String,
    partition: String,
    state: RefreshState,
    /// Sequence number of the newest trigger
    latest_seq: u64,
    /// Sequence number of the attempt currently published
    applied_seq: u64,
    snapshot: Arc<Snapshot>,
    tx: mpsc::UnboundedSender<Message>,
}

impl Orchestrator {
    pub fn new(
        scheduler: Arc<dyn Scheduler>,
        config: &Config,
    ) -> (Self, mpsc::UnboundedReceiver<Message>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let orchestrator = Self {
            scheduler,
            user: config.user.clone(),
            partition: config.partition.clone(),
            state: RefreshState::Uninitialized,
            latest_seq: 0,
            applied_seq: 0,
            snapshot: Arc::new(Snapshot::empty(&config.partition)),
            tx,
        };
        (orchestrator, rx)
    }

    /// Current published snapshot; never partially updated
    pub fn snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&self.snapshot)
    }

    pub fn state(&self) -> RefreshState {
        self.state
    }

    /// Active partition, which may differ from the snapshot's while loading
    pub fn partition(&self) -> &str {
        &self.partition
    }

    pub fn system_type(&self) -> SchedulerKind {
        self.scheduler.system_type()
    }

    /// Process one message. Must be called from within a tokio runtime.
    pub fn handle(&mut self, msg: Message) {
        match msg {
            Message::Tick | Message::Refresh => self.trigger(),
            Message::SwitchPartition(partition) => {
                if partition != self.partition {
                    info!(from = %self.partition, to = %partition, "switching partition");
                    self.partition = partition;
                }
                self.trigger();
            }
            Message::FetchCompleted { seq, result } => self.complete(seq, result),
        }
    }

    fn trigger(&mut self) {
        self.latest_seq += 1;
        self.state = RefreshState::Loading;

        let seq = self.latest_seq;
        let scheduler = Arc::clone(&self.scheduler);
        let partition = self.partition.clone();
        let user = self.user.clone();
        let tx = self.tx.clone();

        debug!(seq, %partition, "refresh triggered");
        tokio::spawn(async move {
            let result = fetch(scheduler.as_ref(), &partition, &user).await;
            // Receiver gone means the loop is shutting down
            let _ = tx.send(Message::FetchCompleted { seq, result });
        });
    }

    fn complete(&mut self, seq: u64, result: Result<Snapshot, SchedulerError>) {
        if seq <= self.applied_seq {
            debug!(seq, applied = self.applied_seq, "discarding stale refresh result");
            return;
        }
        self.applied_seq = seq;

        self.snapshot = match result {
            Ok(snapshot) => {
                debug!(seq, nodes = snapshot.nodes.len(), jobs = snapshot.jobs.len(), "snapshot published");
                Arc::new(snapshot)
            }
            Err(e) => {
                warn!(seq, error = %e, "refresh failed, keeping previous data");
                Arc::new(self.snapshot.with_error(&e))
            }
        };

        if seq == self.latest_seq {
            self.state = RefreshState::Ready;
        }
    }
}

/// One refresh attempt. Nodes and jobs are mandatory, user jobs best-effort.
async fn fetch(
    scheduler: &dyn Scheduler,
    partition: &str,
    user: &str,
) -> Result<Snapshot, SchedulerError> {
    let (nodes, jobs, user_jobs) = tokio::join!(
        scheduler.get_nodes(partition),
        scheduler.get_jobs(partition),
        scheduler.get_user_jobs(user),
    );

    let nodes = nodes?;
    let jobs = jobs?;
    let user_jobs = user_jobs.unwrap_or_else(|e| {
        debug!(%user, error = %e, "user job query failed, showing none");
        Vec::new()
    });

    Ok(Snapshot::build(partition, nodes, jobs, user_jobs, Local::now()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::cluster::{JobState, NodeState};
    use crate::scheduler::SchedulerResult;

    /// Scheduler with canned answers that tests can swap between refreshes
    struct FakeScheduler {
        nodes: Mutex<SchedulerResult<Vec<Node>>>,
        jobs: Mutex<SchedulerResult<Vec<Job>>>,
        user_jobs: Mutex<SchedulerResult<Vec<Job>>>,
    }

    impl FakeScheduler {
        fn new(nodes: Vec<Node>) -> Self {
            Self {
                nodes: Mutex::new(Ok(nodes)),
                jobs: Mutex::new(Ok(Vec::new())),
                user_jobs: Mutex::new(Ok(Vec::new())),
            }
        }
    }

    #[async_trait]
    impl Scheduler for FakeScheduler {
        async fn get_nodes(&self, _partition: &str) -> SchedulerResult<Vec<Node>> {
            self.nodes.lock().unwrap().clone()
        }

        async fn get_jobs(&self, partition: &str) -> SchedulerResult<Vec<Job>> {
            self.jobs.lock().unwrap().clone().map(|jobs| {
                jobs.into_iter()
                    .filter(|j| j.partition == partition)
                    .collect()
            })
        }

        async fn get_user_jobs(&self, _user: &str) -> SchedulerResult<Vec<Job>> {
            self.user_jobs.lock().unwrap().clone()
        }

        async fn get_partitions(&self) -> SchedulerResult<Vec<String>> {
            Ok(vec!["batch".into()])
        }

        fn system_type(&self) -> SchedulerKind {
            SchedulerKind::Mock
        }
    }

    fn node(id: &str, state: NodeState, total: u32, used: u32, mem_gb: u64, used_gb: u64) -> Node {
        let mut n = Node::new(id, state);
        n.total_cores = total;
        n.used_cores = used;
        n.total_mem_mb = mem_gb * 1000;
        n.used_mem_mb = used_gb * 1000;
        n.partitions = vec!["batch".into()];
        n
    }

    fn setup(fake: Arc<FakeScheduler>) -> (Orchestrator, mpsc::UnboundedReceiver<Message>) {
        let config = Config::new(SchedulerKind::Mock, "batch", 30)
            .unwrap()
            .with_user(Some("alice".into()));
        Orchestrator::new(fake, &config)
    }

    async fn refresh_once(orch: &mut Orchestrator, rx: &mut mpsc::UnboundedReceiver<Message>, msg: Message) {
        orch.handle(msg);
        let done = rx.recv().await.unwrap();
        orch.handle(done);
    }

    #[tokio::test]
    async fn test_state_transitions() {
        let fake = Arc::new(FakeScheduler::new(vec![node("a", NodeState::Idle, 10, 0, 100, 0)]));
        let (mut orch, mut rx) = setup(fake);
        assert_eq!(orch.state(), RefreshState::Uninitialized);
        assert!(orch.snapshot().timestamp.is_none());

        orch.handle(Message::Tick);
        assert_eq!(orch.state(), RefreshState::Loading);

        let done = rx.recv().await.unwrap();
        orch.handle(done);
        assert_eq!(orch.state(), RefreshState::Ready);
        assert!(orch.snapshot().timestamp.is_some());

        orch.handle(Message::Refresh);
        assert_eq!(orch.state(), RefreshState::Loading);
    }

    #[tokio::test]
    async fn test_publishes_ranked_snapshot() {
        let fake = Arc::new(FakeScheduler::new(vec![
            node("a", NodeState::Idle, 10, 0, 100, 0),
            node("b", NodeState::Running, 10, 2, 100, 10),
        ]));
        let (mut orch, mut rx) = setup(fake);
        refresh_once(&mut orch, &mut rx, Message::Refresh).await;

        let snap = orch.snapshot();
        assert_eq!(snap.stats.total_nodes, 2);
        assert_eq!(snap.stats.avail_nodes, 2);
        assert_eq!(snap.stats.total_cores, 20);
        assert_eq!(snap.stats.used_cores, 2);
        assert_eq!(snap.stats.avail_cores, 18);
        assert_eq!(snap.nodes[0].id, "a");
        assert!(snap.error.is_none());
    }

    #[tokio::test]
    async fn test_user_job_failure_is_swallowed() {
        let fake = Arc::new(FakeScheduler::new(vec![node("a", NodeState::Idle, 10, 0, 100, 0)]));
        *fake.user_jobs.lock().unwrap() = Err(SchedulerError::unavailable("sacct", "down"));
        let (mut orch, mut rx) = setup(fake);
        refresh_once(&mut orch, &mut rx, Message::Refresh).await;

        let snap = orch.snapshot();
        assert!(snap.user_jobs.is_empty());
        assert!(snap.error.is_none());
        assert_eq!(snap.nodes.len(), 1);
    }

    #[tokio::test]
    async fn test_node_failure_keeps_previous_data() {
        let fake = Arc::new(FakeScheduler::new(vec![node("a", NodeState::Idle, 10, 0, 100, 0)]));
        let (mut orch, mut rx) = setup(Arc::clone(&fake));
        refresh_once(&mut orch, &mut rx, Message::Refresh).await;
        let before = orch.snapshot();

        *fake.nodes.lock().unwrap() = Err(SchedulerError::unavailable("scontrol", "connection refused"));
        refresh_once(&mut orch, &mut rx, Message::Tick).await;

        let after = orch.snapshot();
        assert_eq!(orch.state(), RefreshState::Ready);
        assert_eq!(after.nodes, before.nodes);
        assert_eq!(after.timestamp, before.timestamp);
        assert_eq!(after.error.as_deref(), Some("scontrol unavailable: connection refused"));

        // Next good attempt clears the error
        *fake.nodes.lock().unwrap() = Ok(vec![node("b", NodeState::Idle, 8, 0, 64, 0)]);
        refresh_once(&mut orch, &mut rx, Message::Refresh).await;
        assert!(orch.snapshot().error.is_none());
        assert_eq!(orch.snapshot().nodes[0].id, "b");
    }

    #[tokio::test]
    async fn test_job_failure_is_mandatory() {
        let fake = Arc::new(FakeScheduler::new(vec![node("a", NodeState::Idle, 10, 0, 100, 0)]));
        *fake.jobs.lock().unwrap() = Err(SchedulerError::NotFound {
            what: "jobs",
            scope: "partition 'batch'".into(),
        });
        let (mut orch, mut rx) = setup(fake);
        refresh_once(&mut orch, &mut rx, Message::Refresh).await;

        let snap = orch.snapshot();
        assert!(snap.nodes.is_empty());
        assert!(snap.error.is_some());
    }

    #[tokio::test]
    async fn test_stale_result_is_discarded() {
        let fake = Arc::new(FakeScheduler::new(Vec::new()));
        let (mut orch, _rx) = setup(fake);
        orch.handle(Message::Refresh);
        orch.handle(Message::Refresh);

        let newer = Snapshot::build("batch", vec![node("new", NodeState::Idle, 4, 0, 8, 0)], Vec::new(), Vec::new(), Local::now());
        let older = Snapshot::build("batch", vec![node("old", NodeState::Idle, 4, 0, 8, 0)], Vec::new(), Vec::new(), Local::now());

        orch.handle(Message::FetchCompleted { seq: 2, result: Ok(newer) });
        assert_eq!(orch.state(), RefreshState::Ready);
        orch.handle(Message::FetchCompleted { seq: 1, result: Ok(older) });
        orch.handle(Message::FetchCompleted {
            seq: 1,
            result: Err(SchedulerError::unavailable("scontrol", "late")),
        });

        let snap = orch.snapshot();
        assert_eq!(snap.nodes[0].id, "new");
        assert!(snap.error.is_none());
    }

    #[tokio::test]
    async fn test_older_result_applied_while_newer_pending() {
        let fake = Arc::new(FakeScheduler::new(Vec::new()));
        let (mut orch, _rx) = setup(fake);
        orch.handle(Message::Refresh);
        orch.handle(Message::Refresh);

        let first = Snapshot::build("batch", vec![node("first", NodeState::Idle, 4, 0, 8, 0)], Vec::new(), Vec::new(), Local::now());
        orch.handle(Message::FetchCompleted { seq: 1, result: Ok(first) });
        assert_eq!(orch.snapshot().nodes[0].id, "first");
        assert_eq!(orch.state(), RefreshState::Loading);
    }

    #[tokio::test]
    async fn test_switch_partition() {
        let fake = Arc::new(FakeScheduler::new(vec![node("g1", NodeState::Idle, 40, 0, 256, 0)]));
        let mut job = Job::new("7", JobState::Running);
        job.partition = "gpu_q".into();
        job.node_list = vec!["g1".into()];
        *fake.jobs.lock().unwrap() = Ok(vec![job]);

        let (mut orch, mut rx) = setup(fake);
        refresh_once(&mut orch, &mut rx, Message::SwitchPartition("gpu_q".into())).await;

        assert_eq!(orch.partition(), "gpu_q");
        let snap = orch.snapshot();
        assert_eq!(snap.partition, "gpu_q");
        assert_eq!(snap.jobs.len(), 1);
        assert_eq!(snap.nodes[0].jobs, vec!["7"]);
    }

    #[tokio::test]
    async fn test_user_job_highlight() {
        let fake = Arc::new(FakeScheduler::new(vec![node("a", NodeState::Running, 10, 2, 100, 10)]));
        let mut mine = Job::new("9", JobState::Running);
        mine.user = "alice".into();
        mine.node_list = vec!["a".into()];
        *fake.user_jobs.lock().unwrap() = Ok(vec![mine]);

        let (mut orch, mut rx) = setup(fake);
        refresh_once(&mut orch, &mut rx, Message::Refresh).await;

        let snap = orch.snapshot();
        assert!(snap.user_job_on("a"));
        assert!(!snap.user_job_on("b"));
    }
}
