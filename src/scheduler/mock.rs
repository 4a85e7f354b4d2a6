// SPDX-FileCopyrightText: 2026 GSI Helmholtzzentrum f. Schwerionenforschung GmbH, Darmstadt, Germany
// SPDX-License-Identifier: LGPL-3.0-or-later

//! Synthetic scheduler for demos and for running without a cluster.
//!
//! Populations are redrawn on every call, so each refresh shows new data.
//! Used resources are drawn per state and are not clamped afterwards.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{Scheduler, SchedulerError, SchedulerKind, SchedulerResult};
use crate::cluster::{Job, JobState, Node, NodeState};
use crate::cluster::types::MB_PER_GB;

const USERS: [&str; 8] = ["alice", "bob", "carol", "dave", "eve", "frank", "grace", "henry"];

/// Weighted state draw: Running is twice as likely as the others
const STATES: [NodeState; 5] = [
    NodeState::Idle,
    NodeState::Running,
    NodeState::Running,
    NodeState::Down,
    NodeState::Busy,
];

/// Size and resource ranges of one synthetic partition
struct PartitionProfile {
    prefix: &'static str,
    nodes: usize,
    /// Base and random span of the core count
    cores: (u32, u32),
    /// Base and random span of memory in GB
    mem_gb: (u64, u64),
}

fn profile(partition: &str) -> Option<PartitionProfile> {
    let profile = match partition {
        "batch" => PartitionProfile { prefix: "batch", nodes: 25, cores: (32, 32), mem_gb: (128, 256) },
        "highmem_q" => PartitionProfile { prefix: "highmem", nodes: 8, cores: (48, 16), mem_gb: (512, 1024) },
        "gpu_q" => PartitionProfile { prefix: "gpu", nodes: 6, cores: (40, 20), mem_gb: (256, 256) },
        _ => return None,
    };
    Some(profile)
}

pub struct MockScheduler {
    rng: Mutex<StdRng>,
}

impl MockScheduler {
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Deterministic populations for tests
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    fn with_rng<T>(&self, f: impl FnOnce(&mut StdRng) -> T) -> T {
        // A panic while holding the lock leaves the generator usable
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut rng)
    }
}

impl Default for MockScheduler {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Scheduler for MockScheduler {
    async fn get_nodes(&self, partition: &str) -> SchedulerResult<Vec<Node>> {
        let profile = profile(partition).ok_or_else(|| SchedulerError::no_nodes(partition))?;
        Ok(self.with_rng(|rng| {
            (0..profile.nodes)
                .map(|i| synth_node(rng, &profile, partition, i))
                .collect()
        }))
    }

    async fn get_jobs(&self, partition: &str) -> SchedulerResult<Vec<Job>> {
        let profile = profile(partition).ok_or_else(|| SchedulerError::NotFound {
            what: "jobs",
            scope: format!("partition '{}'", partition),
        })?;
        Ok(self.with_rng(|rng| {
            let count = rng.gen_range(10..30);
            (0..count)
                .map(|i| {
                    let user = USERS[rng.gen_range(0..USERS.len())];
                    let mut job = synth_job(rng, user, format!("job_{}", i + 1), partition);
                    job.req_nodes = rng.gen_range(1..5);
                    job.req_cpus = rng.gen_range(8..40);
                    job.req_mem_mb = rng.gen_range(16..144) * MB_PER_GB;
                    let host = rng.gen_range(1..=profile.nodes);
                    job.node_list = vec![format!("{}{:03}", profile.prefix, host)];
                    job
                })
                .collect()
        }))
    }

    async fn get_user_jobs(&self, user: &str) -> SchedulerResult<Vec<Job>> {
        Ok(self.with_rng(|rng| {
            let count = rng.gen_range(0..4);
            (0..count)
                .map(|i| {
                    let mut job = synth_job(rng, user, format!("my_job_{}", i + 1), "batch");
                    job.req_nodes = 1;
                    job.req_cpus = rng.gen_range(4..20);
                    job.req_mem_mb = rng.gen_range(8..72) * MB_PER_GB;
                    job.node_list = vec![format!("batch{:03}", rng.gen_range(1..=10))];
                    job
                })
                .collect()
        }))
    }

    async fn get_partitions(&self) -> SchedulerResult<Vec<String>> {
        Ok(["batch", "highmem_q", "gpu_q", "debug_q"]
            .iter()
            .map(|p| p.to_string())
            .collect())
    }

    fn system_type(&self) -> SchedulerKind {
        SchedulerKind::Mock
    }
}

fn synth_node(rng: &mut StdRng, profile: &PartitionProfile, partition: &str, index: usize) -> Node {
    let mut node = Node::new(
        format!("{}{:03}", profile.prefix, index + 1),
        STATES[rng.gen_range(0..STATES.len())],
    );
    node.partitions = vec![partition.to_string()];
    node.total_cores = profile.cores.0 + rng.gen_range(0..profile.cores.1);
    node.total_mem_mb = (profile.mem_gb.0 + rng.gen_range(0..profile.mem_gb.1)) * MB_PER_GB;

    match node.state {
        NodeState::Idle => {
            node.used_mem_mb = rng.gen_range(0..node.total_mem_mb / 10);
        }
        NodeState::Running => {
            node.used_cores = rng.gen_range(0..node.total_cores);
            node.used_mem_mb = rng.gen_range(0..node.total_mem_mb);
        }
        NodeState::Busy => {
            node.used_cores = node.total_cores;
            node.used_mem_mb = node.total_mem_mb - rng.gen_range(0..node.total_mem_mb / 4);
        }
        _ => {}
    }

    if node.state == NodeState::Running && node.used_cores > 0 {
        let jobs = rng.gen_range(1..=3);
        node.jobs = (0..jobs)
            .map(|_| (100_000 + rng.gen_range(0..999_999)).to_string())
            .collect();
    }

    node
}

fn synth_job(rng: &mut StdRng, user: &str, name: String, partition: &str) -> Job {
    let mut job = Job::new((100_000 + rng.gen_range(0..999_999)).to_string(), JobState::Running);
    job.user = user.to_string();
    job.name = name;
    job.partition = partition.to_string();
    job.time_limit = Duration::from_secs(rng.gen_range(1..=7) * 86_400);
    job.elapsed = Duration::from_secs(rng.gen_range(0..86_400));
    job.cpu_time = job.elapsed * job.req_cpus.max(1);
    job
}
