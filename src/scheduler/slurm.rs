// SPDX-FileCopyrightText: 2026 GSI Helmholtzzentrum f. Schwerionenforschung GmbH, Darmstadt, Germany
// SPDX-License-Identifier: LGPL-3.0-or-later

//! Slurm CLI integration: nodes via scontrol, jobs via sacct, partitions via sinfo.

use async_trait::async_trait;
use tracing::debug;

use super::command::run_report;
use super::parser::{expand_hostlist, parse_duration, parse_memory_mb};
use super::{Scheduler, SchedulerError, SchedulerKind, SchedulerResult};
use crate::cluster::{Job, JobState, Node, NodeState};

/// Columns requested from sacct, in order
const SACCT_FORMAT: &str =
    "partition,NodeList,JobID,User,JobName,State,ReqNodes,ReqCPUs,ReqMem,Timelimit,Elapsed,CPUTime";

/// Minimum number of `|`-separated fields in a sacct record
const SACCT_FIELDS: usize = 12;

pub struct SlurmScheduler;

impl SlurmScheduler {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SlurmScheduler {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Scheduler for SlurmScheduler {
    async fn get_nodes(&self, partition: &str) -> SchedulerResult<Vec<Node>> {
        let output = run_report("scontrol", &["show", "nodes"]).await?;
        let nodes = parse_nodes(&output, partition);
        if nodes.is_empty() {
            return Err(SchedulerError::no_nodes(partition));
        }
        Ok(nodes)
    }

    async fn get_jobs(&self, partition: &str) -> SchedulerResult<Vec<Job>> {
        let output = run_report("sacct", &["-a", "-p", "--format", SACCT_FORMAT]).await?;
        Ok(parse_jobs(&output)
            .into_iter()
            .filter(|j| j.state == JobState::Running && j.partition == partition)
            .collect())
    }

    async fn get_user_jobs(&self, user: &str) -> SchedulerResult<Vec<Job>> {
        let output = run_report("sacct", &["-u", user, "-p", "--format", SACCT_FORMAT]).await?;
        Ok(parse_jobs(&output)
            .into_iter()
            .filter(|j| j.state == JobState::Running)
            .collect())
    }

    async fn get_partitions(&self) -> SchedulerResult<Vec<String>> {
        let output = run_report("sinfo", &["-h", "-o", "%P"]).await?;
        Ok(parse_partitions(&output))
    }

    fn system_type(&self) -> SchedulerKind {
        SchedulerKind::Slurm
    }
}

/// Map a Slurm node state (`IDLE`, `MIXED+CLOUD`, `DOWN*`) to the model.
/// Only the part before the first `+` counts; anything unknown is Busy.
pub fn parse_node_state(value: &str) -> NodeState {
    let base = value.split('+').next().unwrap_or(value);
    let base = base.trim_end_matches(['*', '~', '#', '!', '%', '$', '@', '^', '-']);

    match base.to_lowercase().as_str() {
        "idle" => NodeState::Idle,
        "allocated" | "alloc" | "mixed" | "mix" => NodeState::Running,
        "down" => NodeState::Down,
        "offline" => NodeState::Offline,
        "drained" | "drain" | "draining" | "drng" => NodeState::Drained,
        _ => NodeState::Busy,
    }
}

/// Parse `scontrol show nodes` output, keeping nodes in `partition`.
///
/// A record starts at each `NodeName=` token, so both the multi-line and
/// the `--oneliner` layouts work.
pub fn parse_nodes(output: &str, partition: &str) -> Vec<Node> {
    split_node_records(output)
        .into_iter()
        .filter_map(|record| {
            let node = parse_node_record(&record);
            if node.is_none() {
                debug!(record = %record.join(" "), "skipping node record without NodeName");
            }
            node
        })
        .filter(|node| node.in_partition(partition))
        .collect()
}

fn split_node_records(output: &str) -> Vec<Vec<&str>> {
    let mut records: Vec<Vec<&str>> = Vec::new();
    for token in output.split_whitespace() {
        if token.starts_with("NodeName=") || records.is_empty() {
            records.push(Vec::new());
        }
        if let Some(record) = records.last_mut() {
            record.push(token);
        }
    }
    records
}

fn parse_node_record(tokens: &[&str]) -> Option<Node> {
    let mut node = Node::new(String::new(), NodeState::Busy);
    let mut has_name = false;

    for token in tokens {
        let Some((key, value)) = token.split_once('=') else {
            continue;
        };
        match key {
            "NodeName" => {
                node.id = value.to_string();
                has_name = !value.is_empty();
            }
            "State" => node.state = parse_node_state(value),
            "CPUAlloc" => node.used_cores = value.parse().unwrap_or(0),
            "CPUTot" => node.total_cores = value.parse().unwrap_or(0),
            "AllocMem" => node.used_mem_mb = value.parse().unwrap_or(0),
            "RealMemory" => node.total_mem_mb = value.parse().unwrap_or(0),
            "Partitions" => {
                node.partitions = value
                    .split(',')
                    .filter(|p| !p.is_empty())
                    .map(String::from)
                    .collect();
            }
            _ => {}
        }
    }

    has_name.then_some(node)
}

/// Map a sacct job state. `CANCELLED by 1234` counts as Cancelled.
pub fn parse_job_state(value: &str) -> JobState {
    let word = value.split_whitespace().next().unwrap_or("");
    match word.to_uppercase().as_str() {
        "RUNNING" | "R" => JobState::Running,
        "PENDING" | "PD" | "REQUEUED" | "SUSPENDED" => JobState::Pending,
        "COMPLETED" | "CD" => JobState::Completed,
        "CANCELLED" | "CA" => JobState::Cancelled,
        "FAILED" | "F" | "TIMEOUT" | "NODE_FAIL" | "OUT_OF_MEMORY" | "BOOT_FAIL" | "DEADLINE"
        | "PREEMPTED" => JobState::Failed,
        _ => JobState::Pending,
    }
}

/// Parse `sacct -p` output (header line first, `|`-separated fields).
/// Job steps and short records are skipped.
pub fn parse_jobs(output: &str) -> Vec<Job> {
    output
        .lines()
        .skip(1)
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| {
            let fields: Vec<&str> = line.split('|').collect();
            if fields.len() < SACCT_FIELDS {
                debug!(line, "skipping short sacct record");
                return None;
            }
            if fields[2].contains('.') {
                return None;
            }
            Some(parse_job_fields(&fields))
        })
        .collect()
}

fn parse_job_fields(fields: &[&str]) -> Job {
    Job {
        id: fields[2].to_string(),
        user: fields[3].to_string(),
        name: fields[4].to_string(),
        state: parse_job_state(fields[5]),
        node_list: expand_hostlist(fields[1]),
        partition: fields[0].to_string(),
        req_nodes: fields[6].parse().unwrap_or(0),
        req_cpus: fields[7].parse().unwrap_or(0),
        req_mem_mb: parse_memory_mb(fields[8]),
        time_limit: parse_duration(fields[9]).unwrap_or_default(),
        elapsed: parse_duration(fields[10]).unwrap_or_default(),
        cpu_time: parse_duration(fields[11]).unwrap_or_default(),
    }
}

/// Parse `sinfo -h -o %P`: one partition per line, default marked with `*`
pub fn parse_partitions(output: &str) -> Vec<String> {
    let mut partitions: Vec<String> = Vec::new();
    for line in output.lines() {
        let name = line.trim().trim_end_matches('*');
        if !name.is_empty() && !partitions.iter().any(|p| p == name) {
            partitions.push(name.to_string());
        }
    }
    partitions
}
