// SPDX-FileCopyrightText: 2026 GSI Helmholtzzentrum f. Schwerionenforschung GmbH, Darmstadt, Germany
// SPDX-License-Identifier: LGPL-3.0-or-later

//! Torque/Moab integration: nodes via `mdiag -n -v`, jobs via `qstat -f`.

use async_trait::async_trait;
use tracing::debug;

use super::command::run_report;
use super::parser::{collapse_spaces, parse_duration, parse_memory_mb};
use super::{Scheduler, SchedulerError, SchedulerKind, SchedulerResult};
use crate::cluster::{Job, JobState, Node, NodeState};

/// Torque has no cheap partition discovery; queues are a fixed catalog.
const QUEUES: [&str; 4] = ["batch", "highmem_q", "gpu_q", "s_interq"];

/// Bracketed mdiag values that are not classes
const PLACEHOLDERS: [&str; 3] = ["NONE", "DEFAULT", "ALL"];

/// Marker that opens a job block in `qstat -f` output
const JOB_MARKER: &str = "Job Id:";

pub struct TorqueScheduler;

impl TorqueScheduler {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TorqueScheduler {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Scheduler for TorqueScheduler {
    async fn get_nodes(&self, partition: &str) -> SchedulerResult<Vec<Node>> {
        let output = run_report("mdiag", &["-n", "-v"]).await?;
        let nodes = parse_nodes(&output, partition);
        if nodes.is_empty() {
            return Err(SchedulerError::no_nodes(partition));
        }
        Ok(nodes)
    }

    async fn get_jobs(&self, partition: &str) -> SchedulerResult<Vec<Job>> {
        let output = run_report("qstat", &["-f", partition]).await?;
        Ok(parse_jobs(&output)
            .into_iter()
            .filter(|j| j.state == JobState::Running)
            .collect())
    }

    async fn get_user_jobs(&self, user: &str) -> SchedulerResult<Vec<Job>> {
        let output = run_report("qstat", &["-f"]).await?;
        Ok(parse_jobs(&output)
            .into_iter()
            .filter(|j| j.state == JobState::Running && j.user == user)
            .collect())
    }

    async fn get_partitions(&self) -> SchedulerResult<Vec<String>> {
        Ok(QUEUES.iter().map(|q| q.to_string()).collect())
    }

    fn system_type(&self) -> SchedulerKind {
        SchedulerKind::Torque
    }
}

pub fn parse_node_state(value: &str) -> NodeState {
    match value.to_lowercase().as_str() {
        "free" | "idle" => NodeState::Idle,
        "running" => NodeState::Running,
        "busy" => NodeState::Busy,
        "down" => NodeState::Down,
        "drained" => NodeState::Drained,
        "offline" => NodeState::Offline,
        _ => NodeState::Busy,
    }
}

/// Parse `mdiag -n -v` output, keeping nodes whose class list names `partition`.
///
/// Columns: `name state avail:total-procs avail:total-memory(KB) ... [class]...`
pub fn parse_nodes(output: &str, partition: &str) -> Vec<Node> {
    output
        .lines()
        .filter_map(|line| {
            let classes = parse_classes(line);
            if !classes.iter().any(|c| c == partition) {
                return None;
            }
            let node = parse_node_line(line, classes);
            if node.is_none() {
                debug!(line, "skipping short mdiag record");
            }
            node
        })
        .collect()
}

/// Extract `[batch][gpu_q 4:4]` style class tokens from a node line
fn parse_classes(line: &str) -> Vec<String> {
    let mut classes = Vec::new();
    let mut rest = line;
    while let Some(open) = rest.find('[') {
        let Some(close) = rest[open..].find(']') else {
            break;
        };
        let inner = &rest[open + 1..open + close];
        let name = inner
            .split(|c: char| c == ' ' || c == ':')
            .next()
            .unwrap_or("");
        if !name.is_empty() && !PLACEHOLDERS.contains(&name) {
            classes.push(name.to_string());
        }
        rest = &rest[open + close + 1..];
    }
    classes
}

fn parse_node_line(line: &str, partitions: Vec<String>) -> Option<Node> {
    let line = collapse_spaces(line.trim());
    let fields: Vec<&str> = line.split(' ').collect();
    if fields.len() < 4 {
        return None;
    }

    let mut node = Node::new(fields[0], parse_node_state(fields[1]));
    node.partitions = partitions;

    // Procs: available:total
    if let Some((avail, total)) = parse_pair(fields[2]) {
        node.total_cores = total as u32;
        node.used_cores = total.saturating_sub(avail) as u32;
    }

    // Memory: available:total in KB
    if let Some((avail, total)) = parse_pair(fields[3]) {
        node.total_mem_mb = total / 1000;
        node.used_mem_mb = node.total_mem_mb.saturating_sub(avail / 1000);
    }

    Some(node)
}

fn parse_pair(field: &str) -> Option<(u64, u64)> {
    let (avail, total) = field.split_once(':')?;
    Some((avail.parse().ok()?, total.parse().ok()?))
}

pub fn parse_job_state(value: &str) -> JobState {
    match value.trim() {
        "R" | "E" => JobState::Running,
        "C" => JobState::Completed,
        _ => JobState::Pending,
    }
}

/// Parse `qstat -f` output into jobs of every state.
///
/// Blocks start at `Job Id:` and run until the next marker or end of input.
pub fn parse_jobs(output: &str) -> Vec<Job> {
    let mut blocks: Vec<Vec<&str>> = Vec::new();
    for line in output.lines() {
        if line.contains(JOB_MARKER) {
            blocks.push(Vec::new());
        }
        if let Some(block) = blocks.last_mut() {
            block.push(line);
        }
    }

    blocks
        .iter()
        .filter_map(|block| {
            let job = parse_job_block(block);
            if job.is_none() {
                debug!(lines = block.len(), "skipping qstat block without job id");
            }
            job
        })
        .collect()
}

/// Fold `key = value` attributes, joining tab-indented continuation lines
fn collect_attributes<'a>(lines: &[&'a str]) -> Vec<(&'a str, String)> {
    let mut attrs: Vec<(&str, String)> = Vec::new();
    for line in lines {
        if let Some((key, value)) = line.split_once(" = ") {
            attrs.push((key.trim(), value.trim().to_string()));
        } else if line.starts_with('\t') {
            if let Some((_, value)) = attrs.last_mut() {
                value.push_str(line.trim());
            }
        }
    }
    attrs
}

fn parse_job_block(lines: &[&str]) -> Option<Job> {
    let header = lines.first()?;
    let id = header.split_once(':')?.1.trim();
    if id.is_empty() {
        return None;
    }

    let mut job = Job::new(id, JobState::Pending);

    for (key, value) in collect_attributes(&lines[1..]) {
        match key {
            "Job_Name" => job.name = value,
            "Job_Owner" => {
                job.user = value.split('@').next().unwrap_or("").to_string();
            }
            "job_state" => job.state = parse_job_state(&value),
            "queue" => job.partition = value,
            "exec_host" => job.node_list = parse_exec_host(&value),
            "Resource_List.nodect" => job.req_nodes = value.parse().unwrap_or(0),
            "Resource_List.ncpus" => job.req_cpus = value.parse().unwrap_or(0),
            "Resource_List.mem" => job.req_mem_mb = parse_memory_mb(&value),
            "Resource_List.walltime" => job.time_limit = parse_duration(&value).unwrap_or_default(),
            "resources_used.walltime" => job.elapsed = parse_duration(&value).unwrap_or_default(),
            "resources_used.cput" => job.cpu_time = parse_duration(&value).unwrap_or_default(),
            _ => {}
        }
    }

    Some(job)
}

/// `n01/0-3+n02/0+n01/4` -> `[n01, n02]`
fn parse_exec_host(value: &str) -> Vec<String> {
    let mut hosts: Vec<String> = Vec::new();
    for slot in value.split('+') {
        let host = slot.split('/').next().unwrap_or("").trim();
        if !host.is_empty() && !hosts.iter().any(|h| h == host) {
            hosts.push(host.to_string());
        }
    }
    hosts
}
