// SPDX-FileCopyrightText: 2026 GSI Helmholtzzentrum f. Schwerionenforschung GmbH, Darmstadt, Germany
// SPDX-License-Identifier: LGPL-3.0-or-later

//! Derived cluster statistics and the node display order.

use std::cmp::Ordering;

use super::types::{ClusterStats, Job, JobState, Node, NodeState, MB_PER_GB};

/// Weight of one free core against one free gigabyte in the power score.
/// Cores dominate: memory only breaks ties between equal core counts.
pub const CORE_WEIGHT: u64 = 1000;

/// Sum a node list into cluster totals in a single pass.
pub fn compute_stats(nodes: &[Node]) -> ClusterStats {
    let mut stats = ClusterStats::default();
    let mut total_mem_mb: u64 = 0;
    let mut used_mem_mb: u64 = 0;

    for node in nodes {
        stats.total_nodes += 1;
        stats.total_cores += i64::from(node.total_cores);
        stats.used_cores += i64::from(node.used_cores);
        total_mem_mb += node.total_mem_mb;
        used_mem_mb += node.used_mem_mb;

        if node.is_available() {
            stats.avail_nodes += 1;
        }
    }

    stats.total_mem_gb = (total_mem_mb / MB_PER_GB) as i64;
    stats.used_mem_gb = (used_mem_mb / MB_PER_GB) as i64;

    stats.avail_cores = stats.total_cores - stats.used_cores;
    stats.avail_mem_gb = stats.total_mem_gb - stats.used_mem_gb;

    stats
}

/// Composite ranking value for available nodes
pub fn power_score(node: &Node) -> u64 {
    u64::from(node.available_cores()) * CORE_WEIGHT + node.available_mem_gb()
}

/// Position of an unavailable node's state; lower surfaces first.
/// States outside the table (an Idle node without resources) sort last.
fn state_priority(state: NodeState) -> u8 {
    match state {
        NodeState::Running => 0,
        NodeState::Busy => 1,
        NodeState::Drained => 2,
        NodeState::Down => 3,
        NodeState::Offline => 4,
        NodeState::Idle => 5,
    }
}

fn compare_nodes(a: &Node, b: &Node) -> Ordering {
    match (a.is_available(), b.is_available()) {
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (true, true) => power_score(b).cmp(&power_score(a)),
        (false, false) => state_priority(a.state).cmp(&state_priority(b.state)),
    }
}

/// Order nodes for display: available nodes first by descending power
/// score, then unavailable ones by state priority. Stable, so ties keep
/// the adapter's order and ranking a ranked list is a no-op.
pub fn rank_nodes(mut nodes: Vec<Node>) -> Vec<Node> {
    nodes.sort_by(compare_nodes);
    nodes
}

/// Fill empty per-node job lists from the running jobs that name the node.
/// Adapters that already know a node's jobs are left untouched.
pub fn attach_jobs(nodes: &mut [Node], jobs: &[Job]) {
    for node in nodes.iter_mut().filter(|n| n.jobs.is_empty()) {
        node.jobs = jobs
            .iter()
            .filter(|j| j.state == JobState::Running && j.runs_on(&node.id))
            .map(|j| j.id.clone())
            .collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: &str, state: NodeState, cores: (u32, u32), mem_gb: (u64, u64)) -> Node {
        Node {
            total_cores: cores.0,
            used_cores: cores.1,
            total_mem_mb: mem_gb.0 * MB_PER_GB,
            used_mem_mb: mem_gb.1 * MB_PER_GB,
            ..Node::new(id, state)
        }
    }

    fn ids(nodes: &[Node]) -> Vec<&str> {
        nodes.iter().map(|n| n.id.as_str()).collect()
    }

    #[test]
    fn test_compute_stats_scenario() {
        let nodes = vec![
            node("a", NodeState::Idle, (10, 0), (100, 0)),
            node("b", NodeState::Running, (10, 2), (100, 10)),
        ];
        let stats = compute_stats(&nodes);
        assert_eq!(stats.total_nodes, 2);
        assert_eq!(stats.avail_nodes, 2);
        assert_eq!(stats.total_cores, 20);
        assert_eq!(stats.used_cores, 2);
        assert_eq!(stats.avail_cores, 18);
        assert_eq!(stats.total_mem_gb, 200);
        assert_eq!(stats.used_mem_gb, 10);
        assert_eq!(stats.avail_mem_gb, 190);
    }

    #[test]
    fn test_compute_stats_empty() {
        assert_eq!(compute_stats(&[]), ClusterStats::default());
    }

    #[test]
    fn test_available_equals_total_minus_used() {
        let nodes = vec![
            node("a", NodeState::Busy, (8, 12), (16, 20)),
            node("b", NodeState::Down, (64, 0), (256, 0)),
            node("c", NodeState::Running, (32, 31), (128, 127)),
        ];
        let stats = compute_stats(&nodes);
        assert_eq!(stats.avail_cores, stats.total_cores - stats.used_cores);
        assert_eq!(stats.avail_mem_gb, stats.total_mem_gb - stats.used_mem_gb);
        assert!(stats.avail_nodes <= stats.total_nodes);
    }

    #[test]
    fn test_memory_summed_before_rounding() {
        // Three nodes with 1.5 GB each must total 4 GB, not 3
        let nodes: Vec<Node> = (0..3)
            .map(|i| Node {
                total_mem_mb: 1500,
                ..node(&format!("n{}", i), NodeState::Down, (1, 0), (0, 0))
            })
            .collect();
        assert_eq!(compute_stats(&nodes).total_mem_gb, 4);
    }

    #[test]
    fn test_compute_stats_idempotent() {
        let nodes = vec![
            node("a", NodeState::Idle, (10, 0), (100, 0)),
            node("b", NodeState::Drained, (10, 0), (100, 0)),
        ];
        assert_eq!(compute_stats(&nodes), compute_stats(&nodes));
    }

    #[test]
    fn test_rank_memory_breaks_core_tie() {
        let a = node("a", NodeState::Idle, (10, 0), (5, 0));
        let b = node("b", NodeState::Idle, (10, 0), (50, 0));
        assert_eq!(ids(&rank_nodes(vec![a, b])), vec!["b", "a"]);
    }

    #[test]
    fn test_rank_cores_dominate_memory() {
        let a = node("a", NodeState::Idle, (11, 0), (2, 0));
        let b = node("b", NodeState::Idle, (10, 0), (900, 0));
        assert_eq!(ids(&rank_nodes(vec![b, a])), vec!["a", "b"]);
    }

    #[test]
    fn test_rank_available_before_unavailable() {
        let a = node("a", NodeState::Running, (4, 3), (8, 0));
        let b = node("b", NodeState::Busy, (128, 0), (2048, 0));
        assert_eq!(ids(&rank_nodes(vec![b, a])), vec!["a", "b"]);
    }

    #[test]
    fn test_rank_unavailable_by_state_priority() {
        let nodes = vec![
            node("off", NodeState::Offline, (8, 0), (8, 0)),
            node("down", NodeState::Down, (8, 0), (8, 0)),
            node("idle-empty", NodeState::Idle, (0, 0), (8, 0)),
            node("drain", NodeState::Drained, (8, 0), (8, 0)),
            node("busy", NodeState::Busy, (8, 8), (8, 8)),
            node("full", NodeState::Running, (8, 8), (8, 8)),
        ];
        assert_eq!(
            ids(&rank_nodes(nodes)),
            vec!["full", "busy", "drain", "down", "off", "idle-empty"]
        );
    }

    #[test]
    fn test_rank_is_stable_and_idempotent() {
        let nodes = vec![
            node("d1", NodeState::Down, (8, 0), (8, 0)),
            node("x", NodeState::Idle, (8, 0), (8, 0)),
            node("d2", NodeState::Down, (16, 0), (8, 0)),
            node("y", NodeState::Idle, (8, 0), (8, 0)),
        ];
        let ranked = rank_nodes(nodes);
        assert_eq!(ids(&ranked), vec!["x", "y", "d1", "d2"]);
        let again = rank_nodes(ranked.clone());
        assert_eq!(ranked, again);
    }

    #[test]
    fn test_power_score() {
        let n = node("a", NodeState::Idle, (10, 2), (64, 4));
        assert_eq!(power_score(&n), 8 * CORE_WEIGHT + 60);
    }

    #[test]
    fn test_attach_jobs() {
        let mut nodes = vec![
            node("n1", NodeState::Running, (8, 4), (8, 0)),
            Node {
                jobs: vec!["keep".to_string()],
                ..node("n2", NodeState::Running, (8, 4), (8, 0))
            },
        ];
        let mut running = Job::new("10", JobState::Running);
        running.node_list = vec!["n1".to_string(), "n2".to_string()];
        let mut pending = Job::new("11", JobState::Pending);
        pending.node_list = vec!["n1".to_string()];

        attach_jobs(&mut nodes, &[running, pending]);
        assert_eq!(nodes[0].jobs, vec!["10"]);
        assert_eq!(nodes[1].jobs, vec!["keep"]);
    }
}
