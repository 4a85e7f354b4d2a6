// SPDX-FileCopyrightText: 2026 GSI Helmholtzzentrum f. Schwerionenforschung GmbH, Darmstadt, Germany
// SPDX-License-Identifier: LGPL-3.0-or-later

pub mod stats;
pub mod types;

pub use stats::{attach_jobs, compute_stats, rank_nodes};
pub use types::{ClusterStats, Job, JobState, Node, NodeState};
