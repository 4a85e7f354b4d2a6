// SPDX-FileCopyrightText: 2026 GSI Helmholtzzentrum f. Schwerionenforschung GmbH, Darmstadt, Germany
// SPDX-License-Identifier: LGPL-3.0-or-later

//! Run scheduler reporting commands and capture their output.

use std::process::Stdio;

use tokio::process::Command;
use tracing::debug;

use super::{SchedulerError, SchedulerResult};

/// Run `program args..` and return its stdout.
///
/// Spawn failures and non-zero exits both map to `BackendUnavailable`.
/// No timeout is applied; the call lasts as long as the command does.
pub async fn run_report(program: &str, args: &[&str]) -> SchedulerResult<String> {
    debug!(program, ?args, "running scheduler report");

    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| SchedulerError::unavailable(program, format!("failed to execute: {}", e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let reason = match stderr.trim() {
            "" => output.status.to_string(),
            msg => msg.to_string(),
        };
        return Err(SchedulerError::unavailable(program, reason));
    }

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    debug!(program, bytes = stdout.len(), "report finished");
    Ok(stdout)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_binary_is_unavailable() {
        let err = run_report("nodestat-no-such-binary", &[]).await.unwrap_err();
        assert!(matches!(
            err,
            SchedulerError::BackendUnavailable { ref command, .. } if command == "nodestat-no-such-binary"
        ));
    }
}
