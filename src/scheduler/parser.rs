// SPDX-FileCopyrightText: 2026 GSI Helmholtzzentrum f. Schwerionenforschung GmbH, Darmstadt, Germany
// SPDX-License-Identifier: LGPL-3.0-or-later

//! Field-level parsers shared by the scheduler adapters.
//!
//! These never fail a record: an unparseable quantity degrades to zero.

use std::time::Duration;

/// Parse a memory quantity into megabytes.
///
/// Accepts Slurm style (`4000M`, `16Gn`, `2Gc`, `512`) and Torque style
/// (`4gb`, `2048mb`, `1048576kb`). Units are decimal: 1G = 1000M.
pub fn parse_memory_mb(value: &str) -> u64 {
    let mut s = value.trim().to_ascii_uppercase();
    if s.is_empty() {
        return 0;
    }

    // Torque byte suffix and Slurm per-node/per-cpu qualifiers
    if let Some(stripped) = s.strip_suffix('B') {
        s = stripped.to_string();
    }
    if s.ends_with('N') || s.ends_with('C') {
        s.pop();
    }

    let (number, scale) = match s.chars().last() {
        Some('K') => (&s[..s.len() - 1], 0.001),
        Some('M') => (&s[..s.len() - 1], 1.0),
        Some('G') => (&s[..s.len() - 1], 1000.0),
        Some('T') => (&s[..s.len() - 1], 1_000_000.0),
        _ => (s.as_str(), 1.0),
    };

    number
        .parse::<f64>()
        .map(|v| (v * scale).max(0.0) as u64)
        .unwrap_or(0)
}

/// Parse `[days-]HH:MM:SS`, `MM:SS` or plain seconds.
///
/// Returns `None` for limits like `UNLIMITED` and for malformed input.
pub fn parse_duration(value: &str) -> Option<Duration> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    let (days, clock) = match value.split_once('-') {
        Some((d, rest)) => (d.parse::<u64>().ok()?, rest),
        None => (0, value),
    };

    let parts = clock
        .split(':')
        .map(|p| p.parse::<u64>().ok())
        .collect::<Option<Vec<u64>>>()?;

    let (hours, minutes, seconds) = match parts.as_slice() {
        [h, m, s] => (*h, *m, *s),
        [m, s] => (0, *m, *s),
        [s] => (0, 0, *s),
        _ => return None,
    };

    Some(Duration::from_secs(
        days * 86_400 + hours * 3_600 + minutes * 60 + seconds,
    ))
}

/// Expand a compact Slurm hostlist (`node[001-003,007],gpu01`) into
/// individual host names. Zero padding of range bounds is preserved.
pub fn expand_hostlist(list: &str) -> Vec<String> {
    let list = list.trim();
    if list.is_empty() || list == "None assigned" || list == "(null)" {
        return Vec::new();
    }

    split_top_level(list)
        .into_iter()
        .flat_map(expand_host_expr)
        .collect()
}

/// Split on commas that are not inside brackets
fn split_top_level(list: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;

    for (i, c) in list.char_indices() {
        match c {
            '[' => depth += 1,
            ']' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(&list[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&list[start..]);
    parts.into_iter().filter(|p| !p.is_empty()).collect()
}

fn expand_host_expr(expr: &str) -> Vec<String> {
    let (Some(open), Some(close)) = (expr.find('['), expr.find(']')) else {
        return vec![expr.to_string()];
    };
    if close < open {
        return vec![expr.to_string()];
    }

    let prefix = &expr[..open];
    let body = &expr[open + 1..close];
    let suffixes = expand_host_expr(&expr[close + 1..]);

    let mut hosts = Vec::new();
    for item in body.split(',') {
        for middle in expand_range(item) {
            for suffix in &suffixes {
                hosts.push(format!("{}{}{}", prefix, middle, suffix));
            }
        }
    }
    hosts
}

fn expand_range(item: &str) -> Vec<String> {
    let Some((lo, hi)) = item.split_once('-') else {
        return vec![item.to_string()];
    };
    let (Ok(start), Ok(end)) = (lo.parse::<u64>(), hi.parse::<u64>()) else {
        return vec![item.to_string()];
    };
    let width = lo.len();
    (start..=end)
        .map(|n| format!("{:0width$}", n, width = width))
        .collect()
}

/// Replace every run of spaces with a single space
pub fn collapse_spaces(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut prev_space = false;
    for c in line.chars() {
        if c == ' ' {
            if !prev_space {
                out.push(c);
            }
            prev_space = true;
        } else {
            out.push(c);
            prev_space = false;
        }
    }
    out
}
