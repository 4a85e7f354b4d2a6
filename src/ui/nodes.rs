// SPDX-FileCopyrightText: 2026 GSI Helmholtzzentrum f. Schwerionenforschung GmbH, Darmstadt, Germany
// SPDX-License-Identifier: LGPL-3.0-or-later

//! Ranked node table.

use ratatui::{
    layout::{Constraint, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Row, Table},
    Frame,
};

use crate::app::App;
use crate::cluster::{Node, NodeState};

const SELECTED_BG: Color = Color::DarkGray;
const HEADER_BG: Color = Color::Blue;
const HEADER_FG: Color = Color::White;
const USER_MARK: &str = "★";

/// Column widths
const COL_NODE: u16 = 14;
const COL_STATE: u16 = 9;
const COL_CPU: u16 = 17;
const COL_MEM: u16 = 17;
const COL_AVAIL_CPU: u16 = 10;
const COL_AVAIL_MEM: u16 = 11;
const BAR_WIDTH: usize = 10;

fn constraints(width: u16) -> [Constraint; 7] {
    let jobs_width = width.saturating_sub(
        COL_NODE + COL_STATE + COL_CPU + COL_MEM + COL_AVAIL_CPU + COL_AVAIL_MEM + 7,
    );
    [
        Constraint::Length(COL_NODE),
        Constraint::Length(COL_STATE),
        Constraint::Length(COL_CPU),
        Constraint::Length(COL_MEM),
        Constraint::Length(COL_AVAIL_CPU),
        Constraint::Length(COL_AVAIL_MEM),
        Constraint::Min(jobs_width),
    ]
}

pub fn render_column_headers(frame: &mut Frame, area: Rect) {
    let header_style = Style::default().fg(HEADER_FG).bg(HEADER_BG).add_modifier(Modifier::BOLD);

    let headers = Row::new(vec![
        Cell::from(format!("{:<w$}", "NODE", w = COL_NODE as usize)),
        Cell::from(format!("{:<w$}", "STATE", w = COL_STATE as usize)),
        Cell::from(format!("{:<w$}", "CPU", w = COL_CPU as usize)),
        Cell::from(format!("{:<w$}", "MEM", w = COL_MEM as usize)),
        Cell::from(format!("{:>w$}", "FREE CPU", w = COL_AVAIL_CPU as usize)),
        Cell::from(format!("{:>w$}", "FREE MEM", w = COL_AVAIL_MEM as usize)),
        Cell::from("JOBS"),
    ])
    .style(header_style);

    frame.render_widget(Table::new(vec![headers], constraints(area.width)).style(header_style), area);
}

pub fn render_nodes(frame: &mut Frame, area: Rect, app: &App) {
    let visible_height = area.height as usize;

    // Keep the selection visible
    let scroll = if app.selected < app.scroll {
        app.selected
    } else if app.selected >= app.scroll + visible_height {
        app.selected + 1 - visible_height
    } else {
        app.scroll
    };

    let rows: Vec<Row> = app
        .snapshot
        .nodes
        .iter()
        .enumerate()
        .skip(scroll)
        .take(visible_height)
        .map(|(idx, node)| {
            let mine = app.snapshot.user_job_on(&node.id);
            render_node_row(node, idx == app.selected, mine)
        })
        .collect();

    let table = Table::new(rows, constraints(area.width)).block(Block::default().borders(Borders::NONE));
    frame.render_widget(table, area);
}

fn state_color(state: NodeState) -> Color {
    match state {
        NodeState::Idle => Color::Green,
        NodeState::Running => Color::Yellow,
        NodeState::Busy => Color::LightRed,
        NodeState::Drained => Color::Magenta,
        NodeState::Down => Color::Red,
        NodeState::Offline => Color::DarkGray,
    }
}

fn render_node_row(node: &Node, selected: bool, mine: bool) -> Row<'static> {
    let row_style = if selected {
        Style::default().bg(SELECTED_BG)
    } else {
        Style::default()
    };
    let dim = !node.is_available();

    let name = if mine {
        Line::from(vec![
            Span::styled(USER_MARK, Style::default().fg(Color::Yellow)),
            Span::styled(
                format!("{} ", node.id),
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            ),
        ])
    } else {
        Line::from(Span::styled(
            format!(" {}", node.id),
            Style::default().fg(if dim { Color::Gray } else { Color::White }),
        ))
    };

    let cpu = format!(
        "{} {:>3.0}%",
        format_bar(node.cpu_utilization(), BAR_WIDTH),
        node.cpu_utilization() * 100.0
    );
    let mem = format!(
        "{} {:>3.0}%",
        format_bar(node.mem_utilization(), BAR_WIDTH),
        node.mem_utilization() * 100.0
    );

    let jobs = match node.jobs.len() {
        0 => "-".to_string(),
        1..=3 => node.jobs.join(","),
        n => format!("{},+{}", node.jobs[..2].join(","), n - 2),
    };

    Row::new(vec![
        Cell::from(name),
        Cell::from(format!("{:<w$}", node.state.as_str(), w = COL_STATE as usize))
            .style(Style::default().fg(state_color(node.state))),
        Cell::from(cpu).style(Style::default().fg(Color::Green)),
        Cell::from(mem).style(Style::default().fg(Color::Cyan)),
        Cell::from(format!(
            "{:>w$}",
            format!("{}/{}", node.available_cores(), node.total_cores),
            w = COL_AVAIL_CPU as usize
        )),
        Cell::from(format!(
            "{:>w$}",
            format!("{} GB", node.available_mem_gb()),
            w = COL_AVAIL_MEM as usize
        )),
        Cell::from(jobs).style(Style::default().fg(Color::Blue)),
    ])
    .style(row_style)
}

/// Fixed-width usage bar, `ratio` clamped to [0, 1]
pub fn format_bar(ratio: f64, width: usize) -> String {
    let ratio = if ratio.is_nan() { 0.0 } else { ratio.clamp(0.0, 1.0) };
    let filled = (ratio * width as f64).round() as usize;
    format!("{}{}", "█".repeat(filled), "░".repeat(width - filled))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bar() {
        assert_eq!(format_bar(0.0, 4), "░░░░");
        assert_eq!(format_bar(0.5, 4), "██░░");
        assert_eq!(format_bar(1.0, 4), "████");
        assert_eq!(format_bar(0.26, 10), "███░░░░░░░");
    }

    #[test]
    fn test_format_bar_out_of_range() {
        assert_eq!(format_bar(1.7, 3), "███");
        assert_eq!(format_bar(-0.2, 3), "░░░");
        assert_eq!(format_bar(f64::NAN, 3), "░░░");
        assert_eq!(format_bar(0.5, 0), "");
    }

    #[test]
    fn test_bar_width_is_stable() {
        for i in 0..=20 {
            let bar = format_bar(i as f64 / 20.0, BAR_WIDTH);
            assert_eq!(bar.chars().count(), BAR_WIDTH);
        }
    }
}
