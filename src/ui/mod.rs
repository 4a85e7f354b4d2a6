// SPDX-FileCopyrightText: 2026 GSI Helmholtzzentrum f. Schwerionenforschung GmbH, Darmstadt, Germany
// SPDX-License-Identifier: LGPL-3.0-or-later

mod nodes;

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use crate::app::App;
use crate::refresh::RefreshState;

use nodes::format_bar;

const STATS_BAR_WIDTH: usize = 20;

/// Render the entire UI
pub fn render_ui(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Title bar
            Constraint::Length(2), // Partition summary
            Constraint::Length(1), // Column headers
            Constraint::Min(0),    // Node table
            Constraint::Length(1), // Footer/status
        ])
        .split(frame.area());

    render_title(frame, chunks[0], app);
    render_stats(frame, chunks[1], app);
    nodes::render_column_headers(frame, chunks[2]);
    nodes::render_nodes(frame, chunks[3], app);
    render_footer(frame, chunks[4], app);
}

fn render_title(frame: &mut Frame, area: Rect, app: &App) {
    let title = format!(
        " nodestat - {} @ {} | partition: {} ",
        app.system, app.host, app.active_partition
    );

    let updated = match app.snapshot.timestamp {
        Some(ts) => format!("updated {}", ts.format("%H:%M:%S")),
        None => "no data yet".to_string(),
    };
    let status = match app.refresh_state {
        RefreshState::Ready => format!("{} ", updated),
        state => format!("[{}] {} ", state.as_str(), updated),
    };

    let padding = (area.width as usize).saturating_sub(title.chars().count() + status.len());

    let header_line = Line::from(vec![
        Span::styled(title, Style::default().fg(Color::White).add_modifier(Modifier::BOLD)),
        Span::raw(" ".repeat(padding)),
        Span::styled(status, Style::default().fg(Color::Gray)),
    ]);

    let header = Paragraph::new(header_line).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_stats(frame: &mut Frame, area: Rect, app: &App) {
    let stats = &app.snapshot.stats;
    let label = Style::default().fg(Color::Gray);

    let cores = Line::from(vec![
        Span::styled(format!(" Nodes {:>4}/{:<4} avail ", stats.avail_nodes, stats.total_nodes), label),
        Span::styled(" CPU ", label),
        Span::styled(
            format_bar(usage(stats.used_cores, stats.total_cores), STATS_BAR_WIDTH),
            Style::default().fg(Color::Green),
        ),
        Span::raw(format!(
            " {} used / {} total, {} free",
            stats.used_cores, stats.total_cores, stats.avail_cores
        )),
    ]);

    let memory = Line::from(vec![
        Span::raw(" ".repeat(23)),
        Span::styled(" MEM ", label),
        Span::styled(
            format_bar(usage(stats.used_mem_gb, stats.total_mem_gb), STATS_BAR_WIDTH),
            Style::default().fg(Color::Cyan),
        ),
        Span::raw(format!(
            " {} GB used / {} GB total, {} GB free",
            stats.used_mem_gb, stats.total_mem_gb, stats.avail_mem_gb
        )),
    ]);

    frame.render_widget(Paragraph::new(vec![cores, memory]), area);
}

fn usage(used: i64, total: i64) -> f64 {
    if total <= 0 {
        return 0.0;
    }
    (used as f64 / total as f64).clamp(0.0, 1.0)
}

fn render_footer(frame: &mut Frame, area: Rect, app: &App) {
    let text = if let Some(ref err) = app.snapshot.error {
        Span::styled(format!(" Error: {} ", err), Style::default().fg(Color::Red))
    } else {
        let count = app.snapshot.nodes.len();
        let pos = if count > 0 { app.selected + 1 } else { 0 };
        let (running, mine) = app.job_counts();
        Span::styled(
            format!(
                " {}/{} | {} running ({} yours) | q:quit  j/k:nav  r:refresh  b/m/p,1-9:partition ",
                pos, count, running, mine
            ),
            Style::default().fg(Color::Gray),
        )
    };

    frame.render_widget(Paragraph::new(Line::from(text)), area);
}
