// SPDX-FileCopyrightText: 2026 GSI Helmholtzzentrum f. Schwerionenforschung GmbH, Darmstadt, Germany
// SPDX-License-Identifier: LGPL-3.0-or-later

//! nodestat - live node occupancy dashboard for HPC clusters.
//!
//! Single-threaded async architecture:
//! - Scheduler queries run as spawned tasks and report back over a channel
//! - Terminal events via crossterm EventStream
//! - Render and refresh intervals via tokio timers
//! - All multiplexed via tokio::select!

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use crossterm::{
    event::{Event, EventStream, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use futures::StreamExt;
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{info, warn};

mod app;
mod cluster;
mod config;
mod logging;
mod refresh;
mod scheduler;
mod ui;

use app::App;
use config::{Config, DEFAULT_PARTITION};
use logging::{init_logging, LogTarget};
use refresh::{Message, Orchestrator, RefreshState};
use scheduler::{create_scheduler, Scheduler, SchedulerKind};
use ui::render_ui;

#[derive(Parser, Debug)]
#[command(name = "nodestat")]
#[command(about = "Live node occupancy dashboard for Slurm and Torque clusters")]
#[command(version)]
struct Args {
    /// Partition (queue) to show at startup
    #[arg(short = 'q', long, default_value = DEFAULT_PARTITION)]
    partition: String,

    /// Batch system to query
    #[arg(short, long, value_enum, default_value_t = SchedulerKind::Slurm)]
    scheduler: SchedulerKind,

    /// Refresh interval in seconds
    #[arg(short, long, default_value = "30")]
    refresh: u64,

    /// User whose jobs are highlighted (default: $USER)
    #[arg(short, long)]
    user: Option<String>,

    /// Write logs to this file (the TUI discards them otherwise)
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Print one snapshot as JSON and exit
    #[arg(long)]
    once: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(LogTarget::select(args.log_file.as_deref(), args.once))?;

    let config = Config::new(args.scheduler, &args.partition, args.refresh)?
        .with_user(args.user)
        .with_log_file(args.log_file)
        .with_once(args.once);

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    rt.block_on(run(config))
}

async fn run(mut config: Config) -> Result<()> {
    let scheduler = create_scheduler(config.scheduler);
    info!(
        scheduler = %config.scheduler,
        partition = %config.partition,
        user = %config.user,
        log_file = ?config.log_file,
        "starting"
    );

    // Partition discovery is best-effort; the defaults still work for hotkeys
    match scheduler.get_partitions().await {
        Ok(partitions) => config.set_partitions(partitions),
        Err(e) => {
            warn!(error = %e, "partition discovery failed, using defaults");
            config.set_partitions(Vec::new());
        }
    }

    if config.once {
        run_once(scheduler, &config).await
    } else {
        run_tui(scheduler, &config).await
    }
}

/// Fetch a single snapshot and print it
async fn run_once(scheduler: Arc<dyn Scheduler>, config: &Config) -> Result<()> {
    let (mut orchestrator, mut rx) = Orchestrator::new(scheduler, config);
    orchestrator.handle(Message::Refresh);

    while orchestrator.state() != RefreshState::Ready {
        let msg = rx.recv().await.context("refresh task vanished")?;
        orchestrator.handle(msg);
    }

    let snapshot = orchestrator.snapshot();
    println!("{}", serde_json::to_string_pretty(snapshot.as_ref())?);

    if let Some(ref err) = snapshot.error {
        bail!("refresh failed: {}", err);
    }
    Ok(())
}

async fn run_tui(scheduler: Arc<dyn Scheduler>, config: &Config) -> Result<()> {
    let (mut orchestrator, mut rx) = Orchestrator::new(scheduler, config);
    let mut app = App::new(
        orchestrator.snapshot(),
        config.partitions.clone(),
        orchestrator.system_type(),
    );

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_event_loop(&mut terminal, &mut app, &mut orchestrator, &mut rx, config).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

async fn run_event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    orchestrator: &mut Orchestrator,
    rx: &mut mpsc::UnboundedReceiver<Message>,
    config: &Config,
) -> Result<()> {
    let mut event_stream = EventStream::new();

    let mut render_interval = interval(Duration::from_millis(100));
    render_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    // First tick fires immediately and performs the initial load
    let mut refresh_interval = interval(config.refresh_interval);
    refresh_interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;

            _ = render_interval.tick() => {
                app.sync(orchestrator);
                terminal.draw(|f| render_ui(f, app))?;
            }

            Some(msg) = rx.recv() => {
                orchestrator.handle(msg);
            }

            _ = refresh_interval.tick() => {
                orchestrator.handle(Message::Tick);
            }

            Some(event_result) = event_stream.next() => {
                if let Ok(Event::Key(key)) = event_result {
                    let page = terminal.size()?.height.saturating_sub(6) as usize;
                    if let Some(msg) = handle_key(app, key.code, key.modifiers, page) {
                        orchestrator.handle(msg);
                    }
                }
            }
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}

/// Apply navigation keys to the app; return a control message for the rest
fn handle_key(app: &mut App, code: KeyCode, modifiers: KeyModifiers, page: usize) -> Option<Message> {
    match (code, modifiers) {
        (KeyCode::Char('q'), _) | (KeyCode::Char('c'), KeyModifiers::CONTROL) => {
            app.should_quit = true;
        }
        (KeyCode::PageUp, _) | (KeyCode::Char('u'), KeyModifiers::CONTROL) => app.page_up(page),
        (KeyCode::PageDown, _) | (KeyCode::Char('d'), KeyModifiers::CONTROL) => app.page_down(page),
        (KeyCode::Up, _) | (KeyCode::Char('k'), _) => app.select_prev(),
        (KeyCode::Down, _) | (KeyCode::Char('j'), _) => app.select_next(),
        (KeyCode::Home, _) | (KeyCode::Char('g'), _) => app.select_first(),
        (KeyCode::End, _) | (KeyCode::Char('G'), _) => app.select_last(),
        (KeyCode::Char('r'), _) | (KeyCode::Char(' '), _) => return Some(Message::Refresh),
        (KeyCode::Char(c), _) => {
            return app.partition_for_key(c).map(Message::SwitchPartition);
        }
        _ => {}
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::refresh::Snapshot;

    fn test_app() -> App {
        App::new(
            Arc::new(Snapshot::empty("batch")),
            vec!["batch".into(), "long".into()],
            SchedulerKind::Mock,
        )
    }

    #[test]
    fn test_args_defaults() {
        let args = Args::parse_from(["nodestat"]);
        assert_eq!(args.partition, "batch");
        assert_eq!(args.scheduler, SchedulerKind::Slurm);
        assert_eq!(args.refresh, 30);
        assert!(args.user.is_none());
        assert!(!args.once);
    }

    #[test]
    fn test_args_flags() {
        let args = Args::parse_from(["nodestat", "-q", "gpu_q", "-s", "torque", "-r", "5", "-u", "bob"]);
        assert_eq!(args.partition, "gpu_q");
        assert_eq!(args.scheduler, SchedulerKind::Torque);
        assert_eq!(args.refresh, 5);
        assert_eq!(args.user.as_deref(), Some("bob"));
    }

    #[test]
    fn test_quit_keys() {
        let mut app = test_app();
        assert!(handle_key(&mut app, KeyCode::Char('q'), KeyModifiers::NONE, 10).is_none());
        assert!(app.should_quit);

        let mut app = test_app();
        handle_key(&mut app, KeyCode::Char('c'), KeyModifiers::CONTROL, 10);
        assert!(app.should_quit);
    }

    #[test]
    fn test_control_keys() {
        let mut app = test_app();
        assert!(matches!(
            handle_key(&mut app, KeyCode::Char('r'), KeyModifiers::NONE, 10),
            Some(Message::Refresh)
        ));
        assert!(matches!(
            handle_key(&mut app, KeyCode::Char('m'), KeyModifiers::NONE, 10),
            Some(Message::SwitchPartition(ref p)) if p == "highmem_q"
        ));
        assert!(matches!(
            handle_key(&mut app, KeyCode::Char('2'), KeyModifiers::NONE, 10),
            Some(Message::SwitchPartition(ref p)) if p == "long"
        ));
        assert!(handle_key(&mut app, KeyCode::Char('x'), KeyModifiers::NONE, 10).is_none());
        assert!(!app.should_quit);
    }

    #[tokio::test]
    async fn test_once_with_mock() {
        let config = Config::new(SchedulerKind::Mock, "gpu_q", 30).unwrap();
        let scheduler: Arc<dyn Scheduler> = Arc::new(scheduler::MockScheduler::with_seed(1));
        assert!(run_once(scheduler, &config).await.is_ok());

        let config = Config::new(SchedulerKind::Mock, "debug_q", 30).unwrap();
        let scheduler: Arc<dyn Scheduler> = Arc::new(scheduler::MockScheduler::with_seed(1));
        assert!(run_once(scheduler, &config).await.is_err());
    }
}
