// ABOUTME: Main entry point for agentgrid with TUI and CLI support
//
// Binary: agentgrid
// Usage: agentgrid [--server URL] [--cwd DIR] [--layout L] [--config FILE] [COMMAND]
// - No command: launches the dashboard
// - config: print the resolved configuration

#![allow(missing_docs)]

use agentgrid::app::{App, EventHandler};
use agentgrid::cli::{self, Cli, Commands};
use agentgrid::components::LayoutComponent;
use agentgrid::config::AppConfig;
use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{
        self, DisableBracketedPaste, DisableMouseCapture, EnableBracketedPaste,
        EnableMouseCapture, Event, MouseButton, MouseEventKind,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::Backend, prelude::*, Terminal};
use std::{
    io::{self, IsTerminal},
    time::Duration,
};
use tracing::{error, info};

/// Terminal cleanup utility to ensure proper restoration
fn cleanup_terminal() {
    let _ = disable_raw_mode();
    let _ = execute!(
        io::stdout(),
        LeaveAlternateScreen,
        DisableMouseCapture,
        DisableBracketedPaste
    );
}

/// Unified terminal cleanup that works with a terminal instance
fn cleanup_terminal_with_instance<B: Backend + std::io::Write>(
    terminal: &mut Terminal<B>,
) -> Result<()> {
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture,
        DisableBracketedPaste
    )?;
    terminal.show_cursor()?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_logging();
    setup_panic_handler();

    let args = Cli::parse();
    let config = args.resolve_config()?;

    let result = match args.command {
        Some(Commands::Config { format }) => cli::print_config(&config, format),
        Some(Commands::Tui) | None => run_dashboard(config).await,
    };

    if result.is_err() {
        cleanup_terminal();
    }

    result
}

async fn run_dashboard(config: AppConfig) -> Result<()> {
    info!(
        "Starting agentgrid ({:?} transport, layout {})",
        config.transport.mode, config.ui.default_layout
    );
    let mut app = App::new(config).context("Failed to initialise the dashboard")?;
    app.start();
    let mut layout = LayoutComponent::new();

    let result = run_tui(&mut app, &mut layout).await;
    app.shutdown();
    result
}

async fn run_tui(app: &mut App, layout: &mut LayoutComponent) -> Result<()> {
    if !IsTerminal::is_terminal(&io::stdout()) {
        return Err(anyhow::anyhow!(
            "No TTY detected. This application requires a terminal.\n\
             Try running directly in a terminal instead of redirecting output."
        ));
    }

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(
        stdout,
        EnterAlternateScreen,
        EnableMouseCapture,
        EnableBracketedPaste
    )?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_tui_loop(app, layout, &mut terminal).await;

    if let Err(e) = cleanup_terminal_with_instance(&mut terminal) {
        error!("Failed to cleanup terminal: {}", e);
        cleanup_terminal();
    }

    result
}

async fn run_tui_loop(
    app: &mut App,
    layout: &mut LayoutComponent,
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
) -> Result<()> {
    let tick_rate = Duration::from_millis(app.state.config.ui.tick_rate_ms.max(1));

    loop {
        app.drain_events();

        terminal.draw(|frame| {
            layout.render(frame, &mut app.state);
        })?;

        if crossterm::event::poll(tick_rate)? {
            let app_event = match event::read()? {
                Event::Key(key_event) => EventHandler::handle_key_event(key_event, &mut app.state),
                Event::Paste(text) => EventHandler::handle_paste(text, &mut app.state),
                Event::Mouse(mouse_event) => match mouse_event.kind {
                    MouseEventKind::Down(MouseButton::Left) => {
                        Some(agentgrid::app::AppEvent::MouseClick {
                            x: mouse_event.column,
                            y: mouse_event.row,
                        })
                    }
                    _ => None,
                },
                // Pane sizes are picked up on the next draw
                Event::Resize(_, _) | Event::FocusGained | Event::FocusLost => None,
            };
            if let Some(app_event) = app_event {
                EventHandler::process_event(app_event, &mut app.state);
            }
        }

        if app.state.should_quit {
            info!("Quit requested");
            break;
        }

        // Let background tasks run between polls
        tokio::task::yield_now().await;
    }

    Ok(())
}

fn setup_logging() {
    use std::fs::OpenOptions;
    use std::path::PathBuf;
    use tracing_subscriber::prelude::*;

    let log_dir = dirs::home_dir()
        .map(|home| home.join(".agentgrid").join("logs"))
        .unwrap_or_else(|| PathBuf::from(".agentgrid/logs"));

    let _ = std::fs::create_dir_all(&log_dir);

    let log_file = log_dir.join(format!(
        "agentgrid-{}.jsonl",
        chrono::Local::now().format("%Y%m%d-%H%M%S")
    ));

    // The dashboard owns stdout, so without a log file there is no logging
    let Ok(file) = OpenOptions::new().create(true).append(true).open(&log_file) else {
        return;
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_target(true)
                .with_writer(file)
                .with_ansi(false),
        )
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "agentgrid=info".into()),
        )
        .init();
}

fn setup_panic_handler() {
    std::panic::set_hook(Box::new(|panic_info| {
        // Restore the terminal before reporting
        cleanup_terminal();

        error!("Application panicked: {}", panic_info);
        eprintln!("Application panicked: {}", panic_info);
        eprintln!("Please check the logs for more details.");
    }));
}
