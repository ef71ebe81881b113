//! Undercut Helper
//!
//! Starts the form by default; `headless` runs a console loop driven by
//! global hotkeys and `once` runs a single action.

use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::Parser;

use undercut_helper::app::{App, Backends, Outcome, Report};
use undercut_helper::cli::{Action, Cli, Command};
use undercut_helper::config::AppConfig;
use undercut_helper::events;
use undercut_helper::history::PriceHistory;
use undercut_helper::{gui, hotkeys, logging, paths};

fn print_reports(reports: &[Report]) {
    let time = chrono::Local::now().format("%H:%M:%S");
    for report in reports {
        println!("{}  {}", time, report.message);
    }
}

fn run_headless(app: &App) -> Result<()> {
    let (sender, receiver) = events::event_queue(events::DEFAULT_CAPACITY);
    let table = hotkeys::bindings(true);
    let help = hotkeys::describe(&table);
    let _listener =
        hotkeys::spawn_listener(sender, table).context("Failed to start hotkey listener")?;

    println!("Undercut Helper (headless)");
    println!("{}", help);

    while let Some(event) = receiver.recv() {
        let outcome = app.handle(event);
        print_reports(&outcome.reports());
        if matches!(outcome, Outcome::Quit) {
            break;
        }
    }
    Ok(())
}

fn run_once(app: &App, action: Action) -> Result<()> {
    match app.handle(action.event()) {
        Outcome::Failed(e) => Err(anyhow!("{} ({})", e, e.hint())),
        Outcome::PointerUnavailable(reason) => Err(anyhow!("Pointer position unavailable: {}", reason)),
        outcome => {
            print_reports(&outcome.reports());
            Ok(())
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    paths::ensure_directories().context("Failed to create log directory")?;
    logging::init(&paths::get_log_file())?;

    let config_path = cli.config_path();
    tracing::info!(path = %config_path.display(), "Loading settings");
    let config = AppConfig::load(&config_path);
    let history = PriceHistory::new(paths::get_history_path());
    let app = Arc::new(App::new(config, config_path, history, Backends::platform()));

    let result = match cli.command() {
        Command::Gui => gui::run_gui(Arc::clone(&app)),
        Command::Headless => run_headless(&app),
        Command::Once { action } => run_once(&app, action),
    };

    if let Err(e) = &result {
        tracing::error!("{:#}", e);
    }
    tracing::info!("=== Session ended ===");
    result
}
