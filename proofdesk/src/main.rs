//! proofdesk: terminal console for proofreading review.
//!
//! Entry point for the `proofdesk` binary. Wires together the CLI and config
//! (`cli`, `config`), file logging, the terminal lifecycle (`tui`), the unified
//! event bus (`event`), the backend thread (`worker`), UI state (`app`), and
//! rendering (`ui`).
//!
//! # Startup sequence for `review`
//!
//! 1. Parse the CLI and load the config; problems print to stderr while the
//!    terminal is still ours to write to.
//! 2. `install_panic_hook()` first, so it is the innermost hook.
//! 3. `register_sigterm()`, polled in the event loop.
//! 4. `init_tui()` enters the alternate screen and raw mode.
//! 5. Create the event handler and spawn the backend thread, then request the
//!    worklist item. The session starts in `Loading`.
//!
//! `restore_tui()` runs after the event loop exits. Inside the loop `?` is only
//! used in the Render arm, and the loop breaks rather than returning so restore
//! is always reached.

mod app;
mod cli;
mod config;
mod event;
mod theme;
mod tui;
mod ui;
mod worker;

use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use std::sync::Mutex;

use clap::Parser;
use proofdesk_core::wire::RawWorklistItem;
use proofdesk_core::{Backend, LocalStore, SessionState, WorklistId};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::cli::{BackendKind, Cli, Command};
use crate::config::Config;
use crate::event::AppEvent;
use crate::ui::keybindings::{handle_key, handle_mouse, KeyAction};

const LOG_PATH: &str = ".proofdesk/proofdesk.log";

#[tokio::main]
async fn main() -> std::io::Result<()> {
    let cli = Cli::parse();

    let (config, warning) = config::load(&config::config_path());
    if let Some(warning) = warning {
        eprintln!("proofdesk: {warning}");
    }
    if let Err(err) = init_file_logging(Path::new(LOG_PATH), &config.log_level) {
        eprintln!("proofdesk: logging disabled: {err}");
    }

    match cli.command {
        Command::Import { file, db } => {
            let db = db.unwrap_or_else(|| config.store.path.clone());
            import(&file, &db).await
        }
        Command::Review { worklist_id, backend, api_url, db } => {
            let backend = match resolve_backend(&config, backend, api_url, db) {
                Ok(backend) => backend,
                Err(message) => {
                    eprintln!("proofdesk: {message}");
                    std::process::exit(2);
                }
            };
            run_review(worklist_id, backend, &config).await
        }
    }
}

/// Appends tracing output to `path`; the terminal belongs to the TUI.
/// `RUST_LOG` overrides the configured level.
fn init_file_logging(path: &Path, level: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let log_file = std::fs::OpenOptions::new().create(true).append(true).open(path)?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new(config::DEFAULT_LOG_LEVEL));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(Mutex::new(log_file))
        .init();
    Ok(())
}

/// CLI flags win over the config file.
fn resolve_backend(
    config: &Config,
    kind: Option<BackendKind>,
    api_url: Option<String>,
    db: Option<PathBuf>,
) -> Result<Backend, String> {
    match kind.unwrap_or(config.backend) {
        BackendKind::Http => {
            let base_url = api_url.or_else(|| config.api.base_url.clone()).ok_or_else(|| {
                "no API base URL: pass --api-url or set [api] base_url in the config".to_owned()
            })?;
            let token = std::env::var(config::TOKEN_ENV).ok();
            Ok(Backend::Http { base_url, token })
        }
        BackendKind::Local => {
            Ok(Backend::Local { path: db.unwrap_or_else(|| config.store.path.clone()) })
        }
    }
}

fn ensure_parent_dir(path: &Path) -> std::io::Result<()> {
    match path.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(parent) => std::fs::create_dir_all(parent),
        None => Ok(()),
    }
}

/// `proofdesk import FILE`: loads an exported worklist item into the local store.
async fn import(file: &Path, db: &Path) -> std::io::Result<()> {
    let raw = std::fs::read_to_string(file)?;
    let item: RawWorklistItem = serde_json::from_str(&raw)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

    ensure_parent_dir(db)?;
    let store = LocalStore::open(db).await.map_err(std::io::Error::other)?;
    store.import_item(&item).await.map_err(std::io::Error::other)?;

    info!(worklist_id = item.id, db = %db.display(), "worklist item imported");
    println!(
        "imported worklist item {} ({} issues) into {}",
        item.id,
        item.proofreading_issues.len(),
        db.display()
    );
    Ok(())
}

async fn run_review(worklist_id: WorklistId, backend: Backend, config: &Config) -> std::io::Result<()> {
    if let Backend::Local { path } = &backend {
        ensure_parent_dir(path)?;
    }
    let theme = theme::Theme::from_name(&config.theme);
    let mut state = app::AppState::new(worklist_id);
    info!(worklist_id, backend = %backend.describe(), "starting review");

    tui::install_panic_hook();
    let term_flag = tui::register_sigterm();
    let mut terminal = tui::init_tui()?;

    // Dropping the handler at the end of this function aborts the input task.
    let mut handler = event::EventHandler::new();
    match worker::spawn_api_worker(backend, handler.tx.clone()) {
        Ok(tx) => state.api_tx = Some(tx),
        Err(err) => error!(%err, "cannot spawn backend thread"),
    }
    state.request_load(false);

    'event_loop: loop {
        tokio::select! {
            // Heartbeat: SIGTERM is checked at least every 50ms even when
            // no events arrive.
            _ = tokio::time::sleep(std::time::Duration::from_millis(50)) => {
                if term_flag.load(Ordering::Relaxed) {
                    break 'event_loop;
                }
            }
            maybe_event = handler.rx.recv() => {
                match maybe_event {
                    Some(AppEvent::Render) => {
                        // Exactly one draw() call per Render event.
                        terminal.draw(|frame| ui::render(frame, &mut state, &theme))?;
                    }
                    Some(AppEvent::Key(key)) => {
                        state.touch();
                        if handle_key(key, &mut state) == KeyAction::Quit {
                            break 'event_loop;
                        }
                    }
                    Some(AppEvent::Mouse(mouse)) => {
                        state.touch();
                        if handle_mouse(mouse, &mut state) == KeyAction::Quit {
                            break 'event_loop;
                        }
                    }
                    Some(AppEvent::Api(result)) => {
                        state.apply_api_result(*result);
                        if state.session.is_closed() {
                            terminal.draw(|frame| ui::render(frame, &mut state, &theme))?;
                            tokio::time::sleep(std::time::Duration::from_millis(800)).await;
                            break 'event_loop;
                        }
                    }
                    Some(AppEvent::Tick) => state.tick(),
                    // ratatui picks up the new size from frame.area() on the next Render.
                    Some(AppEvent::Resize(_, _)) => state.touch(),
                    Some(AppEvent::Quit) | None => break 'event_loop,
                }
                if term_flag.load(Ordering::Relaxed) {
                    break 'event_loop;
                }
            }
        }
    }

    tui::restore_tui()?;
    if let SessionState::Closed { transition, .. } = state.session.state() {
        println!("worklist item {worklist_id} moved to {}", transition.as_str());
    }
    Ok(())
}
