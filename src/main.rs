//! Fountain Map - Public drinking-water sources on a terminal map
//!
//! A terminal UI application that loads drinking-water sources from an open
//! data endpoint (with a cache and a fallback source), lets the user filter
//! them by district, type and status, and plots them on a map.

use std::io;
use std::panic;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use fountainmap::app::{App, AppState};
use fountainmap::cache::{default_cache_dir, CacheStore};
use fountainmap::cli::{Cli, RunMode, StartupConfig};
use fountainmap::config::Config;
use fountainmap::data::SourceFetcher;
use fountainmap::pipeline::Loader;
use fountainmap::presenter::TextPresenter;
use fountainmap::refresh::{self, RefreshHandle};
use fountainmap::ui::{self, MapView};

/// Log file written in the cache directory while the terminal UI runs
const LOG_FILE: &str = "fountainmap.log";

fn env_filter() -> EnvFilter {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
}

/// Logs to stderr, for modes that don't take over the terminal
fn init_stderr_tracing() {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(env_filter())
        .init();
}

/// Logs to a file so output doesn't corrupt the alternate screen
///
/// The returned guard must stay alive until exit to flush buffered lines.
fn init_file_tracing(dir: Option<&Path>) -> Option<WorkerGuard> {
    let dir = dir?;
    if std::fs::create_dir_all(dir).is_err() {
        return None;
    }
    let appender = tracing_appender::rolling::never(dir, LOG_FILE);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(writer).with_ansi(false))
        .with(env_filter())
        .init();
    Some(guard)
}

/// Sets up a panic hook that restores the terminal before printing the panic message.
/// This ensures the terminal is usable even if the application panics.
fn setup_panic_hook() {
    let original_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        // Attempt to restore the terminal
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        // Call the original panic hook
        original_hook(panic_info);
    }));
}

fn build_loader(config: &Config, cache: Option<CacheStore>) -> Loader {
    let fetcher = SourceFetcher::with_timeout(
        config.primary_source(),
        config.fallback_source(),
        config.request_timeout(),
    );
    Loader::new(cache, fetcher)
}

/// Deletes the cache entry and reports where it was
fn clear_cache(cache: Option<&CacheStore>) -> Result<()> {
    let cache = cache.context("No cache directory available")?;
    cache
        .clear()
        .with_context(|| format!("Failed to remove {}", cache.path().display()))?;
    println!("Cleared {}", cache.path().display());
    Ok(())
}

/// Loads once, prints the filtered set, and exits non-zero if nothing could be loaded
async fn run_list(loader: Arc<Loader>, startup: &StartupConfig) -> Result<()> {
    let stdout = io::stdout();
    let mut app = App::with_criteria(
        loader,
        TextPresenter::new(stdout.lock()),
        startup.criteria.clone(),
    );

    if startup.force_refresh {
        app.refresh().await;
    } else {
        app.load().await;
    }

    if let AppState::Failed(notice) = &app.state {
        anyhow::bail!("{}", notice);
    }
    Ok(())
}

async fn run_interactive(loader: Arc<Loader>, startup: &StartupConfig) -> Result<()> {
    // Set up panic hook to restore terminal on crash
    setup_panic_hook();

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Create app instance
    let mut app = App::with_criteria(
        Arc::clone(&loader),
        MapView::new(),
        startup.criteria.clone(),
    );

    // Initial render to show loading state
    terminal.draw(|f| ui::render_ui(f, &app))?;

    // Trigger initial data load
    if startup.force_refresh {
        app.refresh().await;
    } else {
        app.load().await;
    }

    let mut refresh_handle = RefreshHandle::spawn(loader);

    // Main event loop
    let result = loop {
        // Render UI
        if let Err(e) = terminal.draw(|f| ui::render_ui(f, &app)) {
            break Err(e);
        }

        // Poll for keyboard events with 100ms timeout
        match event::poll(Duration::from_millis(100)) {
            Ok(true) => match event::read() {
                Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => app.handle_key(key),
                Ok(_) => {}
                Err(e) => break Err(e),
            },
            Ok(false) => {}
            Err(e) => break Err(e),
        }

        if app.refresh_requested {
            app.refresh_requested = false;
            refresh_handle.request_refresh();
        }

        while let Some(message) = refresh::try_recv(&mut refresh_handle) {
            app.handle_refresh_message(message);
        }

        // Check if we should quit
        if app.should_quit {
            break Ok(());
        }
    };

    refresh_handle.shutdown().await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;

    result.context("Terminal I/O failed")
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let startup = StartupConfig::from_cli(&cli)?;

    let config = match &startup.config_path {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
    .context("Failed to load configuration")?
    .with_overrides(startup.overrides.clone());

    let cache_dir = config.cache_dir.clone().or_else(default_cache_dir);

    let _log_guard = match startup.mode {
        RunMode::Interactive => init_file_tracing(cache_dir.as_deref()),
        RunMode::List | RunMode::ClearCache => {
            init_stderr_tracing();
            None
        }
    };
    info!(endpoint = %config.endpoint, fallback = %config.fallback, "Fountain Map starting");

    let cache = cache_dir.map(|dir| CacheStore::with_dir(dir, &config.cache_key, config.expiry()));

    match startup.mode {
        RunMode::ClearCache => clear_cache(cache.as_ref()),
        RunMode::List => run_list(Arc::new(build_loader(&config, cache)), &startup).await,
        RunMode::Interactive => {
            run_interactive(Arc::new(build_loader(&config, cache)), &startup).await
        }
    }
}
