use anyhow::{Context, Result};
use camino::Utf8Path;
use std::fs;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Setup logging for a robot session with a daily rotating log file.
///
/// Thread ids and names are always recorded: most robot diagnostics are about
/// which thread did what.
///
/// # Arguments
/// * `log_dir` - Directory for log files (created if missing)
/// * `log_prefix` - Prefix for log files (e.g., "guirobot")
/// * `debug_mode` - If true, use debug level; otherwise use info level
/// * `console_output` - If true, also log to stderr
///
/// # Returns
/// A guard that must be held for the duration of the session to keep logging active
pub fn setup_logging(
    log_dir: &Utf8Path,
    log_prefix: &str,
    debug_mode: bool,
    console_output: bool,
) -> Result<WorkerGuard> {
    if !log_dir.exists() {
        fs::create_dir_all(log_dir)
            .with_context(|| format!("Failed to create log directory: {}", log_dir))?;
    }

    let file_appender = rolling::daily(log_dir, log_prefix);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false) // No ANSI codes in log files
        .with_target(true)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_file(true)
        .with_line_number(true);

    let console_layer = console_output.then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(true)
            .with_target(false)
            .with_thread_names(true)
    });

    tracing_subscriber::registry()
        .with(level_filter(debug_mode))
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .context("A global tracing subscriber is already installed")?;

    tracing::info!(
        "Logging initialized: dir={}, prefix={}, debug={}, console={}",
        log_dir,
        log_prefix,
        debug_mode,
        console_output
    );

    Ok(guard)
}

/// Console-only logging for test runs.
///
/// Honors `RUST_LOG` when set. Safe to call from every test: only the first
/// call installs a subscriber, later calls are no-ops.
pub fn init_test_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .with_thread_names(true)
        .try_init();
}

fn level_filter(debug_mode: bool) -> EnvFilter {
    if debug_mode {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    }
}
