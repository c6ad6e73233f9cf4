use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Console output plus a JSON file rotated daily under `log_dir`.
///
/// `RUST_LOG` wins over `log_level`. The returned guard flushes the file
/// writer when dropped, so `main` keeps it alive.
pub fn setup_logging(log_dir: &Path, log_level: &str) -> Result<WorkerGuard> {
    fs::create_dir_all(log_dir)
        .with_context(|| format!("Failed to create log directory {}", log_dir.display()))?;

    let file_appender = rolling::daily(log_dir, "server_transit.log");
    let (non_blocking_appender, guard) = non_blocking(file_appender);

    let console_layer = fmt::layer().with_target(true).with_ansi(true);
    let file_layer = fmt::layer()
        .with_ansi(false)
        .with_writer(non_blocking_appender)
        .json();

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .context("Invalid log level")?;

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    info!("Logging initialized with level: {}", log_level);
    Ok(guard)
}
