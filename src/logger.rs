//! Logging setup for textfmt
//!
//! Log events go to stderr, or to a file when `logging.file` is configured.
//! `RUST_LOG` takes precedence over the verbosity flags.

use anyhow::{Context, Result};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::{EnvFilter, fmt, prelude::*, registry};

/// Default filter level for the given `-v` count and `logging.debug` setting.
pub fn default_level(verbosity: u8, debug: bool) -> &'static str {
    match verbosity {
        _ if debug => "debug",
        0 => "warn",
        1 => "info",
        _ => "debug",
    }
}

fn env_filter(verbosity: u8, debug: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("textfmt={}", default_level(verbosity, debug)))
    })
}

/// Initialize the logging system
///
/// Returns the path of the log file when logging to a file.
pub fn init_logging(verbosity: u8, debug: bool, log_file: Option<&Path>) -> Result<Option<PathBuf>> {
    let filter = env_filter(verbosity, debug);

    let Some(log_path) = log_file else {
        let subscriber = registry()
            .with(fmt::layer().with_writer(io::stderr).with_target(false))
            .with(filter);
        tracing::subscriber::set_global_default(subscriber)
            .map_err(|e| anyhow::anyhow!("Failed to set tracing subscriber: {}", e))?;
        return Ok(None);
    };

    if let Some(parent) = log_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create log directory: {}", parent.display()))?;
    }
    let file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
        .with_context(|| format!("Failed to open log file: {}", log_path.display()))?;

    let subscriber = registry()
        .with(
            fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false),
        )
        .with(filter);
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to set tracing subscriber: {}", e))?;

    Ok(Some(log_path.to_path_buf()))
}
