//! Logging initialization
//!
//! Call sites use the `log` macros; `tracing-log` forwards them into a
//! `tracing-subscriber` registry with:
//! - an `EnvFilter` from `RUST_LOG`, falling back to the configured level
//! - a stderr layer
//! - an optional append-only file layer without ANSI colors

use std::sync::Arc;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::EnvFilter;

use crate::core::config::LogSettings;
use crate::core::error::{AppError, AppResult};

/// Initialize logger for both console and (optionally) file output
///
/// # Errors
/// Fails if the filter is malformed, the log file cannot be opened, or a
/// global logger was already installed.
pub fn init_logger(settings: &LogSettings) -> AppResult<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.level))
        .map_err(|e| AppError::Logging(format!("invalid log filter '{}': {}", settings.level, e)))?;

    let file_layer = match &settings.file {
        Some(path) => {
            let (file, _) = fs_err::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?
                .into_parts();
            Some(fmt::layer().with_ansi(false).with_writer(Arc::new(file)))
        }
        None => None,
    };

    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer);

    tracing_log::LogTracer::init().map_err(|e| AppError::Logging(format!("failed to bridge log records: {}", e)))?;
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| AppError::Logging(format!("failed to initialize logger: {}", e)))?;

    Ok(())
}
