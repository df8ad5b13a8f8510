//! Tracing subscriber setup.
//!
//! Console output always goes to stderr so stdout stays clean for command
//! output such as JSON. When a log directory is configured a second,
//! non-blocking layer writes daily rolling files into it. `RUST_LOG`
//! overrides the configured level.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing_appender::rolling::{Builder as RollingBuilder, Rotation};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub use tracing_appender::non_blocking::WorkerGuard;

/// Log file name prefix; files are named `dronepair.<date>.log`.
pub const LOG_FILE_PREFIX: &str = "dronepair";

/// Rolling log files kept before the oldest is deleted.
pub const MAX_LOG_FILES: usize = 7;

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("invalid log filter {filter:?}: {reason}")]
    Filter { filter: String, reason: String },

    #[error("failed to create log directory {path}: {source}")]
    Directory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to open log file in {path}: {reason}")]
    Appender { path: PathBuf, reason: String },

    #[error("logging already initialized: {0}")]
    AlreadyInitialized(String),
}

/// Builds the level filter: `RUST_LOG` when set, otherwise `level`.
pub fn env_filter(level: &str) -> Result<EnvFilter, LoggingError> {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .map_err(|e| LoggingError::Filter {
            filter: level.to_string(),
            reason: e.to_string(),
        })
}

/// Installs the global subscriber.
///
/// Returns the file writer's guard when file logging is enabled; keep it
/// alive until exit or buffered lines are lost.
pub fn init_logging(
    level: &str,
    directory: Option<&Path>,
) -> Result<Option<WorkerGuard>, LoggingError> {
    let filter = env_filter(level)?;

    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    let (file_layer, guard) = match directory {
        Some(dir) => {
            std::fs::create_dir_all(dir).map_err(|source| LoggingError::Directory {
                path: dir.to_path_buf(),
                source,
            })?;

            let appender = RollingBuilder::new()
                .rotation(Rotation::DAILY)
                .filename_prefix(LOG_FILE_PREFIX)
                .filename_suffix("log")
                .max_log_files(MAX_LOG_FILES)
                .build(dir)
                .map_err(|e| LoggingError::Appender {
                    path: dir.to_path_buf(),
                    reason: e.to_string(),
                })?;
            let (writer, guard) = tracing_appender::non_blocking(appender);

            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| LoggingError::AlreadyInitialized(e.to_string()))?;

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_level_rejected() {
        // Only meaningful when RUST_LOG is unset
        if std::env::var_os("RUST_LOG").is_none() {
            assert!(matches!(
                env_filter("dronepair=verbose"),
                Err(LoggingError::Filter { .. })
            ));
        }
    }

    #[test]
    fn test_plain_levels_accepted() {
        for level in ["trace", "debug", "info", "warn", "error", "dronepair=debug"] {
            assert!(env_filter(level).is_ok(), "{} rejected", level);
        }
    }
}
