//! Shared setup for commands that talk to the landmark service.

use std::path::{Path, PathBuf};

use dronepair::config::ConfigFile;
use dronepair::logging::{init_logging, WorkerGuard};
use tokio::runtime::Runtime;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::CliError;

/// Loads configuration, installs logging and owns the async runtime.
pub struct CliRunner {
    config: ConfigFile,
    config_path: PathBuf,
    runtime: Runtime,
    _log_guard: Option<WorkerGuard>,
}

impl CliRunner {
    /// # Arguments
    ///
    /// * `config_path` - Explicit config file, or `None` for the default path
    /// * `verbose` - Force debug level regardless of the configured level
    pub fn new(config_path: Option<&Path>, verbose: bool) -> Result<Self, CliError> {
        let config_path = resolve_config_path(config_path)?;
        let config = ConfigFile::load_or_default(&config_path)?;

        let level = if verbose {
            "debug"
        } else {
            config.logging.level.as_str()
        };
        let log_guard = init_logging(level, config.logging.directory.as_deref())?;

        let runtime = Runtime::new().map_err(CliError::Runtime)?;

        Ok(Self {
            config,
            config_path,
            runtime,
            _log_guard: log_guard,
        })
    }

    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    pub fn log_startup(&self, command: &str) {
        info!(
            command,
            version = env!("CARGO_PKG_VERSION"),
            config = %self.config_path.display(),
            regions = self.config.regions.len(),
            "dronepair starting"
        );
    }
}

/// `--config` when given, otherwise `~/.dronepair/config.ini`.
pub fn resolve_config_path(explicit: Option<&Path>) -> Result<PathBuf, CliError> {
    match explicit {
        Some(path) => Ok(path.to_path_buf()),
        None => Ok(ConfigFile::default_path()?),
    }
}

/// Cancels the returned token on Ctrl+C.
pub fn install_ctrlc() -> Result<CancellationToken, CliError> {
    let token = CancellationToken::new();
    let handler_token = token.clone();
    ctrlc::set_handler(move || {
        if handler_token.is_cancelled() {
            warn!("Second interrupt, exiting immediately");
            std::process::exit(130);
        }
        eprintln!();
        eprintln!("Received interrupt, finishing up...");
        handler_token.cancel();
    })
    .map_err(|e| CliError::Config(format!("Failed to set signal handler: {}", e)))?;
    Ok(token)
}
