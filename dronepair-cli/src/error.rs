//! CLI error type.

use std::fmt;
use std::path::PathBuf;

use dronepair::config::ConfigError;
use dronepair::correspondence::PairError;
use dronepair::logging::LoggingError;
use dronepair::service::{GenerationError, ServiceError};

/// Errors surfaced to the user by a CLI command.
#[derive(Debug)]
pub enum CliError {
    /// Configuration could not be loaded, validated or saved.
    Config(String),
    /// A command-line argument was out of range.
    Argument(String),
    /// Logging could not be set up.
    Logging(LoggingError),
    /// The location service could not be built.
    Service(ServiceError),
    /// A location could not be produced.
    Generation(GenerationError),
    /// A view pair could not be produced.
    Pair(PairError),
    /// Monitored folder could not be read.
    Folder { path: PathBuf, source: std::io::Error },
    /// The async runtime could not be started.
    Runtime(std::io::Error),
    /// Output could not be serialized.
    Output(String),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::Argument(msg) => write!(f, "Invalid argument: {}", msg),
            CliError::Logging(e) => write!(f, "Failed to initialize logging: {}", e),
            CliError::Service(e) => write!(f, "{}", e),
            CliError::Generation(e) => write!(f, "Location generation failed: {}", e),
            CliError::Pair(e) => write!(f, "View pair generation failed: {}", e),
            CliError::Folder { path, source } => {
                write!(f, "Cannot read folder {}: {}", path.display(), source)
            }
            CliError::Runtime(e) => write!(f, "Failed to start async runtime: {}", e),
            CliError::Output(msg) => write!(f, "Failed to write output: {}", msg),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Logging(e) => Some(e),
            CliError::Service(e) => Some(e),
            CliError::Generation(e) => Some(e),
            CliError::Pair(e) => Some(e),
            CliError::Folder { source, .. } => Some(source),
            CliError::Runtime(e) => Some(e),
            CliError::Config(_) | CliError::Argument(_) | CliError::Output(_) => None,
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::Config(e.to_string())
    }
}

impl From<LoggingError> for CliError {
    fn from(e: LoggingError) -> Self {
        CliError::Logging(e)
    }
}

impl From<ServiceError> for CliError {
    fn from(e: ServiceError) -> Self {
        CliError::Service(e)
    }
}

impl From<GenerationError> for CliError {
    fn from(e: GenerationError) -> Self {
        CliError::Generation(e)
    }
}

impl From<PairError> for CliError {
    fn from(e: PairError) -> Self {
        CliError::Pair(e)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        CliError::Output(e.to_string())
    }
}
