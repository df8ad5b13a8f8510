//! Configuration errors.

use std::path::PathBuf;

use thiserror::Error;

use crate::camera::PlacementError;
use crate::coord::CoordError;

/// Errors loading, parsing or validating the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed INI: {0}")]
    Parse(String),

    #[error("[{section}] {key} = {value:?}: {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },

    #[error("[{section}] missing required key {key}")]
    MissingKey { section: String, key: String },

    #[error("region {name}: {source}")]
    InvalidRegion {
        name: String,
        #[source]
        source: CoordError,
    },

    #[error("[camera] {0}")]
    InvalidCamera(#[from] PlacementError),

    #[error("could not determine home directory")]
    NoHomeDirectory,
}

impl ConfigError {
    pub(crate) fn invalid(
        section: &str,
        key: &str,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        ConfigError::InvalidValue {
            section: section.to_string(),
            key: key.to_string(),
            value: value.into(),
            reason: reason.into(),
        }
    }
}
