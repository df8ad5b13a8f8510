//! Configuration file handling.
//!
//! The configuration lives in `~/.dronepair/config.ini` and is optional:
//! missing sections and keys fall back to the defaults of the component they
//! configure. [`ConfigFile`] converts itself into the per-component
//! settings used by the service builder.

mod error;
mod file;

pub use error::ConfigError;
pub use file::{
    default_regions, ConfigFile, LoggingSettings, LookupSettings, PrefetchSettings,
    CONFIG_DIR_NAME, CONFIG_FILE_NAME, DEFAULT_LOG_LEVEL,
};
