//! Error types for configuration loading.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading daemon settings.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The settings file could not be read.
    #[error("Failed to read {path}: {source}")]
    Io {
        /// Path to the file
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// The settings file is not valid TOML for [`crate::DaemonConfig`].
    #[error("Failed to parse {path}: {source}")]
    Parse {
        /// Path to the file
        path: PathBuf,
        /// Underlying TOML error
        #[source]
        source: toml::de::Error,
    },
}

/// Reasons a single table row is rejected.
///
/// A rejected row is skipped; the rest of the file still loads.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RowError {
    /// The row has fewer fields than the table requires.
    #[error("expected {expected} fields, found {found}")]
    FieldCount {
        /// Fields required by the table
        expected: usize,
        /// Fields present on the row
        found: usize,
    },

    /// A numeric field could not be parsed or is out of range.
    #[error("invalid {field} '{value}': {reason}")]
    Number {
        /// Column name
        field: &'static str,
        /// Raw token
        value: String,
        /// What went wrong
        reason: String,
    },
}

/// Result type for settings loading.
pub type Result<T> = std::result::Result<T, ConfigError>;
