//! Error types for the event engine.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that stop the daemon from starting.
#[derive(Error, Debug)]
pub enum Error {
    /// A required event source could not be opened.
    #[error("{path}: {source}")]
    SourceOpen {
        /// Path that failed
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// IO error during setup.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for event engine setup.
pub type Result<T> = std::result::Result<T, Error>;

/// A raw read that could not be turned into an input event.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Fewer bytes than one `input_event`.
    #[error("short read: expected {expected} bytes, got {got}")]
    Truncated {
        /// Size of one event
        expected: usize,
        /// Bytes actually read
        got: usize,
    },
}

/// Outcome of a failed readiness wait.
#[derive(Error, Debug)]
pub enum WaitError {
    /// A signal arrived while waiting.
    #[error("wait interrupted by signal")]
    Interrupted,

    /// The wait itself failed.
    #[error("poll failed: {0}")]
    Failed(#[source] std::io::Error),
}
