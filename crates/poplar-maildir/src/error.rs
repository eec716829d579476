//! Error types for the maildir backend.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while setting up a maildir store.
///
/// Failures during a session are reported to the engine as
/// [`poplar::BackendError`] instead.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The credentials file could not be read.
    #[error("Failed to read credentials from {path}: {source}")]
    CredentialsFile {
        /// File that was being read.
        path: PathBuf,
        /// Underlying failure.
        #[source]
        source: std::io::Error,
    },

    /// A credentials entry is malformed.
    #[error("Invalid credentials entry on line {line}: {reason}")]
    Credentials {
        /// 1-based line number.
        line: usize,
        /// What is wrong with the entry.
        reason: String,
    },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
