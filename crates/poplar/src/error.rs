//! Error types for POP3 sessions.

use std::io;
use std::time::Duration;

use crate::backend::BackendError;
use crate::types::MessageNumber;

/// Result type alias for POP3 operations.
pub type Result<T> = std::result::Result<T, Error>;

/// POP3 session error types.
///
/// Only [`Error::Negative`] is reportable: it is written back to the client
/// as a `-ERR` line and the session continues. Every other variant is fatal
/// and terminates the session.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error on the client stream.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The client sent nothing within the inactivity deadline.
    #[error("Connection idle for longer than {0:?}")]
    Timeout(Duration),

    /// The client violated the line framing.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Reportable failure, sent to the client as `-ERR <message>`.
    #[error("{0}")]
    Negative(String),

    /// The backend failed in a way that must not be disclosed to the client.
    #[error("Backend error: {0}")]
    Backend(#[source] BackendError),

    /// Populating the maildrop snapshot failed.
    #[error("Failed to load maildrop snapshot at message {number}: {source}")]
    Snapshot {
        /// Message being fetched when the failure occurred (0 for the count).
        number: u32,
        /// Underlying backend failure.
        #[source]
        source: BackendError,
    },

    /// A command handler panicked.
    #[error("Command handler panicked: {0}")]
    Panicked(String),

    /// Invalid server configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl Error {
    /// Creates a reportable error.
    #[must_use]
    pub fn negative(message: impl Into<String>) -> Self {
        Self::Negative(message.into())
    }

    /// Reportable error for malformed commands.
    #[must_use]
    pub fn invalid_syntax() -> Self {
        Self::negative("invalid syntax")
    }

    /// Reportable error for commands issued in the wrong state.
    #[must_use]
    pub fn unexpected_state() -> Self {
        Self::negative("command not valid in this state")
    }

    /// Reportable error for ordinals outside the maildrop.
    #[must_use]
    pub fn no_such_message(number: impl std::fmt::Display) -> Self {
        Self::Negative(format!("no such message: {number}"))
    }

    /// Reportable error for ordinals already marked as deleted.
    #[must_use]
    pub fn already_deleted(number: MessageNumber) -> Self {
        Self::Negative(format!("message {number} already deleted"))
    }

    /// Returns true if the error may be written back to the client without
    /// ending the session.
    #[must_use]
    pub const fn is_reportable(&self) -> bool {
        matches!(self, Self::Negative(_))
    }

    /// Returns true if the error originates from the client stream itself,
    /// in which case nothing more can be written to it.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Io(_) | Self::Timeout(_) | Self::Protocol(_))
    }
}

impl From<BackendError> for Error {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Rejected(message) => Self::Negative(message),
            internal @ BackendError::Internal(_) => Self::Backend(internal),
        }
    }
}
