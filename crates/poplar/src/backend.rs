//! Storage and authentication backend contract.
//!
//! The engine owns protocol correctness only. Everything that touches real
//! mailboxes (credentials, message storage, the advisory maildrop lock) is
//! supplied per connection through a [`Backend`] implementation.
//!
//! # Example
//!
//! ```ignore
//! use poplar::backend::{Backend, BackendError, BackendResult, MessageReader};
//!
//! struct Empty;
//!
//! #[async_trait::async_trait]
//! impl Backend for Empty {
//!     async fn authenticate_pass(&mut self, _user: &str, _pass: &str) -> BackendResult<()> {
//!         Err(BackendError::rejected("invalid credentials"))
//!     }
//!     // ... implement the remaining methods
//! }
//! ```

use std::error::Error as StdError;

use async_trait::async_trait;
use tokio::io::AsyncRead;

use crate::error::Error;
use crate::types::MessageNumber;

/// Boxed error type carried by [`BackendError::Internal`].
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Result type returned by backend calls.
pub type BackendResult<T> = std::result::Result<T, BackendError>;

/// Message content handed out by [`Backend::open_message`].
///
/// The session drops the reader as soon as the transfer ends, successfully
/// or not.
pub type MessageReader = Box<dyn AsyncRead + Send + Unpin>;

/// Failure reported by a backend.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// The request was refused for a reason the client may see, such as a
    /// wrong password or a busy maildrop.
    #[error("{0}")]
    Rejected(String),

    /// The backend failed internally; details stay on the server side.
    #[error(transparent)]
    Internal(BoxError),
}

impl BackendError {
    /// Creates a client-visible refusal.
    #[must_use]
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected(message.into())
    }

    /// Wraps an internal failure.
    #[must_use]
    pub fn internal(err: impl Into<BoxError>) -> Self {
        Self::Internal(err.into())
    }
}

impl From<std::io::Error> for BackendError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal(Box::new(err))
    }
}

/// Per-connection capability object serving one POP3 session.
///
/// A fresh backend is created for every accepted connection, so it may keep
/// per-session state such as the authenticated user or the APOP banner.
/// All message numbers are 1-based ordinals within the session's maildrop.
#[async_trait]
pub trait Backend: Send {
    /// Verifies a USER/PASS pair.
    ///
    /// On success the backend must associate every later call with this
    /// user.
    async fn authenticate_pass(&mut self, username: &str, password: &str) -> BackendResult<()>;

    /// Verifies an APOP digest, computed by the client from the session
    /// banner and a shared secret.
    async fn authenticate_apop(&mut self, username: &str, digest: &str) -> BackendResult<()>;

    /// Stores the session banner. Called once, before any authentication
    /// attempt, and only when APOP is enabled.
    async fn set_banner(&mut self, banner: &str) -> BackendResult<()>;

    /// Takes the exclusive advisory lock on the user's maildrop.
    async fn lock_mailbox(&mut self) -> BackendResult<()>;

    /// Releases the lock taken by [`Backend::lock_mailbox`].
    async fn unlock_mailbox(&mut self) -> BackendResult<()>;

    /// Returns the number of messages in the maildrop.
    async fn message_count(&mut self) -> BackendResult<u32>;

    /// Returns the size in octets of a message.
    async fn message_size(&mut self, number: MessageNumber) -> BackendResult<u64>;

    /// Returns the persistent unique id of a message, stable across sessions.
    async fn message_id(&mut self, number: MessageNumber) -> BackendResult<String>;

    /// Opens the content of a message for reading.
    async fn open_message(&mut self, number: MessageNumber) -> BackendResult<MessageReader>;

    /// Deletes a batch of messages. Numbers arrive in no particular order.
    ///
    /// Must be all-or-nothing: if this fails, none of the messages may be
    /// deleted.
    async fn delete_messages(&mut self, numbers: &[MessageNumber]) -> BackendResult<()>;

    /// Receives fatal session errors for out-of-band reporting.
    fn on_session_error(&mut self, err: &Error);
}
