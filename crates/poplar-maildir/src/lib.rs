//! # poplar-maildir
//!
//! Directory-per-user storage backend for the `poplar` POP3 engine.
//!
//! This crate provides:
//! - A flat credentials file (`user:secret` per line) for PASS and APOP
//! - An in-process advisory lock registry shared by all sessions
//! - One directory per user, one file per message
//! - All-or-nothing deletion through hidden staging names
//!
//! ```ignore
//! use poplar::{Backend, Server, ServerConfig};
//! use poplar_maildir::{Credentials, Maildir};
//!
//! let credentials = Credentials::load("/etc/poplar/users").await?;
//! let store = Maildir::open("/var/mail/poplar", credentials).await?;
//! let server = Server::new(ServerConfig::default(), move |_peer| {
//!     Some(Box::new(store.backend()) as Box<dyn Backend>)
//! });
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod backend;
pub mod credentials;
mod error;
pub mod locks;

pub use backend::{Maildir, MaildirBackend};
pub use credentials::{Credentials, apop_digest};
pub use error::{Error, Result};
pub use locks::MailboxLocks;
