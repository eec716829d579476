//! # poplar
//!
//! A server-side POP3 session engine implementing RFC 1939.
//!
//! ## Features
//!
//! - **Strict state machine**: AUTHORIZATION, TRANSACTION and UPDATE with
//!   per-verb state and arity validation
//! - **Full command set**: USER, PASS, APOP, STAT, LIST, UIDL, RETR, TOP,
//!   DELE, RSET, NOOP, QUIT, CAPA (RFC 2449)
//! - **Pluggable storage**: authentication, locking and message access are
//!   delegated to a per-connection [`Backend`]
//! - **Deferred deletion**: DELE only marks; the marks are committed in one
//!   backend call when the client quits
//!
//! ## Quick Start
//!
//! ```ignore
//! use poplar::{Backend, Server, ServerConfig};
//! use tokio::net::TcpListener;
//!
//! #[tokio::main]
//! async fn main() -> poplar::Result<()> {
//!     let config = ServerConfig::builder().hostname("pop.example.com").build()?;
//!     let server = Server::new(config, |_peer| {
//!         Some(Box::new(MyBackend::default()) as Box<dyn Backend>)
//!     });
//!
//!     let listener = TcpListener::bind("0.0.0.0:1100").await?;
//!     server.serve(listener).await
//! }
//! ```
//!
//! ## Session States
//!
//! ```text
//! ┌───────────────┐
//! │ Authorization │ ─── PASS / APOP ───→ Transaction ─── QUIT ───→ Update
//! └───────────────┘
//!        │
//!        └─── QUIT ───→ Terminated
//! ```
//!
//! ## Modules
//!
//! - [`backend`]: Storage and authentication contract
//! - [`command`]: Verbs, validation rules and typed commands
//! - [`config`]: Server configuration
//! - [`connection`]: Line framing and byte-stuffing
//! - [`parser`]: Request and status line parser
//! - [`server`]: TCP listener
//! - [`session`]: Session state machine
//! - [`types`]: Core POP3 types

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod backend;
pub mod command;
pub mod config;
pub mod connection;
mod error;
pub mod parser;
pub mod server;
pub mod session;
pub mod types;

pub use backend::{Backend, BackendError, BackendResult, MessageReader};
pub use command::{Command, Verb};
pub use config::{ServerConfig, ServerConfigBuilder};
pub use error::{Error, Result};
pub use server::{BackendFactory, Server};
pub use session::Session;
pub use types::{Capability, MessageNumber, Response, SessionState, Status};
