//! POP3 session state machine.
//!
//! One [`Session`] serves one connection from greeting to close:
//!
//! ```text
//! ┌───────────────┐  PASS/APOP  ┌─────────────┐  QUIT  ┌────────┐
//! │ Authorization │ ──────────→ │ Transaction │ ─────→ │ Update │
//! └───────────────┘             └─────────────┘        └────────┘
//!         │ QUIT                                            │
//!         └──────────────────→ Terminated ←─────────────────┘
//! ```
//!
//! Commands are handled strictly one at a time. A reportable error is
//! answered with `-ERR` and the loop goes on; any other error ends the
//! session and is handed to [`Backend::on_session_error`].

mod handlers;
mod maildrop;

pub use maildrop::Maildrop;

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::backend::Backend;
use crate::command::Command;
use crate::config::ServerConfig;
use crate::connection::PopStream;
use crate::error::{Error, Result};
use crate::parser::parse_request;
use crate::types::SessionState;

/// Text of the `-ERR` line attempted before dropping a connection on a
/// fatal, non-transport error.
const INTERNAL_ERROR: &str = "internal server error";

/// A POP3 session bound to one client connection.
pub struct Session<S> {
    config: Arc<ServerConfig>,
    backend: Box<dyn Backend>,
    stream: PopStream<S>,
    state: SessionState,
    /// Name given by USER, consumed by PASS.
    username: Option<String>,
    maildrop: Maildrop,
    banner: Option<String>,
    /// Whether the advisory maildrop lock is held.
    locked: bool,
}

impl<S> Session<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Creates a session in the AUTHORIZATION state.
    ///
    /// When APOP is enabled a fresh banner is generated here; it is handed
    /// to the backend and announced in the greeting once the session runs.
    pub fn new(config: Arc<ServerConfig>, backend: Box<dyn Backend>, stream: S) -> Self {
        let banner = config.apop.then(|| config.banner());
        Self {
            config,
            backend,
            stream: PopStream::new(stream),
            state: SessionState::Authorization,
            username: None,
            maildrop: Maildrop::default(),
            banner,
            locked: false,
        }
    }

    /// Returns the APOP banner, if APOP is enabled.
    #[must_use]
    pub fn banner(&self) -> Option<&str> {
        self.banner.as_deref()
    }

    /// Runs the session until the client quits, a fatal error occurs, or
    /// the inactivity timeout expires.
    ///
    /// Whatever ends the session, a held maildrop lock is released exactly
    /// once and the connection is closed.
    pub async fn serve(mut self) {
        tracing::debug!(apop = self.banner.is_some(), "session started");

        let outcome = AssertUnwindSafe(self.run()).catch_unwind().await;        let result = outcome.unwrap_or_else(|panic| Err(Error::Panicked(panic_message(&*panic))));

        if let Err(err) = result {
            self.abort(err).await;
        }

        self.state = SessionState::Terminated;
        self.release_lock().await;
        if let Err(err) = self.stream.shutdown().await {
            tracing::trace!(error = %err, "connection shutdown failed");
        }
        tracing::debug!("session ended");
    }

    async fn run(&mut self) -> Result<()> {
        self.greet().await?;

        while !self.state.is_terminated() {
            let line = tokio::time::timeout(self.config.timeout, self.stream.read_line())
                .await
                .map_err(|_| Error::Timeout(self.config.timeout))??;

            let request = parse_request(&line);
            let result = match Command::from_request(&request, self.state) {
                Ok(command) => self.execute(command).await,
                Err(err) => Err(err),
            };

            match result {
                Ok(()) => {}
                Err(err) if err.is_reportable() => {
                    tracing::debug!(keyword = %request.keyword, reason = %err, "command rejected");
                    self.stream.err(err.to_string()).await?;
                }
                Err(err) => return Err(err),
            }
        }

        Ok(())
    }

    async fn greet(&mut self) -> Result<()> {
        let mut greeting = String::from("POP3 server ready");
        if let Some(banner) = &self.banner {
            self.backend
                .set_banner(banner)
                .await
                .map_err(Error::Backend)?;
            greeting.push(' ');
            greeting.push_str(banner);
        }
        self.stream.ok(greeting).await
    }

    /// Ends the session after a fatal error.
    ///
    /// The `-ERR` line is only attempted on a response boundary; a block
    /// cut short is left unterminated.
    async fn abort(&mut self, err: Error) {
        self.state = SessionState::Terminated;
        let mid_block = self.stream.discard_pending();
        if !err.is_transport() && !mid_block {
            // Best effort only; the connection is going away regardless.
            let _ = self.stream.err(INTERNAL_ERROR).await;
        }
        tracing::debug!(error = %err, "session aborted");
        self.backend.on_session_error(&err);
    }

    async fn release_lock(&mut self) {
        if !std::mem::take(&mut self.locked) {
            return;
        }
        if let Err(err) = self.backend.unlock_mailbox().await {
            self.backend.on_session_error(&Error::Backend(err));
        }
    }

    fn transition(&mut self, next: SessionState) {
        tracing::trace!(from = %self.state, to = %next, "state transition");
        self.state = next;
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}
