//! TCP listener.
//!
//! The server accepts connections, asks a [`BackendFactory`] for a backend
//! per peer, and runs every accepted session in its own tokio task.
//! Sessions share nothing but the configuration.

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tracing::Instrument;

use crate::backend::Backend;
use crate::config::ServerConfig;
use crate::error::{Error, Result};
use crate::session::Session;

/// Pause after a transient accept failure.
const ACCEPT_BACKOFF: Duration = Duration::from_secs(1);

/// Creates one backend per accepted connection.
pub trait BackendFactory: Send + Sync + 'static {
    /// Returns the backend serving `peer`, or `None` to drop the connection
    /// without a greeting.
    fn create(&self, peer: SocketAddr) -> Option<Box<dyn Backend>>;
}

impl<F> BackendFactory for F
where
    F: Fn(SocketAddr) -> Option<Box<dyn Backend>> + Send + Sync + 'static,
{
    fn create(&self, peer: SocketAddr) -> Option<Box<dyn Backend>> {
        self(peer)
    }
}

/// POP3 server.
pub struct Server {
    config: Arc<ServerConfig>,
    factory: Arc<dyn BackendFactory>,
}

impl Server {
    /// Creates a server.
    pub fn new(config: ServerConfig, factory: impl BackendFactory) -> Self {
        Self {
            config: Arc::new(config),
            factory: Arc::new(factory),
        }
    }

    /// Returns the shared configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Accepts connections until a non-transient accept error occurs.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if accepting fails for a reason other than a
    /// transient network condition.
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        self.serve_with_shutdown(listener, std::future::pending())
            .await
    }

    /// Accepts connections until `signal` completes.
    ///
    /// Sessions already running are not interrupted; they end on their own.
    ///
    /// # Errors
    ///
    /// Same as [`Server::serve`].
    pub async fn serve_with_shutdown(
        &self,
        listener: TcpListener,
        signal: impl Future<Output = ()>,
    ) -> Result<()> {
        if let Ok(addr) = listener.local_addr() {
            tracing::info!(%addr, "listening");
        }

        tokio::pin!(signal);
        loop {
            tokio::select! {
                () = &mut signal => {
                    tracing::info!("shutdown requested, no longer accepting");
                    return Ok(());
                }
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => self.dispatch(stream, peer),
                    Err(err) if is_transient(&err) => {
                        tracing::warn!(error = %err, "accept failed, backing off");
                        tokio::time::sleep(ACCEPT_BACKOFF).await;
                    }
                    Err(err) => return Err(Error::Io(err)),
                },
            }
        }
    }

    fn dispatch(&self, stream: TcpStream, peer: SocketAddr) {
        let Some(backend) = self.factory.create(peer) else {
            tracing::debug!(%peer, "connection declined");
            return;
        };

        let session = Session::new(Arc::clone(&self.config), backend, stream);
        tokio::spawn(
            session
                .serve()
                .instrument(tracing::debug_span!("session", %peer)),
        );
    }
}

fn is_transient(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionRefused
            | io::ErrorKind::Interrupted
            | io::ErrorKind::WouldBlock
            | io::ErrorKind::TimedOut
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_accept_errors() {
        assert!(is_transient(&io::Error::from(io::ErrorKind::ConnectionAborted)));
        assert!(is_transient(&io::Error::from(io::ErrorKind::Interrupted)));
        assert!(!is_transient(&io::Error::from(io::ErrorKind::PermissionDenied)));
        assert!(!is_transient(&io::Error::other("fd limit")));
    }
}
