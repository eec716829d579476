//! `poplard` - POP3 daemon
//!
//! Serves directory-per-user maildrops over plain TCP using the `poplar`
//! session engine and the `poplar-maildir` backend.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use poplar::{Backend, Server, ServerConfig};
use poplar_maildir::{Credentials, Maildir};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line settings.
#[derive(Parser, Debug)]
#[command(name = "poplard", version, about = "POP3 server for directory-per-user maildrops")]
struct Args {
    /// Address to listen on.
    #[arg(long, env = "POPLARD_LISTEN", default_value = "0.0.0.0:1100")]
    listen: SocketAddr,

    /// Root directory holding one subdirectory per user.
    #[arg(long, env = "POPLARD_MAILDIR")]
    maildir: PathBuf,

    /// Credentials file with one `user:secret` entry per line.
    #[arg(long, env = "POPLARD_USERS")]
    users: PathBuf,

    /// Host name announced in the APOP banner.
    #[arg(long, env = "POPLARD_HOSTNAME", default_value = "localhost")]
    hostname: String,

    /// Inactivity timeout in seconds (at least 600).
    #[arg(long, env = "POPLARD_TIMEOUT_SECS", default_value_t = 600)]
    timeout_secs: u64,

    /// Offer APOP authentication.
    #[arg(long, env = "POPLARD_APOP")]
    apop: bool,

    /// Implementation name announced in CAPA.
    #[arg(long, env = "POPLARD_IMPLEMENTATION", default_value = poplar::config::DEFAULT_IMPLEMENTATION)]
    implementation: String,

    /// Message expiration policy announced in CAPA.
    #[arg(long, env = "POPLARD_EXPIRE", default_value = poplar::config::DEFAULT_EXPIRE)]
    expire: String,
}

impl Args {
    fn server_config(&self) -> poplar::Result<ServerConfig> {
        ServerConfig::builder()
            .hostname(&self.hostname)
            .timeout(Duration::from_secs(self.timeout_secs))
            .implementation(&self.implementation)
            .expire(&self.expire)
            .apop(self.apop)
            .build()
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "poplard=info,poplar=info,poplar_maildir=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    info!(version = env!("CARGO_PKG_VERSION"), "Starting poplard");

    let config = args.server_config().context("invalid server settings")?;
    let credentials = Credentials::load(&args.users)
        .await
        .context("failed to load credentials")?;
    let store = Maildir::open(&args.maildir, credentials)
        .await
        .with_context(|| format!("failed to open maildir {}", args.maildir.display()))?;

    let listener = TcpListener::bind(args.listen)
        .await
        .with_context(|| format!("failed to bind {}", args.listen))?;

    let server = Server::new(config, move |_peer: SocketAddr| {
        Some(Box::new(store.backend()) as Box<dyn Backend>)
    });

    server
        .serve_with_shutdown(listener, async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %err, "failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
        })
        .await?;

    info!("poplard stopped");
    Ok(())
}
