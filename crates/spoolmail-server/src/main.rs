//! Spoolmail - relay server entry point

use anyhow::{Context, Result};
use spoolmail_common::config::Config;
use spoolmail_core::{Authenticator, FileAuthenticator, MailboxStore, RateLimiter, RelayConfig, RelayServer};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    info!("Starting spoolmail relay server...");

    let mut config = Config::load()?;

    // Positional overrides: <port> [spool-dir]
    let mut args = std::env::args().skip(1);
    if let Some(port) = args.next() {
        let port: u16 = port.parse().context("Invalid port argument")?;
        config.server.bind = format!("0.0.0.0:{}", port);
    }
    if let Some(dir) = args.next() {
        config.storage.path = dir.into();
    }

    let store = Arc::new(MailboxStore::open(&config.storage.path)?);
    let limiter = Arc::new(RateLimiter::open(config.storage.ban_file()));
    let authenticator: Arc<dyn Authenticator> =
        Arc::new(FileAuthenticator::load(&config.auth.users_file)?);

    info!(
        "Spool directory: {}, users file: {}",
        config.storage.path.display(),
        config.auth.users_file.display()
    );

    let relay = RelayServer::new(
        RelayConfig {
            bind: config.server.bind.clone(),
        },
        store,
        limiter,
        authenticator,
    );

    relay.run().await
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,spoolmail=debug"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_level(true))
        .with(filter)
        .init();
}
