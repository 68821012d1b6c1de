//! Relay server
//!
//! Binds the listen address and spawns one session task per accepted
//! connection. Already-banned addresses are turned away at accept time,
//! before a session ever starts.

use super::response::Response;
use super::session::Session;
use crate::auth::Authenticator;
use crate::limiter::RateLimiter;
use crate::store::MailboxStore;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tracing::{error, info};

/// Relay server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Listen address and port
    #[serde(default = "default_bind")]
    pub bind: String,
}

fn default_bind() -> String {
    "0.0.0.0:2525".to_string()
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

/// Accept loop for the relay protocol.
pub struct RelayServer {
    config: RelayConfig,
    store: Arc<MailboxStore>,
    limiter: Arc<RateLimiter>,
    authenticator: Arc<dyn Authenticator>,
}

impl RelayServer {
    /// Create a new relay server sharing the given store, limiter, and
    /// authenticator across all sessions.
    pub fn new(
        config: RelayConfig,
        store: Arc<MailboxStore>,
        limiter: Arc<RateLimiter>,
        authenticator: Arc<dyn Authenticator>,
    ) -> Self {
        Self {
            config,
            store,
            limiter,
            authenticator,
        }
    }

    /// Run the accept loop. Does not return under normal operation; the
    /// process ends by termination, not graceful shutdown.
    pub async fn run(&self) -> Result<()> {
        let listener = TcpListener::bind(&self.config.bind).await?;
        info!("Relay server listening on {}", self.config.bind);

        loop {
            match listener.accept().await {
                Ok((stream, addr)) => {
                    let store = self.store.clone();
                    let limiter = self.limiter.clone();
                    let authenticator = self.authenticator.clone();

                    tokio::spawn(async move {
                        if let Err(e) =
                            handle_connection(stream, addr, store, limiter, authenticator).await
                        {
                            error!("Connection error from {}: {}", addr, e);
                        }
                    });
                }
                Err(e) => {
                    error!("Accept error: {}", e);
                }
            }
        }
    }
}

/// Handle one accepted connection.
async fn handle_connection(
    mut stream: TcpStream,
    addr: SocketAddr,
    store: Arc<MailboxStore>,
    limiter: Arc<RateLimiter>,
    authenticator: Arc<dyn Authenticator>,
) -> Result<()> {
    let peer = addr.ip().to_string();
    info!("New connection from {}", addr);

    if limiter.is_banned(&peer) {
        stream.write_all(Response::err().as_bytes()).await?;
        stream.shutdown().await?;
        info!("Rejected banned address {}", peer);
        return Ok(());
    }

    let (reader, writer) = stream.into_split();
    let mut session = Session::new(
        BufReader::new(reader),
        writer,
        peer,
        store,
        limiter,
        authenticator,
    );
    session.run().await?;

    info!("Connection closed for {}", addr);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = RelayConfig::default();
        assert_eq!(config.bind, "0.0.0.0:2525");
    }
}
