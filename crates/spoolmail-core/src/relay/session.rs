//! Relay session state machine
//!
//! One session per connection. The session owns the protocol state and is
//! generic over its transport so the command loop can be driven from plain
//! byte buffers in tests, without a socket.

use super::command::Command;
use super::response::Response;
use crate::auth::Authenticator;
use crate::limiter::RateLimiter;
use crate::store::MailboxStore;

use anyhow::Result;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Authentication state of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Unauthenticated,
    Authenticated(String),
}

impl SessionState {
    fn username(&self) -> Option<&str> {
        match self {
            SessionState::Authenticated(username) => Some(username),
            SessionState::Unauthenticated => None,
        }
    }
}

/// A single client session.
pub struct Session<R, W> {
    id: String,
    reader: R,
    writer: W,
    peer: String,
    state: SessionState,
    store: Arc<MailboxStore>,
    limiter: Arc<RateLimiter>,
    authenticator: Arc<dyn Authenticator>,
}

impl<R, W> Session<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    /// Create a session for one connection.
    pub fn new(
        reader: R,
        writer: W,
        peer: impl Into<String>,
        store: Arc<MailboxStore>,
        limiter: Arc<RateLimiter>,
        authenticator: Arc<dyn Authenticator>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            reader,
            writer,
            peer: peer.into(),
            state: SessionState::Unauthenticated,
            store,
            limiter,
            authenticator,
        }
    }

    /// Drive the command loop until QUIT, EOF, or a transport error.
    pub async fn run(&mut self) -> Result<()> {
        loop {
            // A ban can appear mid-session; check before every command,
            // including the very first one.
            if self.limiter.is_banned(&self.peer) {
                self.reply(Response::err()).await?;
                info!(session = %self.id, peer = %self.peer, "Rejected banned peer");
                return Ok(());
            }

            let Some(line) = self.read_line().await? else {
                debug!(session = %self.id, "Client disconnected");
                return Ok(());
            };

            let keep_going = match Command::parse(&line) {
                Command::Login => self.handle_login().await?,
                Command::Send => self.handle_send().await?,
                Command::List => self.handle_list().await?,
                Command::Read => self.handle_read().await?,
                Command::Del => self.handle_del().await?,
                Command::Quit => {
                    debug!(session = %self.id, "Session ended by QUIT");
                    false
                }
                Command::Unknown(command) => {
                    debug!(session = %self.id, command = %command, "Unknown command");
                    self.reply(Response::err()).await?;
                    true
                }
            };

            if !keep_going {
                return Ok(());
            }
        }
    }

    /// LOGIN: read username and password lines, then consult the limiter
    /// and the credential oracle. A banned address is refused before the
    /// oracle is asked and without touching the failure counters.
    async fn handle_login(&mut self) -> Result<bool> {
        let Some(username) = self.read_line().await? else {
            return Ok(false);
        };
        let Some(password) = self.read_line().await? else {
            return Ok(false);
        };

        if self.limiter.is_banned(&self.peer) {
            self.reply(Response::err()).await?;
            return Ok(true);
        }

        if self.authenticator.authenticate(&username, &password).await {
            self.limiter.record_success(&self.peer, &username);
            info!(session = %self.id, peer = %self.peer, username = %username, "Login successful");
            self.state = SessionState::Authenticated(username);
            self.reply(Response::ok()).await?;
        } else {
            if self.limiter.record_failure(&self.peer, &username) {
                warn!(peer = %self.peer, "Address banned after repeated login failures");
            }
            self.reply(Response::err()).await?;
        }
        Ok(true)
    }

    /// SEND: receiver line, subject line, then body lines until a lone dot.
    /// Unauthenticated sessions are refused before any argument line is
    /// consumed.
    async fn handle_send(&mut self) -> Result<bool> {
        let Some(sender) = self.state.username().map(str::to_owned) else {
            self.reply(Response::err()).await?;
            return Ok(true);
        };

        let Some(receiver) = self.read_line().await? else {
            return Ok(false);
        };
        let Some(subject) = self.read_line().await? else {
            return Ok(false);
        };

        let mut body = String::new();
        loop {
            let Some(line) = self.read_line().await? else {
                return Ok(false);
            };
            if line == "." {
                break;
            }
            body.push_str(&line);
            body.push('\n');
        }

        match self.store.store(&sender, &receiver, &subject, &body).await {
            Ok(id) => {
                debug!(session = %self.id, receiver = %receiver, id, "Message stored");
                self.reply(Response::ok()).await?;
            }
            Err(e) => {
                debug!(session = %self.id, "SEND failed: {}", e);
                self.reply(Response::err()).await?;
            }
        }
        Ok(true)
    }

    /// LIST: count line, then subjects in ascending message-ID order.
    async fn handle_list(&mut self) -> Result<bool> {
        let Some(username) = self.state.username().map(str::to_owned) else {
            self.reply(Response::err()).await?;
            return Ok(true);
        };

        match self.store.list(&username).await {
            Ok(subjects) => {
                let reply = Response::list(&subjects);
                self.reply(&reply).await?;
            }
            Err(e) => {
                warn!(session = %self.id, "LIST failed: {}", e);
                self.reply(Response::err()).await?;
            }
        }
        Ok(true)
    }

    /// READ: one message-number line; full message or ERR.
    async fn handle_read(&mut self) -> Result<bool> {
        let Some(username) = self.state.username().map(str::to_owned) else {
            self.reply(Response::err()).await?;
            return Ok(true);
        };

        let Some(raw) = self.read_line().await? else {
            return Ok(false);
        };
        let id = raw.trim().parse::<i64>().unwrap_or(0);

        match self.store.read(&username, id).await {
            Ok(message) => {
                let reply = Response::message(&message);
                self.reply(&reply).await?;
            }
            Err(e) => {
                debug!(session = %self.id, id, "READ failed: {}", e);
                self.reply(Response::err()).await?;
            }
        }
        Ok(true)
    }

    /// DEL: one message-number line; OK or ERR.
    async fn handle_del(&mut self) -> Result<bool> {
        let Some(username) = self.state.username().map(str::to_owned) else {
            self.reply(Response::err()).await?;
            return Ok(true);
        };

        let Some(raw) = self.read_line().await? else {
            return Ok(false);
        };
        let id = raw.trim().parse::<i64>().unwrap_or(0);

        match self.store.delete(&username, id).await {
            Ok(()) => self.reply(Response::ok()).await?,
            Err(e) => {
                debug!(session = %self.id, id, "DEL failed: {}", e);
                self.reply(Response::err()).await?;
            }
        }
        Ok(true)
    }

    /// Read one `\n`-terminated line, stripping the terminator and an
    /// optional trailing carriage return. Returns None on EOF; a partial
    /// line cut off by disconnect is discarded, like the rest of its
    /// command.
    async fn read_line(&mut self) -> Result<Option<String>> {
        let mut line = String::new();
        let n = self.reader.read_line(&mut line).await?;
        if n == 0 || !line.ends_with('\n') {
            return Ok(None);
        }
        line.pop();
        if line.ends_with('\r') {
            line.pop();
        }
        Ok(Some(line))
    }

    async fn reply(&mut self, data: &str) -> Result<()> {
        self.writer.write_all(data.as_bytes()).await?;
        self.writer.flush().await?;
        Ok(())
    }
}
