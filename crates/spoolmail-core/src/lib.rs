//! Spoolmail Core - authenticated store-and-forward mail relay
//!
//! This crate provides the relay's moving parts: the line-oriented command
//! protocol and its per-connection session state machine, the mailbox
//! storage engine, the login rate limiter, and the authentication seam.

pub mod auth;
pub mod limiter;
pub mod relay;
pub mod store;

pub use auth::{Authenticator, FileAuthenticator};
pub use limiter::RateLimiter;
pub use relay::{RelayConfig, RelayServer, Session};
pub use store::{MailboxStore, StoredMessage};
