//! Relay protocol server
//!
//! Implements the line-oriented command protocol clients speak: LOGIN,
//! SEND, LIST, READ, DEL, QUIT.

mod command;
mod response;
mod server;
mod session;

pub use server::{RelayConfig, RelayServer};
pub use session::Session;
