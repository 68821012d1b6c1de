//! Spoolmail Common - shared types, errors, and configuration
//!
//! This crate provides the pieces shared by the relay core and the binaries:
//! the error enum, the TOML configuration, and the validated username type.

pub mod config;
pub mod error;
pub mod types;

pub use config::Config;
pub use error::{Error, Result};
pub use types::Username;
