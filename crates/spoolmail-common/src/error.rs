//! Error types for Spoolmail

use thiserror::Error;

/// Main error type for Spoolmail
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias for Spoolmail
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// True if the error denotes an absent mailbox or message rather than
    /// a broken store.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}
