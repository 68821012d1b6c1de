//! Common types for Spoolmail

use serde::{Deserialize, Serialize};

/// Maximum length of a mailbox username in characters
pub const MAX_USERNAME_LEN: usize = 8;

/// A validated mailbox username.
///
/// Usernames are non-empty, at most eight characters, and restricted to
/// lowercase ASCII letters and digits. Every mailbox directory on disk is
/// named after one of these, so the grammar doubles as path hygiene.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Username(String);

impl Username {
    /// Parse and validate a username
    pub fn parse(s: &str) -> Option<Self> {
        if Self::is_valid(s) {
            Some(Self(s.to_string()))
        } else {
            None
        }
    }

    /// Check whether a string satisfies the username grammar
    pub fn is_valid(s: &str) -> bool {
        !s.is_empty()
            && s.len() <= MAX_USERNAME_LEN
            && s.chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
    }

    /// Get the username as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Username {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for Username {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| crate::Error::Validation("Invalid username".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_usernames() {
        assert!(Username::is_valid("a"));
        assert!(Username::is_valid("bob"));
        assert!(Username::is_valid("user1234"));
        assert!(Username::is_valid("8"));
    }

    #[test]
    fn test_invalid_usernames() {
        assert!(!Username::is_valid(""));
        assert!(!Username::is_valid("toolongname"));
        assert!(!Username::is_valid("Bob"));
        assert!(!Username::is_valid("bob!"));
        assert!(!Username::is_valid("bo b"));
        assert!(!Username::is_valid("bøb"));
    }

    #[test]
    fn test_parse_round_trip() {
        let username = Username::parse("carol").unwrap();
        assert_eq!(username.as_str(), "carol");
        assert_eq!(username.to_string(), "carol");
        assert!(Username::parse("CAROL").is_none());
    }
}
