//! Authentication seam
//!
//! Credential checking is an opaque oracle behind the [`Authenticator`]
//! trait so the directory backend can be swapped for a test double.

use argon2::{Argon2, PasswordHash, PasswordVerifier};
use async_trait::async_trait;
use spoolmail_common::{Error, Result};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, warn};

/// Credential oracle consulted by LOGIN.
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Decide whether a username/password pair is valid.
    async fn authenticate(&self, username: &str, password: &str) -> bool;
}

/// Authenticator backed by a flat users file.
///
/// Each line is `<username>:<argon2-phc-hash>`. Blank lines and lines
/// starting with `#` are skipped. The file is read once at startup.
pub struct FileAuthenticator {
    users: HashMap<String, String>,
}

impl FileAuthenticator {
    /// Load credentials from the users file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Auth(format!("Failed to read users file: {}", e)))?;

        let mut users = HashMap::new();
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            match line.split_once(':') {
                Some((username, hash)) => {
                    users.insert(username.to_string(), hash.to_string());
                }
                None => warn!("Skipping malformed users file line"),
            }
        }

        debug!(count = users.len(), "Loaded user credentials");
        Ok(Self { users })
    }

    /// Verify a password against an argon2 PHC hash string.
    fn verify_password(password: &str, hash: &str) -> bool {
        let Ok(parsed_hash) = PasswordHash::new(hash) else {
            warn!("Invalid password hash in users file");
            return false;
        };
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok()
    }
}

#[async_trait]
impl Authenticator for FileAuthenticator {
    async fn authenticate(&self, username: &str, password: &str) -> bool {
        if username.is_empty() || password.is_empty() {
            return false;
        }
        match self.users.get(username) {
            Some(hash) => Self::verify_password(password, hash),
            None => {
                debug!(username, "Unknown user");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use argon2::password_hash::SaltString;
    use argon2::PasswordHasher;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn hash(password: &str) -> String {
        let salt = SaltString::encode_b64(b"spoolmail-test").unwrap();
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .unwrap()
            .to_string()
    }

    fn users_file(lines: &[String]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        for line in lines {
            writeln!(file, "{}", line).unwrap();
        }
        file.flush().unwrap();
        file
    }

    #[tokio::test]
    async fn test_valid_credentials() {
        let file = users_file(&[
            format!("bob:{}", hash("hunter2")),
            "# comment".to_string(),
            String::new(),
        ]);
        let auth = FileAuthenticator::load(file.path()).unwrap();

        assert!(auth.authenticate("bob", "hunter2").await);
        assert!(!auth.authenticate("bob", "wrong").await);
        assert!(!auth.authenticate("carol", "hunter2").await);
    }

    #[tokio::test]
    async fn test_empty_credentials_rejected() {
        let file = users_file(&[format!("bob:{}", hash("hunter2"))]);
        let auth = FileAuthenticator::load(file.path()).unwrap();

        assert!(!auth.authenticate("", "hunter2").await);
        assert!(!auth.authenticate("bob", "").await);
    }

    #[test]
    fn test_missing_users_file() {
        assert!(FileAuthenticator::load(Path::new("/nonexistent/users")).is_err());
    }
}
