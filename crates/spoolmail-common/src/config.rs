//! Configuration for Spoolmail

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Storage configuration
    #[serde(default)]
    pub storage: StorageConfig,

    /// Authentication configuration
    #[serde(default)]
    pub auth: AuthConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address and port
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0:2525".to_string()
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Spool directory holding one subdirectory per mailbox
    #[serde(default = "default_spool_path")]
    pub path: PathBuf,
}

impl StorageConfig {
    /// Location of the ban file, kept inside the spool directory.
    pub fn ban_file(&self) -> PathBuf {
        self.path.join("banlist.db")
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_spool_path(),
        }
    }
}

fn default_spool_path() -> PathBuf {
    PathBuf::from("/var/lib/spoolmail/spool")
}

/// Authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Users file with one `<username>:<argon2-hash>` entry per line
    #[serde(default = "default_users_file")]
    pub users_file: PathBuf,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            users_file: default_users_file(),
        }
    }
}

fn default_users_file() -> PathBuf {
    PathBuf::from("/etc/spoolmail/users")
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: "json" or "text"
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

impl Config {
    /// Load configuration from file
    pub fn from_file(path: &std::path::Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| crate::Error::Config(format!("Failed to read config file: {}", e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;

        Ok(config)
    }

    /// Load configuration from the default locations, falling back to the
    /// built-in defaults when no file is present.
    pub fn load() -> crate::Result<Self> {
        let paths = [
            std::path::PathBuf::from("./spoolmail.toml"),
            std::path::PathBuf::from("/etc/spoolmail/config.toml"),
        ];

        for path in paths {
            if path.exists() {
                return Self::from_file(&path);
            }
        }

        Ok(Self::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.bind, "0.0.0.0:2525");
        assert_eq!(config.storage.path, PathBuf::from("/var/lib/spoolmail/spool"));
        assert_eq!(
            config.storage.ban_file(),
            PathBuf::from("/var/lib/spoolmail/spool/banlist.db")
        );
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_parse_config() {
        let toml = r#"
[server]
bind = "127.0.0.1:9000"

[storage]
path = "/data/spool"

[auth]
users_file = "/data/users"
"#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.server.bind, "127.0.0.1:9000");
        assert_eq!(config.storage.path, PathBuf::from("/data/spool"));
        assert_eq!(config.auth.users_file, PathBuf::from("/data/users"));
        assert_eq!(config.logging.format, "text");
    }
}
