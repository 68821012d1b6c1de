//! Login failure rate limiting
//!
//! Tracks consecutive login failures per (address, username) and bans the
//! source address for a fixed window once the failure threshold is reached.
//! Active bans survive restarts via a flat file in the spool directory;
//! attempt counters are ephemeral.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, warn};

/// Consecutive failed logins from one address for one username before the
/// address is banned.
const FAILURE_THRESHOLD: u32 = 3;

/// How long a banned address stays blocked.
const BAN_SECONDS: i64 = 60;

#[derive(Default)]
struct LimiterState {
    /// address -> ban expiry
    bans: HashMap<String, DateTime<Utc>>,
    /// (address, username) -> consecutive failure count
    attempts: HashMap<(String, String), u32>,
}

/// Brute-force protection for LOGIN.
///
/// One lock covers both maps; every operation is synchronous and the lock
/// is never held across an await point.
pub struct RateLimiter {
    ban_file: PathBuf,
    state: Mutex<LimiterState>,
}

impl RateLimiter {
    /// Create a limiter, loading still-active bans from the ban file.
    pub fn open(ban_file: impl Into<PathBuf>) -> Self {
        let ban_file = ban_file.into();
        let bans = load_bans(&ban_file, Utc::now());
        Self {
            ban_file,
            state: Mutex::new(LimiterState {
                bans,
                attempts: HashMap::new(),
            }),
        }
    }

    /// Report whether the address is currently banned.
    pub fn is_banned(&self, address: &str) -> bool {
        self.is_banned_at(address, Utc::now())
    }

    /// Record a failed login attempt. Returns true if this attempt tripped
    /// a new ban on the address.
    pub fn record_failure(&self, address: &str, username: &str) -> bool {
        self.record_failure_at(address, username, Utc::now())
    }

    /// Record a successful login, clearing the failure counter for the
    /// (address, username) pair. Existing bans are unaffected.
    pub fn record_success(&self, address: &str, username: &str) {
        self.record_success_at(address, username, Utc::now())
    }

    fn is_banned_at(&self, address: &str, now: DateTime<Utc>) -> bool {
        let mut state = self.state.lock().expect("limiter lock poisoned");
        self.evict_expired(&mut state, now);
        state.bans.get(address).is_some_and(|expiry| *expiry > now)
    }

    fn record_failure_at(&self, address: &str, username: &str, now: DateTime<Utc>) -> bool {
        let mut state = self.state.lock().expect("limiter lock poisoned");
        self.evict_expired(&mut state, now);

        let key = (address.to_string(), username.to_string());
        let count = state.attempts.entry(key.clone()).or_insert(0);
        *count += 1;

        if *count < FAILURE_THRESHOLD {
            return false;
        }

        let expiry = now + Duration::seconds(BAN_SECONDS);
        state.bans.insert(address.to_string(), expiry);
        state.attempts.remove(&key);
        self.persist(&state, now);
        debug!(address, "Address banned until {}", expiry);
        true
    }

    fn record_success_at(&self, address: &str, username: &str, now: DateTime<Utc>) {
        let mut state = self.state.lock().expect("limiter lock poisoned");
        self.evict_expired(&mut state, now);
        state
            .attempts
            .remove(&(address.to_string(), username.to_string()));
    }

    /// Drop expired bans, rewriting the ban file only when something was
    /// actually evicted.
    fn evict_expired(&self, state: &mut LimiterState, now: DateTime<Utc>) {
        let before = state.bans.len();
        state.bans.retain(|_, expiry| *expiry > now);
        if state.bans.len() != before {
            self.persist(state, now);
        }
    }

    /// Write all active bans to the ban file. Failures are logged and
    /// otherwise ignored; the in-memory state stays authoritative.
    fn persist(&self, state: &LimiterState, now: DateTime<Utc>) {
        let mut out = String::new();
        for (address, expiry) in &state.bans {
            if *expiry > now {
                out.push_str(&format!("{} {}\n", address, expiry.timestamp()));
            }
        }
        if let Err(e) = std::fs::write(&self.ban_file, out) {
            warn!(file = %self.ban_file.display(), "Failed to persist bans: {}", e);
        }
    }
}

/// Read the ban file, keeping only entries whose expiry is still in the
/// future. A missing file is not an error.
fn load_bans(path: &Path, now: DateTime<Utc>) -> HashMap<String, DateTime<Utc>> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(_) => return HashMap::new(),
    };

    let mut bans = HashMap::new();
    for line in content.lines() {
        let mut parts = line.split_whitespace();
        let (Some(address), Some(raw_expiry)) = (parts.next(), parts.next()) else {
            continue;
        };
        let Ok(secs) = raw_expiry.parse::<i64>() else {
            continue;
        };
        let Some(expiry) = DateTime::from_timestamp(secs, 0) else {
            continue;
        };
        if expiry > now {
            bans.insert(address.to_string(), expiry);
        }
    }

    debug!(count = bans.len(), "Loaded active bans");
    bans
}
