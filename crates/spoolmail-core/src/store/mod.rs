//! Mailbox storage engine
//!
//! One directory per mailbox under the spool root, one `<id>.msg` file per
//! message. A message file is three header lines (sender, receiver,
//! subject) followed by the raw body. Message IDs are mailbox-local and
//! assigned as the highest existing ID plus one; that scan-then-increment
//! is only race-free because every operation holds the single store-wide
//! lock.

use spoolmail_common::{Error, Result, Username};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Maximum subject length in characters; longer subjects are truncated,
/// not rejected.
const MAX_SUBJECT: usize = 80;

/// A message as stored on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMessage {
    pub sender: String,
    pub receiver: String,
    pub subject: String,
    pub body: String,
}

/// Durable per-user message store.
pub struct MailboxStore {
    base: PathBuf,
    /// Serializes every operation across all mailboxes.
    lock: Mutex<()>,
}

impl MailboxStore {
    /// Open the store rooted at `base`, creating the directory if needed.
    pub fn open(base: impl Into<PathBuf>) -> Result<Self> {
        let base = base.into();
        std::fs::create_dir_all(&base)
            .map_err(|e| Error::Storage(format!("Failed to create spool directory: {}", e)))?;
        Ok(Self {
            base,
            lock: Mutex::new(()),
        })
    }

    /// Store a message in the receiver's mailbox, returning its ID.
    ///
    /// Both usernames must satisfy the mailbox grammar; the receiver's
    /// mailbox is created on first use. The subject is truncated to
    /// [`MAX_SUBJECT`] characters and a non-empty body is persisted with a
    /// trailing newline.
    pub async fn store(
        &self,
        sender: &str,
        receiver: &str,
        subject: &str,
        body: &str,
    ) -> Result<u64> {
        let sender = Username::parse(sender)
            .ok_or_else(|| Error::Validation("Invalid sender username".to_string()))?;
        let receiver = Username::parse(receiver)
            .ok_or_else(|| Error::Validation("Invalid receiver username".to_string()))?;

        let _guard = self.lock.lock().await;

        let mailbox = self.base.join(receiver.as_str());
        fs::create_dir_all(&mailbox)
            .await
            .map_err(|e| Error::Storage(format!("Failed to create mailbox: {}", e)))?;

        let id = next_message_id(&mailbox).await?;
        let subject: String = subject.chars().take(MAX_SUBJECT).collect();

        let mut record = format!("{}\n{}\n{}\n", sender, receiver, subject);
        if !body.is_empty() {
            record.push_str(body);
            if !body.ends_with('\n') {
                record.push('\n');
            }
        }

        fs::write(mailbox.join(format!("{}.msg", id)), record)
            .await
            .map_err(|e| Error::Storage(format!("Failed to write message: {}", e)))?;

        debug!(mailbox = receiver.as_str(), id, "Stored message");
        Ok(id)
    }

    /// Subjects of every message in the mailbox, in ascending ID order.
    ///
    /// An invalid username or an absent mailbox yields an empty list, not
    /// an error.
    pub async fn list(&self, username: &str) -> Result<Vec<String>> {
        let Some(username) = Username::parse(username) else {
            return Ok(Vec::new());
        };

        let _guard = self.lock.lock().await;

        let mailbox = self.base.join(username.as_str());
        let ids = match message_ids(&mailbox).await {
            Ok(ids) => ids,
            Err(_) => return Ok(Vec::new()),
        };

        let mut subjects = Vec::with_capacity(ids.len());
        for id in ids {
            match read_record(&mailbox.join(format!("{}.msg", id))).await {
                Ok(message) => subjects.push(message.subject),
                Err(e) => warn!(mailbox = username.as_str(), id, "Skipping message: {}", e),
            }
        }
        Ok(subjects)
    }

    /// Read one message from the user's mailbox.
    pub async fn read(&self, username: &str, id: i64) -> Result<StoredMessage> {
        let username = Username::parse(username)
            .ok_or_else(|| Error::NotFound("Invalid username".to_string()))?;
        if id <= 0 {
            return Err(Error::NotFound("Invalid message number".to_string()));
        }

        let _guard = self.lock.lock().await;
        read_record(&self.message_path(&username, id as u64)).await
    }

    /// Delete one message from the user's mailbox. The record is removed
    /// entirely; there is no tombstone.
    pub async fn delete(&self, username: &str, id: i64) -> Result<()> {
        let username = Username::parse(username)
            .ok_or_else(|| Error::NotFound("Invalid username".to_string()))?;
        if id <= 0 {
            return Err(Error::NotFound("Invalid message number".to_string()));
        }

        let _guard = self.lock.lock().await;

        match fs::remove_file(self.message_path(&username, id as u64)).await {
            Ok(()) => {
                debug!(mailbox = username.as_str(), id, "Deleted message");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(Error::NotFound("No such message".to_string()))
            }
            Err(e) => Err(Error::Storage(format!("Failed to delete message: {}", e))),
        }
    }

    fn message_path(&self, username: &Username, id: u64) -> PathBuf {
        self.base
            .join(username.as_str())
            .join(format!("{}.msg", id))
    }
}

/// IDs of all `<id>.msg` files in a mailbox directory, ascending.
async fn message_ids(mailbox: &Path) -> std::io::Result<Vec<u64>> {
    let mut entries = fs::read_dir(mailbox).await?;
    let mut ids = Vec::new();

    while let Some(entry) = entries.next_entry().await? {
        if !entry.file_type().await?.is_file() {
            continue;
        }
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if let Some(stem) = name.strip_suffix(".msg") {
            if let Ok(id) = stem.parse::<u64>() {
                if id > 0 {
                    ids.push(id);
                }
            }
        }
    }

    ids.sort_unstable();
    Ok(ids)
}

/// Next free message ID: highest existing ID plus one, starting at 1.
async fn next_message_id(mailbox: &Path) -> Result<u64> {
    let ids = message_ids(mailbox)
        .await
        .map_err(|e| Error::Storage(format!("Failed to scan mailbox: {}", e)))?;
    Ok(ids.last().copied().unwrap_or(0) + 1)
}

/// Parse a message file: three header lines, then the body verbatim.
async fn read_record(path: &Path) -> Result<StoredMessage> {
    let content = match fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(Error::NotFound("No such message".to_string()))
        }
        Err(e) => return Err(Error::Storage(format!("Failed to read message: {}", e))),
    };

    let mut lines = content.splitn(4, '\n');
    let (Some(sender), Some(receiver), Some(subject)) =
        (lines.next(), lines.next(), lines.next())
    else {
        return Err(Error::Storage("Truncated message record".to_string()));
    };

    Ok(StoredMessage {
        sender: trim_line(sender),
        receiver: trim_line(receiver),
        subject: trim_line(subject),
        body: lines.next().unwrap_or("").to_string(),
    })
}

fn trim_line(line: &str) -> String {
    line.trim_end_matches('\r').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn store(dir: &TempDir) -> MailboxStore {
        MailboxStore::open(dir.path().join("spool")).unwrap()
    }

    #[tokio::test]
    async fn test_ids_start_at_one_and_increase() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        assert_eq!(store.store("bob", "carol", "first", "a").await.unwrap(), 1);
        assert_eq!(store.store("bob", "carol", "second", "b").await.unwrap(), 2);
        assert_eq!(store.store("bob", "carol", "third", "c").await.unwrap(), 3);

        let subjects = store.list("carol").await.unwrap();
        assert_eq!(subjects, vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn test_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        let id = store
            .store("bob", "carol", "Hi", "Hello\nthere")
            .await
            .unwrap();
        let message = store.read("carol", id as i64).await.unwrap();

        assert_eq!(message.sender, "bob");
        assert_eq!(message.receiver, "carol");
        assert_eq!(message.subject, "Hi");
        // Body gains the guaranteed trailing terminator.
        assert_eq!(message.body, "Hello\nthere\n");
    }

    #[tokio::test]
    async fn test_subject_truncated_to_eighty_chars() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        let long = "x".repeat(120);
        let id = store.store("bob", "carol", &long, "body").await.unwrap();
        let message = store.read("carol", id as i64).await.unwrap();

        assert_eq!(message.subject, "x".repeat(80));
    }

    #[tokio::test]
    async fn test_empty_body() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        let id = store.store("bob", "carol", "empty", "").await.unwrap();
        let message = store.read("carol", id as i64).await.unwrap();
        assert_eq!(message.body, "");
    }

    #[tokio::test]
    async fn test_invalid_usernames_rejected_without_side_effect() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        assert!(store.store("bob", "Carol!", "subject", "body").await.is_err());
        assert!(store.store("B0B", "carol", "subject", "body").await.is_err());

        // Nothing was created for either party.
        assert_eq!(store.list("carol").await.unwrap(), Vec::<String>::new());
        assert!(!dir.path().join("spool").join("Carol!").exists());
    }

    #[tokio::test]
    async fn test_list_unknown_or_invalid_user_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        assert_eq!(store.list("nobody").await.unwrap(), Vec::<String>::new());
        assert_eq!(store.list("NOBODY").await.unwrap(), Vec::<String>::new());
    }

    #[tokio::test]
    async fn test_read_not_found() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        assert!(store.read("carol", 1).await.unwrap_err().is_not_found());
        assert!(store.read("carol", 0).await.unwrap_err().is_not_found());
        assert!(store.read("carol", -3).await.unwrap_err().is_not_found());

        store.store("bob", "carol", "Hi", "body").await.unwrap();
        assert!(store.read("carol", 2).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_delete_then_read_reports_not_found() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        let id = store.store("bob", "carol", "Hi", "body").await.unwrap() as i64;
        store.delete("carol", id).await.unwrap();

        assert!(store.read("carol", id).await.unwrap_err().is_not_found());
        assert!(store.delete("carol", id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_delete_nonexistent_leaves_mailbox_unchanged() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        store.store("bob", "carol", "one", "body").await.unwrap();
        assert!(store.delete("carol", 9).await.unwrap_err().is_not_found());
        assert_eq!(store.list("carol").await.unwrap(), vec!["one"]);
    }

    #[tokio::test]
    async fn test_deleting_highest_id_reuses_it() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        store.store("bob", "carol", "one", "a").await.unwrap();
        let second = store.store("bob", "carol", "two", "b").await.unwrap();
        store.delete("carol", second as i64).await.unwrap();

        // Highest-ID-plus-one allocation hands the freed ID out again.
        assert_eq!(store.store("bob", "carol", "again", "c").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_deleting_lower_id_does_not_disturb_order() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        store.store("bob", "carol", "one", "a").await.unwrap();
        store.store("bob", "carol", "two", "b").await.unwrap();
        store.store("bob", "carol", "three", "c").await.unwrap();
        store.delete("carol", 2).await.unwrap();

        assert_eq!(store.list("carol").await.unwrap(), vec!["one", "three"]);
        assert_eq!(store.store("bob", "carol", "four", "d").await.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_multiline_body_verbatim() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        let body = "line one\n\nline three\n";
        let id = store.store("bob", "carol", "Hi", body).await.unwrap();
        let message = store.read("carol", id as i64).await.unwrap();
        assert_eq!(message.body, body);
    }

    #[tokio::test]
    async fn test_stray_files_ignored_in_mailbox() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        store.store("bob", "carol", "one", "a").await.unwrap();
        let mailbox = dir.path().join("spool").join("carol");
        std::fs::write(mailbox.join("notes.txt"), "ignore me").unwrap();
        std::fs::write(mailbox.join("abc.msg"), "not numbered").unwrap();

        assert_eq!(store.list("carol").await.unwrap(), vec!["one"]);
        assert_eq!(store.store("bob", "carol", "two", "b").await.unwrap(), 2);
    }
}
