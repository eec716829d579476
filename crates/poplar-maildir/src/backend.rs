//! Directory-per-user message store.
//!
//! The maildrop of user `u` is the directory `<root>/u`. Every regular,
//! non-hidden file in it is one message, ordered by modification time and
//! then by name. The file name is the message's unique id.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use async_trait::async_trait;
use poplar::{Backend, BackendError, BackendResult, Error as SessionError, MessageNumber, MessageReader};

use crate::credentials::Credentials;
use crate::error::{Error, Result};
use crate::locks::MailboxLocks;

/// Prefix of the hidden names files are moved to while a deletion batch
/// is being committed.
const STAGING_PREFIX: &str = ".poplar-delete.";

/// Shared message store. Hands out one [`MaildirBackend`] per connection.
#[derive(Debug, Clone)]
pub struct Maildir {
    root: Arc<PathBuf>,
    credentials: Arc<Credentials>,
    locks: MailboxLocks,
}

impl Maildir {
    /// Creates a store rooted at `root`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `root` is not a directory.
    pub async fn open(root: impl Into<PathBuf>, credentials: Credentials) -> Result<Self> {
        let root = root.into();
        let metadata = tokio::fs::metadata(&root).await?;
        if !metadata.is_dir() {
            return Err(Error::Config(format!(
                "{} is not a directory",
                root.display()
            )));
        }
        tracing::info!(root = %root.display(), users = credentials.len(), "maildir store ready");

        Ok(Self {
            root: Arc::new(root),
            credentials: Arc::new(credentials),
            locks: MailboxLocks::new(),
        })
    }

    /// Root directory holding one subdirectory per user.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Lock registry shared by every backend of this store.
    #[must_use]
    pub const fn locks(&self) -> &MailboxLocks {
        &self.locks
    }

    /// Creates the backend for a new session.
    #[must_use]
    pub fn backend(&self) -> MaildirBackend {
        MaildirBackend {
            store: self.clone(),
            user: None,
            banner: None,
            locked: false,
            messages: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
struct StoredMessage {
    name: String,
    path: PathBuf,
    size: u64,
}

/// Per-session view of a [`Maildir`].
#[derive(Debug)]
pub struct MaildirBackend {
    store: Maildir,
    user: Option<String>,
    banner: Option<String>,
    locked: bool,
    /// Listing taken when the message count was first requested.
    messages: Vec<StoredMessage>,
}

impl MaildirBackend {
    /// Authenticated user, if any.
    #[must_use]
    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    fn signed_in_user(&self) -> BackendResult<&str> {
        self.user
            .as_deref()
            .ok_or_else(|| BackendError::internal("no authenticated user"))
    }

    fn mailbox(&self) -> BackendResult<PathBuf> {
        Ok(self.store.root.join(self.signed_in_user()?))
    }

    fn message(&self, number: MessageNumber) -> BackendResult<&StoredMessage> {
        self.messages
            .get(number.index())
            .ok_or_else(|| BackendError::internal(format!("message {number} is not in the listing")))
    }

    async fn scan(&self) -> BackendResult<Vec<StoredMessage>> {
        let dir = self.mailbox()?;
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut found = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            if name.starts_with('.') {
                continue;
            }
            let metadata = entry.metadata().await?;
            if !metadata.is_file() {
                continue;
            }
            let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
            found.push((
                modified,
                StoredMessage {
                    name,
                    path: entry.path(),
                    size: metadata.len(),
                },
            ));
        }

        found.sort_by(|(a_time, a), (b_time, b)| a_time.cmp(b_time).then_with(|| a.name.cmp(&b.name)));
        Ok(found.into_iter().map(|(_, message)| message).collect())
    }
}

#[async_trait]
impl Backend for MaildirBackend {
    async fn authenticate_pass(&mut self, username: &str, password: &str) -> BackendResult<()> {
        if !self.store.credentials.verify_pass(username, password) {
            tracing::info!(user = username, "PASS authentication failed");
            return Err(BackendError::rejected("invalid credentials"));
        }
        self.user = Some(username.to_string());
        Ok(())
    }

    async fn authenticate_apop(&mut self, username: &str, digest: &str) -> BackendResult<()> {
        let banner = self
            .banner
            .as_deref()
            .ok_or_else(|| BackendError::internal("APOP attempted without a banner"))?;
        if !self.store.credentials.verify_apop(username, banner, digest) {
            tracing::info!(user = username, "APOP authentication failed");
            return Err(BackendError::rejected("invalid credentials"));
        }
        self.user = Some(username.to_string());
        Ok(())
    }

    async fn set_banner(&mut self, banner: &str) -> BackendResult<()> {
        self.banner = Some(banner.to_string());
        Ok(())
    }

    async fn lock_mailbox(&mut self) -> BackendResult<()> {
        let user = self.signed_in_user()?;
        if !self.store.locks.try_lock(user) {
            return Err(BackendError::rejected("maildrop already locked"));
        }
        tracing::debug!(user = %user, "maildrop locked");
        self.locked = true;
        Ok(())
    }

    async fn unlock_mailbox(&mut self) -> BackendResult<()> {
        let user = self.signed_in_user()?.to_string();
        if !std::mem::take(&mut self.locked) || !self.store.locks.unlock(&user) {
            return Err(BackendError::internal(format!("maildrop of {user} was not locked")));
        }
        tracing::debug!(user = %user, "maildrop unlocked");
        Ok(())
    }

    async fn message_count(&mut self) -> BackendResult<u32> {
        self.messages = self.scan().await?;
        u32::try_from(self.messages.len())
            .map_err(|_| BackendError::internal("too many messages in maildrop"))
    }

    async fn message_size(&mut self, number: MessageNumber) -> BackendResult<u64> {
        Ok(self.message(number)?.size)
    }

    async fn message_id(&mut self, number: MessageNumber) -> BackendResult<String> {
        Ok(self.message(number)?.name.clone())
    }

    async fn open_message(&mut self, number: MessageNumber) -> BackendResult<MessageReader> {
        let path = &self.message(number)?.path;
        match tokio::fs::File::open(path).await {
            Ok(file) => Ok(Box::new(file)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                Err(BackendError::rejected(format!("message {number} is no longer available")))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn delete_messages(&mut self, numbers: &[MessageNumber]) -> BackendResult<()> {
        let targets = numbers
            .iter()
            .map(|&number| self.message(number).cloned())
            .collect::<BackendResult<Vec<_>>>()?;
        if targets.is_empty() {
            return Ok(());
        }

        let dir = self.mailbox()?;
        let mut staged: Vec<(PathBuf, PathBuf)> = Vec::with_capacity(targets.len());
        for message in &targets {
            let hidden = dir.join(format!("{STAGING_PREFIX}{}", message.name));
            if let Err(err) = tokio::fs::rename(&message.path, &hidden).await {
                rollback(&staged).await;
                return Err(err.into());
            }
            staged.push((message.path.clone(), hidden));
        }

        for (_, hidden) in &staged {
            if let Err(err) = tokio::fs::remove_file(hidden).await {
                tracing::warn!(path = %hidden.display(), error = %err, "failed to remove staged message");
            }
        }
        tracing::debug!(user = self.user.as_deref(), count = staged.len(), "messages deleted");
        Ok(())
    }

    fn on_session_error(&mut self, err: &SessionError) {
        tracing::error!(user = self.user.as_deref(), error = %err, "session failed");
    }
}

/// Moves staged files back to their original names.
async fn rollback(staged: &[(PathBuf, PathBuf)]) {
    for (original, hidden) in staged.iter().rev() {
        if let Err(err) = tokio::fs::rename(hidden, original).await {
            tracing::error!(
                path = %original.display(),
                error = %err,
                "failed to restore message after aborted deletion"
            );
        }
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use std::time::Duration;

    use tokio::io::AsyncReadExt;

    use super::*;
    use crate::credentials::apop_digest;

    fn num(n: u32) -> MessageNumber {
        MessageNumber::new(n).unwrap()
    }

    async fn store_with(messages: &[(&str, &str)]) -> (tempfile::TempDir, Maildir) {
        let dir = tempfile::tempdir().unwrap();
        let mailbox = dir.path().join("alice");
        tokio::fs::create_dir(&mailbox).await.unwrap();
        for (name, body) in messages {
            tokio::fs::write(mailbox.join(name), body).await.unwrap();
            // Distinct modification times keep the listing order stable.
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        let credentials = Credentials::default().with_user("alice", "secret");
        let store = Maildir::open(dir.path(), credentials).await.unwrap();
        (dir, store)
    }

    async fn signed_in(store: &Maildir) -> MaildirBackend {
        let mut backend = store.backend();
        backend.authenticate_pass("alice", "secret").await.unwrap();
        backend.lock_mailbox().await.unwrap();
        backend
    }

    #[tokio::test]
    async fn test_open_requires_directory() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("file");
        tokio::fs::write(&file, "x").await.unwrap();
        let err = Maildir::open(&file, Credentials::default()).await.unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[tokio::test]
    async fn test_pass_authentication() {
        let (_dir, store) = store_with(&[]).await;
        let mut backend = store.backend();
        let err = backend.authenticate_pass("alice", "wrong").await.unwrap_err();
        assert!(matches!(err, BackendError::Rejected(_)));
        assert!(backend.user().is_none());
        backend.authenticate_pass("alice", "secret").await.unwrap();
        assert_eq!(backend.user(), Some("alice"));
    }

    #[tokio::test]
    async fn test_apop_authentication() {
        let (_dir, store) = store_with(&[]).await;
        let mut backend = store.backend();
        let banner = "<1.2.3@pop.example.com>";
        backend.set_banner(banner).await.unwrap();

        let digest = apop_digest(banner, "secret");
        assert!(backend.authenticate_apop("alice", "0000").await.is_err());
        backend.authenticate_apop("alice", &digest).await.unwrap();
        assert_eq!(backend.user(), Some("alice"));
    }

    #[tokio::test]
    async fn test_lock_is_exclusive_across_sessions() {
        let (_dir, store) = store_with(&[]).await;
        let mut first = signed_in(&store).await;

        let mut second = store.backend();
        second.authenticate_pass("alice", "secret").await.unwrap();
        let err = second.lock_mailbox().await.unwrap_err();
        assert_eq!(err.to_string(), "maildrop already locked");

        first.unlock_mailbox().await.unwrap();
        second.lock_mailbox().await.unwrap();
        assert!(store.locks().is_locked("alice"));
    }

    #[tokio::test]
    async fn test_listing_skips_hidden_files_and_directories() {
        let (dir, store) = store_with(&[("m1", "first"), ("m2", "second!")]).await;
        let mailbox = dir.path().join("alice");
        tokio::fs::write(mailbox.join(".tmp"), "hidden").await.unwrap();
        tokio::fs::create_dir(mailbox.join("sub")).await.unwrap();

        let mut backend = signed_in(&store).await;
        assert_eq!(backend.message_count().await.unwrap(), 2);
        assert_eq!(backend.message_id(num(1)).await.unwrap(), "m1");
        assert_eq!(backend.message_size(num(2)).await.unwrap(), 7);
        assert!(backend.message_size(num(3)).await.is_err());
    }

    #[tokio::test]
    async fn test_missing_mailbox_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = Maildir::open(dir.path(), Credentials::default().with_user("bob", "pw"))
            .await
            .unwrap();
        let mut backend = store.backend();
        backend.authenticate_pass("bob", "pw").await.unwrap();
        backend.lock_mailbox().await.unwrap();
        assert_eq!(backend.message_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_open_message_reads_content() {
        let (_dir, store) = store_with(&[("m1", "Subject: x\r\n\r\nhi\r\n")]).await;
        let mut backend = signed_in(&store).await;
        backend.message_count().await.unwrap();

        let mut reader = backend.open_message(num(1)).await.unwrap();
        let mut content = String::new();
        reader.read_to_string(&mut content).await.unwrap();
        assert_eq!(content, "Subject: x\r\n\r\nhi\r\n");
    }

    #[tokio::test]
    async fn test_delete_removes_only_requested_files() {
        let (dir, store) = store_with(&[("m1", "a"), ("m2", "b"), ("m3", "c")]).await;
        let mut backend = signed_in(&store).await;
        backend.message_count().await.unwrap();

        backend.delete_messages(&[num(3), num(1)]).await.unwrap();

        let mailbox = dir.path().join("alice");
        assert!(!mailbox.join("m1").exists());
        assert!(mailbox.join("m2").exists());
        assert!(!mailbox.join("m3").exists());
        let mut entries = tokio::fs::read_dir(&mailbox).await.unwrap();
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await.unwrap() {
            names.push(entry.file_name().into_string().unwrap());
        }
        assert_eq!(names, vec!["m2"]);
    }

    #[tokio::test]
    async fn test_delete_is_all_or_nothing() {
        let (dir, store) = store_with(&[("m1", "a"), ("m2", "b")]).await;
        let mut backend = signed_in(&store).await;
        backend.message_count().await.unwrap();

        // The second file vanishes behind the session's back.
        let mailbox = dir.path().join("alice");
        tokio::fs::remove_file(mailbox.join("m2")).await.unwrap();

        assert!(backend.delete_messages(&[num(1), num(2)]).await.is_err());
        assert!(mailbox.join("m1").exists());
        assert!(!mailbox.join(format!("{STAGING_PREFIX}m1")).exists());
    }

    #[tokio::test]
    async fn test_empty_delete_is_noop() {
        let (dir, store) = store_with(&[("m1", "a")]).await;
        let mut backend = signed_in(&store).await;
        backend.message_count().await.unwrap();
        backend.delete_messages(&[]).await.unwrap();
        assert!(dir.path().join("alice/m1").exists());
    }

    #[tokio::test]
    async fn test_unlock_without_lock_fails() {
        let (_dir, store) = store_with(&[]).await;
        let mut backend = store.backend();
        backend.authenticate_pass("alice", "secret").await.unwrap();
        assert!(backend.unlock_mailbox().await.is_err());
    }
}
