//! In-process maildrop lock registry.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

/// Exclusive advisory locks on maildrops, shared by every session of one
/// process.
///
/// Cloning is cheap; all clones see the same set of locks.
#[derive(Debug, Clone, Default)]
pub struct MailboxLocks {
    held: Arc<Mutex<HashSet<String>>>,
}

impl MailboxLocks {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes the lock for `user`. Returns false if it is already held.
    pub fn try_lock(&self, user: &str) -> bool {
        self.held
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(user.to_string())
    }

    /// Releases the lock for `user`. Returns false if it was not held.
    pub fn unlock(&self, user: &str) -> bool {
        self.held
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(user)
    }

    /// Returns true if the lock for `user` is held.
    #[must_use]
    pub fn is_locked(&self, user: &str) -> bool {
        self.held
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_is_exclusive() {
        let locks = MailboxLocks::new();
        assert!(locks.try_lock("alice"));
        assert!(!locks.try_lock("alice"));
        assert!(locks.try_lock("bob"));
    }

    #[test]
    fn unlock_releases() {
        let locks = MailboxLocks::new();
        locks.try_lock("alice");
        assert!(locks.unlock("alice"));
        assert!(!locks.is_locked("alice"));
        assert!(!locks.unlock("alice"));
        assert!(locks.try_lock("alice"));
    }

    #[test]
    fn clones_share_state() {
        let locks = MailboxLocks::new();
        let other = locks.clone();
        assert!(locks.try_lock("alice"));
        assert!(other.is_locked("alice"));
    }
}
