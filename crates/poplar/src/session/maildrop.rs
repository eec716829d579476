//! Per-session maildrop snapshot.

use std::collections::BTreeSet;

use crate::error::{Error, Result};
use crate::types::MessageNumber;

/// Message sizes captured at sign-in plus the deletion marks made since.
///
/// The snapshot never changes size during a session. Deleting a message
/// only hides it: every read-only command skips marked numbers, and the
/// marks are handed to the backend once, when the session enters UPDATE.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Maildrop {
    sizes: Vec<u64>,
    deleted: BTreeSet<MessageNumber>,
}

impl Maildrop {
    /// Creates a snapshot; `sizes[i]` is the size of message `i + 1`.
    #[must_use]
    pub fn new(sizes: Vec<u64>) -> Self {
        Self {
            sizes,
            deleted: BTreeSet::new(),
        }
    }

    /// Number of messages in the snapshot, deleted ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sizes.len()
    }

    /// Returns true if the snapshot holds no messages at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sizes.is_empty()
    }

    /// Number of messages not marked as deleted.
    #[must_use]
    pub fn visible_count(&self) -> usize {
        self.sizes.len() - self.deleted.len()
    }

    /// Total size in octets of the messages not marked as deleted.
    #[must_use]
    pub fn visible_size(&self) -> u64 {
        self.visible().map(|(_, size)| size).sum()
    }

    /// Iterates over undeleted messages in ascending order.
    pub fn visible(&self) -> impl Iterator<Item = (MessageNumber, u64)> + '_ {
        self.sizes
            .iter()
            .zip(1u32..)
            .filter_map(|(&size, n)| MessageNumber::new(n).map(|number| (number, size)))
            .filter(|(number, _)| !self.deleted.contains(number))
    }

    /// Resolves a client-supplied number to an undeleted message.
    ///
    /// # Errors
    ///
    /// Returns a reportable error if the number is outside the snapshot or
    /// the message is marked as deleted.
    pub fn lookup(&self, n: u32) -> Result<(MessageNumber, u64)> {
        let number = MessageNumber::new(n).ok_or_else(|| Error::no_such_message(n))?;
        let size = *self
            .sizes
            .get(number.index())
            .ok_or_else(|| Error::no_such_message(n))?;
        if self.deleted.contains(&number) {
            return Err(Error::already_deleted(number));
        }
        Ok((number, size))
    }

    /// Marks a message as deleted.
    ///
    /// # Errors
    ///
    /// Same as [`Maildrop::lookup`]; marking a message twice is an error.
    pub fn mark_deleted(&mut self, n: u32) -> Result<MessageNumber> {
        let (number, _) = self.lookup(n)?;
        self.deleted.insert(number);
        Ok(number)
    }

    /// Clears every deletion mark.
    pub fn reset(&mut self) {
        self.deleted.clear();
    }

    /// Removes and returns the deletion marks in ascending order.
    pub fn take_deleted(&mut self) -> Vec<MessageNumber> {
        std::mem::take(&mut self.deleted).into_iter().collect()
    }
}
