//! Message ordinals.

use std::num::NonZeroU32;

/// Message number within a session's maildrop.
///
/// Numbers are assigned from 1 when the client signs in and stay fixed for
/// the rest of the session, even after messages are marked as deleted.
/// They carry no meaning across sessions; use the unique id for that.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MessageNumber(pub NonZeroU32);

impl MessageNumber {
    /// Creates a new message number.
    ///
    /// Returns `None` if the value is 0.
    #[must_use]
    pub fn new(n: u32) -> Option<Self> {
        NonZeroU32::new(n).map(Self)
    }

    /// Returns the underlying value.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0.get()
    }

    /// Returns the zero-based position of the message.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0.get() as usize - 1
    }
}

impl std::fmt::Display for MessageNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn zero_is_rejected() {
        assert!(MessageNumber::new(0).is_none());
    }

    #[test]
    fn index_is_zero_based() {
        let n = MessageNumber::new(1).unwrap();
        assert_eq!(n.get(), 1);
        assert_eq!(n.index(), 0);
        assert_eq!(n.to_string(), "1");
    }

    #[test]
    fn ordering_follows_value() {
        let a = MessageNumber::new(2).unwrap();
        let b = MessageNumber::new(10).unwrap();
        assert!(a < b);
    }
}
