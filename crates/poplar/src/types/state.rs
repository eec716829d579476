//! Session state types.
//!
//! This module defines the states a POP3 session moves through,
//! following RFC 1939 section 3.

/// Session state as defined by RFC 1939.
///
/// The POP3 protocol has three states plus a terminal marker:
/// - `Authorization`: Initial state, the client identifies itself
/// - `Transaction`: The maildrop is locked and may be inspected
/// - `Update`: Deletions are being committed after QUIT
/// - `Terminated`: The connection is being closed
///
/// Transitions only move forward. Authorization may jump straight to
/// Terminated on QUIT.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SessionState {
    /// Waiting for credentials.
    ///
    /// In this state, these commands are valid:
    /// - USER
    /// - PASS
    /// - APOP
    /// - CAPA
    /// - QUIT
    #[default]
    Authorization,

    /// Signed in, the maildrop is locked.
    ///
    /// In this state, these commands are valid:
    /// - STAT
    /// - LIST
    /// - UIDL
    /// - RETR
    /// - TOP
    /// - DELE
    /// - RSET
    /// - NOOP
    /// - CAPA
    /// - QUIT
    Transaction,

    /// QUIT was received in Transaction; deletions are being committed.
    ///
    /// No command is valid in this state.
    Update,

    /// The session is over; nothing more is read from the client.
    Terminated,
}

impl SessionState {
    /// Returns `true` if the session loop must stop.
    #[must_use]
    pub const fn is_terminated(self) -> bool {
        matches!(self, Self::Terminated)
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Authorization => "AUTHORIZATION",
            Self::Transaction => "TRANSACTION",
            Self::Update => "UPDATE",
            Self::Terminated => "TERMINATED",
        };
        f.write_str(name)
    }
}
