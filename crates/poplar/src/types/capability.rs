//! Capabilities announced in response to CAPA (RFC 2449).

/// POP3 capability tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Capability {
    /// TOP command support
    Top,
    /// USER/PASS authentication
    User,
    /// The server accepts several commands before answering the first
    Pipelining,
    /// UIDL command support
    Uidl,
    /// Message retention policy (`NEVER`, a number of days, ...)
    Expire(String),
    /// Server implementation name
    Implementation(String),
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Top => write!(f, "TOP"),
            Self::User => write!(f, "USER"),
            Self::Pipelining => write!(f, "PIPELINING"),
            Self::Uidl => write!(f, "UIDL"),
            Self::Expire(policy) => write!(f, "EXPIRE {policy}"),
            Self::Implementation(name) => write!(f, "IMPLEMENTATION {name}"),
        }
    }
}
