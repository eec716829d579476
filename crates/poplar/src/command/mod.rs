//! POP3 commands.
//!
//! A request line goes through three steps before any handler runs:
//! the keyword is looked up as a [`Verb`], the verb's [`Rule`] checks the
//! session state and then the argument count, and finally the arguments
//! are converted into a typed [`Command`].

mod validator;

pub use validator::Rule;

use crate::error::{Error, Result};
use crate::parser::Request;
use crate::types::SessionState;

/// POP3 command keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    /// USER - Name the mailbox
    User,
    /// PASS - Password for the named mailbox
    Pass,
    /// APOP - Digest authentication
    Apop,
    /// STAT - Maildrop summary
    Stat,
    /// LIST - Message sizes
    List,
    /// UIDL - Unique message ids
    Uidl,
    /// RETR - Retrieve a message
    Retr,
    /// TOP - Retrieve headers and the first lines of a body
    Top,
    /// DELE - Mark a message as deleted
    Dele,
    /// RSET - Unmark all deleted messages
    Rset,
    /// NOOP - No operation
    Noop,
    /// QUIT - End the session
    Quit,
    /// CAPA - List capabilities
    Capa,
}

impl Verb {
    /// Looks up a keyword. Expects an upper-case keyword.
    #[must_use]
    pub fn parse(keyword: &str) -> Option<Self> {
        Some(match keyword {
            "USER" => Self::User,
            "PASS" => Self::Pass,
            "APOP" => Self::Apop,
            "STAT" => Self::Stat,
            "LIST" => Self::List,
            "UIDL" => Self::Uidl,
            "RETR" => Self::Retr,
            "TOP" => Self::Top,
            "DELE" => Self::Dele,
            "RSET" => Self::Rset,
            "NOOP" => Self::Noop,
            "QUIT" => Self::Quit,
            "CAPA" => Self::Capa,
            _ => return None,
        })
    }

    /// Returns the keyword.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "USER",
            Self::Pass => "PASS",
            Self::Apop => "APOP",
            Self::Stat => "STAT",
            Self::List => "LIST",
            Self::Uidl => "UIDL",
            Self::Retr => "RETR",
            Self::Top => "TOP",
            Self::Dele => "DELE",
            Self::Rset => "RSET",
            Self::Noop => "NOOP",
            Self::Quit => "QUIT",
            Self::Capa => "CAPA",
        }
    }
}

impl std::fmt::Display for Verb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated POP3 command with typed arguments.
///
/// Message numbers are kept as raw integers; whether they name an existing,
/// undeleted message is decided against the session's maildrop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// USER name
    User {
        /// Mailbox name
        name: String,
    },
    /// PASS password
    Pass {
        /// Password, may contain spaces
        password: String,
    },
    /// APOP name digest
    Apop {
        /// Mailbox name
        name: String,
        /// Hex MD5 digest of banner and shared secret
        digest: String,
    },
    /// STAT
    Stat,
    /// LIST [msg]
    List {
        /// Single message to list
        number: Option<u32>,
    },
    /// UIDL [msg]
    Uidl {
        /// Single message to list
        number: Option<u32>,
    },
    /// RETR msg
    Retr {
        /// Message to retrieve
        number: u32,
    },
    /// TOP msg n
    Top {
        /// Message to retrieve
        number: u32,
        /// Body lines to send after the headers
        lines: usize,
    },
    /// DELE msg
    Dele {
        /// Message to mark
        number: u32,
    },
    /// RSET
    Rset,
    /// NOOP
    Noop,
    /// QUIT
    Quit,
    /// CAPA
    Capa,
}

impl Command {
    /// Validates a request against the session state and builds the command.
    ///
    /// Checks run in a fixed order: unknown keyword, then state, then
    /// argument count, then argument syntax. Every failure is reportable.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Negative`] describing the first failed check.
    pub fn from_request(request: &Request, state: SessionState) -> Result<Self> {
        let verb = Verb::parse(&request.keyword).ok_or_else(Error::invalid_syntax)?;
        verb.rule().validate(state, request.args.len())?;
        Self::build(verb, &request.args)
    }

    fn build(verb: Verb, args: &[String]) -> Result<Self> {
        let arg = |i: usize| args.get(i).cloned().ok_or_else(Error::invalid_syntax);

        Ok(match verb {
            Verb::User => Self::User { name: arg(0)? },
            Verb::Pass => Self::Pass { password: arg(0)? },
            Verb::Apop => Self::Apop {
                name: arg(0)?,
                digest: arg(1)?,
            },
            Verb::Stat => Self::Stat,
            Verb::List => Self::List {
                number: args.first().map(|s| parse_number(s)).transpose()?,
            },
            Verb::Uidl => Self::Uidl {
                number: args.first().map(|s| parse_number(s)).transpose()?,
            },
            Verb::Retr => Self::Retr {
                number: parse_number(&arg(0)?)?,
            },
            Verb::Top => Self::Top {
                number: parse_number(&arg(0)?)?,
                lines: arg(1)?.parse().map_err(|_| Error::invalid_syntax())?,
            },
            Verb::Dele => Self::Dele {
                number: parse_number(&arg(0)?)?,
            },
            Verb::Rset => Self::Rset,
            Verb::Noop => Self::Noop,
            Verb::Quit => Self::Quit,
            Verb::Capa => Self::Capa,
        })
    }

    /// Returns the verb of this command.
    #[must_use]
    pub const fn verb(&self) -> Verb {
        match self {
            Self::User { .. } => Verb::User,
            Self::Pass { .. } => Verb::Pass,
            Self::Apop { .. } => Verb::Apop,
            Self::Stat => Verb::Stat,
            Self::List { .. } => Verb::List,
            Self::Uidl { .. } => Verb::Uidl,
            Self::Retr { .. } => Verb::Retr,
            Self::Top { .. } => Verb::Top,
            Self::Dele { .. } => Verb::Dele,
            Self::Rset => Verb::Rset,
            Self::Noop => Verb::Noop,
            Self::Quit => Verb::Quit,
            Self::Capa => Verb::Capa,
        }
    }
}

fn parse_number(s: &str) -> Result<u32> {
    if !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::invalid_syntax());
    }
    s.parse().map_err(|_| Error::invalid_syntax())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::manual_string_new, clippy::needless_collect, clippy::unreadable_literal, clippy::used_underscore_items, clippy::similar_names)]
mod tests {
    use super::*;
    use crate::parser::parse_request;

    fn command(line: &str, state: SessionState) -> Result<Command> {
        Command::from_request(&parse_request(line), state)
    }

    #[test]
    fn test_verb_lookup() {
        assert_eq!(Verb::parse("RETR"), Some(Verb::Retr));
        assert_eq!(Verb::parse("CAPA"), Some(Verb::Capa));
        assert_eq!(Verb::parse("HELO"), None);
        assert_eq!(Verb::Top.to_string(), "TOP");
    }

    #[test]
    fn test_unknown_keyword_is_reportable() {
        let err = command("FOO", SessionState::Transaction).unwrap_err();
        assert!(err.is_reportable());
        assert_eq!(err.to_string(), "invalid syntax");
    }

    #[test]
    fn test_user_command() {
        assert_eq!(
            command("user alice", SessionState::Authorization).unwrap(),
            Command::User {
                name: "alice".to_string()
            }
        );
    }

    #[test]
    fn test_apop_command() {
        assert_eq!(
            command("APOP mrose c4c9334bac560ecc979e58001b3e22fb", SessionState::Authorization)
                .unwrap(),
            Command::Apop {
                name: "mrose".to_string(),
                digest: "c4c9334bac560ecc979e58001b3e22fb".to_string(),
            }
        );
    }

    #[test]
    fn test_list_with_and_without_argument() {
        assert_eq!(
            command("LIST", SessionState::Transaction).unwrap(),
            Command::List { number: None }
        );
        assert_eq!(
            command("LIST 2", SessionState::Transaction).unwrap(),
            Command::List { number: Some(2) }
        );
    }

    #[test]
    fn test_top_command() {
        assert_eq!(
            command("TOP 1 0", SessionState::Transaction).unwrap(),
            Command::Top {
                number: 1,
                lines: 0
            }
        );
    }

    #[test]
    fn test_non_numeric_argument() {
        let err = command("RETR one", SessionState::Transaction).unwrap_err();
        assert_eq!(err.to_string(), "invalid syntax");
        let err = command("TOP 1 -5", SessionState::Transaction).unwrap_err();
        assert_eq!(err.to_string(), "invalid syntax");
        let err = command("DELE +1", SessionState::Transaction).unwrap_err();
        assert_eq!(err.to_string(), "invalid syntax");
    }

    #[test]
    fn test_zero_is_syntactically_valid() {
        assert_eq!(
            command("DELE 0", SessionState::Transaction).unwrap(),
            Command::Dele { number: 0 }
        );
    }

    #[test]
    fn test_state_checked_before_arity() {
        let err = command("STAT extra args", SessionState::Authorization).unwrap_err();
        assert_eq!(err.to_string(), "command not valid in this state");
    }

    #[test]
    fn test_verb_roundtrip() {
        let cmd = command("RSET", SessionState::Transaction).unwrap();
        assert_eq!(cmd.verb(), Verb::Rset);
    }
}
