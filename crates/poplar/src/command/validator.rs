//! State and arity rules for each verb.

use super::Verb;
use crate::error::{Error, Result};
use crate::types::SessionState;

const AUTHORIZATION: &[SessionState] = &[SessionState::Authorization];
const TRANSACTION: &[SessionState] = &[SessionState::Transaction];
const EITHER: &[SessionState] = &[SessionState::Authorization, SessionState::Transaction];

/// Where a verb is legal and how many arguments it takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rule {
    /// States in which the verb may be issued.
    pub states: &'static [SessionState],
    /// Accepted argument counts.
    pub arities: &'static [usize],
}

impl Rule {
    const fn new(states: &'static [SessionState], arities: &'static [usize]) -> Self {
        Self { states, arities }
    }

    /// Checks the session state, then the argument count.
    ///
    /// # Errors
    ///
    /// Returns a reportable error for the first check that fails.
    pub fn validate(&self, state: SessionState, argc: usize) -> Result<()> {
        if !self.states.contains(&state) {
            return Err(Error::unexpected_state());
        }
        if !self.arities.contains(&argc) {
            return Err(Error::invalid_syntax());
        }
        Ok(())
    }
}

impl Verb {
    /// Returns the validation rule for this verb.
    #[must_use]
    pub const fn rule(self) -> Rule {
        match self {
            Self::User | Self::Pass => Rule::new(AUTHORIZATION, &[1]),
            Self::Apop => Rule::new(AUTHORIZATION, &[2]),
            Self::Stat | Self::Rset | Self::Noop => Rule::new(TRANSACTION, &[0]),
            Self::List | Self::Uidl => Rule::new(TRANSACTION, &[0, 1]),
            Self::Retr | Self::Dele => Rule::new(TRANSACTION, &[1]),
            Self::Top => Rule::new(TRANSACTION, &[2]),
            Self::Quit | Self::Capa => Rule::new(EITHER, &[0]),
        }
    }
}
