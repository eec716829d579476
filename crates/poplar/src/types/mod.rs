//! Core POP3 types.

mod capability;
mod number;
mod response;
mod state;

pub use capability::Capability;
pub use number::MessageNumber;
pub use response::{Response, Status};
pub use state::SessionState;
