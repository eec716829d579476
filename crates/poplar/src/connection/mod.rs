//! POP3 connection framing.

mod dot;
mod stream;

pub use dot::DotStuffer;
pub use stream::{MAX_LINE_LENGTH, MultiLine, PopStream};
