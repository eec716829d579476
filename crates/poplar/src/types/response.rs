//! POP3 single-line responses.

/// Status indicator opening every POP3 response line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Positive response, `+OK`.
    Ok,
    /// Negative response, `-ERR`.
    Err,
}

impl Status {
    /// Returns the wire form of the indicator.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "+OK",
            Self::Err => "-ERR",
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single-line POP3 response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Status indicator.
    pub status: Status,
    /// Text following the indicator, possibly empty.
    pub text: String,
}

impl Response {
    /// Creates a positive response.
    #[must_use]
    pub fn ok(text: impl Into<String>) -> Self {
        Self {
            status: Status::Ok,
            text: text.into(),
        }
    }

    /// Creates a negative response.
    #[must_use]
    pub fn err(text: impl Into<String>) -> Self {
        Self {
            status: Status::Err,
            text: text.into(),
        }
    }

    /// Serializes the response, including the CRLF terminator.
    ///
    /// CR and LF inside the text are replaced by spaces so a response can
    /// never span more than one line.
    #[must_use]
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.status.as_str().len() + self.text.len() + 3);
        buf.extend_from_slice(self.status.as_str().as_bytes());
        if !self.text.is_empty() {
            buf.push(b' ');
            buf.extend(
                self.text
                    .bytes()
                    .map(|b| if b == b'\r' || b == b'\n' { b' ' } else { b }),
            );
        }
        buf.extend_from_slice(b"\r\n");
        buf
    }
}
