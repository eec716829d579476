//! Byte-stuffing for multi-line responses (RFC 1939 section 3).
//!
//! Every line of a multi-line block is terminated by CRLF; a line starting
//! with the termination octet `.` gets a second `.` prepended; the block
//! ends with a line holding a single `.`.

use bytes::{BufMut, BytesMut};

/// Termination octet.
const MARKER: u8 = b'.';

/// Incremental byte-stuffing encoder.
///
/// Input may arrive in arbitrary chunks; line boundaries that straddle
/// chunks are tracked internally. Bare LF line endings are normalized to
/// CRLF. A CR that is not followed by LF is passed through as data.
#[derive(Debug, Clone, Copy)]
pub struct DotStuffer {
    at_line_start: bool,
    pending_cr: bool,
}

impl Default for DotStuffer {
    fn default() -> Self {
        Self {
            at_line_start: true,
            pending_cr: false,
        }
    }
}

impl DotStuffer {
    /// Creates an encoder positioned at the start of a line.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Encodes a chunk of content into `out`.
    pub fn encode(&mut self, chunk: &[u8], out: &mut BytesMut) {
        out.reserve(chunk.len() + 2);
        for &b in chunk {
            if self.pending_cr {
                self.pending_cr = false;
                if b == b'\n' {
                    out.put_slice(b"\r\n");
                    self.at_line_start = true;
                    continue;
                }
                out.put_u8(b'\r');
                self.at_line_start = false;
            }

            match b {
                b'\r' => self.pending_cr = true,
                b'\n' => {
                    out.put_slice(b"\r\n");
                    self.at_line_start = true;
                }
                _ => {
                    if self.at_line_start && b == MARKER {
                        out.put_u8(MARKER);
                    }
                    out.put_u8(b);
                    self.at_line_start = false;
                }
            }
        }
    }

    /// Terminates any partial line and appends the termination line.
    pub fn finish(self, out: &mut BytesMut) {
        if self.pending_cr || !self.at_line_start {
            out.put_slice(b"\r\n");
        }
        out.put_slice(b".\r\n");
    }
}
