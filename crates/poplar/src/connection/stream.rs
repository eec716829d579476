//! Framed POP3 stream.
//!
//! POP3 commands are single CRLF-terminated lines. Responses are either a
//! single status line or a status line followed by a byte-stuffed block.
//! Output is buffered and flushed once per response.

use std::io;

use bytes::BytesMut;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};

use super::DotStuffer;
use crate::error::{Error, Result};
use crate::types::Response;

/// Default buffer size for reading and writing.
const DEFAULT_BUFFER_SIZE: usize = 8192;

/// Maximum command line length, terminator included.
pub const MAX_LINE_LENGTH: usize = 1024;

/// Buffered output above this size is written out mid-block.
const FLUSH_THRESHOLD: usize = 64 * 1024;

/// Line-oriented POP3 connection.
pub struct PopStream<S> {
    reader: BufReader<S>,
    write_buffer: BytesMut,
    /// A multi-line block has been started and not yet terminated.
    block_open: bool,
}

impl<S> PopStream<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wraps a byte stream.
    pub fn new(stream: S) -> Self {
        Self {
            reader: BufReader::with_capacity(DEFAULT_BUFFER_SIZE, stream),
            write_buffer: BytesMut::with_capacity(DEFAULT_BUFFER_SIZE),
            block_open: false,
        }
    }

    /// Reads one command line, without its terminator.
    ///
    /// Lines may end in CRLF or a bare LF. Invalid UTF-8 is replaced
    /// rather than rejected so the validator can answer it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] with `UnexpectedEof` if the client closed the
    /// connection, and [`Error::Protocol`] if the line exceeds
    /// [`MAX_LINE_LENGTH`].
    pub async fn read_line(&mut self) -> Result<String> {
        let mut line = Vec::new();

        loop {
            let buf = self.reader.fill_buf().await?;
            if buf.is_empty() {
                return Err(Error::Io(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "connection closed",
                )));
            }

            if let Some(pos) = buf.iter().position(|&b| b == b'\n') {
                line.extend_from_slice(&buf[..=pos]);
                self.reader.consume(pos + 1);
                break;
            }

            let len = buf.len();
            line.extend_from_slice(buf);
            self.reader.consume(len);

            if line.len() > MAX_LINE_LENGTH {
                return Err(Error::Protocol("line too long".to_string()));
            }
        }

        if line.len() > MAX_LINE_LENGTH {
            return Err(Error::Protocol("line too long".to_string()));
        }

        while matches!(line.last(), Some(b'\r' | b'\n')) {
            line.pop();
        }

        Ok(String::from_utf8_lossy(&line).into_owned())
    }

    /// Writes a single-line response and flushes it.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub async fn write_response(&mut self, response: &Response) -> Result<()> {
        self.write_buffer.extend_from_slice(&response.serialize());
        self.flush().await
    }

    /// Writes `+OK <text>`.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub async fn ok(&mut self, text: impl Into<String>) -> Result<()> {
        self.write_response(&Response::ok(text)).await
    }

    /// Writes `-ERR <text>`.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub async fn err(&mut self, text: impl Into<String>) -> Result<()> {
        self.write_response(&Response::err(text)).await
    }

    /// Starts a multi-line response: buffers the `+OK` status line and
    /// returns a writer for the byte-stuffed block.
    ///
    /// Nothing is sent until the block grows large or is finished.
    pub fn multiline(&mut self, text: impl Into<String>) -> MultiLine<'_, S> {
        self.write_buffer
            .extend_from_slice(&Response::ok(text).serialize());
        self.block_open = true;
        MultiLine {
            stream: self,
            stuffer: DotStuffer::new(),
        }
    }

    /// Writes all buffered output to the stream.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub async fn flush(&mut self) -> Result<()> {
        let stream = self.reader.get_mut();
        stream.write_all(&self.write_buffer).await?;
        stream.flush().await?;
        self.write_buffer.clear();
        Ok(())
    }

    /// Drops output that has not been written yet.
    ///
    /// Returns true if a multi-line block was left unterminated. Part of it
    /// may already be on the wire, so no response can be framed after it.
    pub fn discard_pending(&mut self) -> bool {
        self.write_buffer.clear();
        std::mem::take(&mut self.block_open)
    }

    /// Flushes pending output and shuts down the write side.
    ///
    /// # Errors
    ///
    /// Returns an error if the shutdown fails.
    pub async fn shutdown(&mut self) -> Result<()> {
        self.flush().await?;
        self.reader.get_mut().shutdown().await?;
        Ok(())
    }
}

/// Writer for the body of a multi-line response.
///
/// The block is only complete once [`MultiLine::finish`] has been awaited.
pub struct MultiLine<'a, S> {
    stream: &'a mut PopStream<S>,
    stuffer: DotStuffer,
}

impl<S> MultiLine<'_, S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Writes one line; the terminator is added.
    ///
    /// # Errors
    ///
    /// Returns an error if flushing buffered output fails.
    pub async fn write_line(&mut self, line: &str) -> Result<()> {
        self.stuffer
            .encode(line.as_bytes(), &mut self.stream.write_buffer);
        self.stuffer.encode(b"\r\n", &mut self.stream.write_buffer);
        self.maybe_flush().await
    }

    /// Writes raw content, which may span or split lines.
    ///
    /// # Errors
    ///
    /// Returns an error if flushing buffered output fails.
    pub async fn write(&mut self, chunk: &[u8]) -> Result<()> {
        self.stuffer.encode(chunk, &mut self.stream.write_buffer);
        self.maybe_flush().await
    }

    /// Terminates the block and flushes the whole response.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub async fn finish(mut self) -> Result<()> {
        self.stuffer.finish(&mut self.stream.write_buffer);
        self.stream.flush().await?;
        self.stream.block_open = false;
        Ok(())
    }

    async fn maybe_flush(&mut self) -> Result<()> {
        if self.stream.write_buffer.len() >= FLUSH_THRESHOLD {
            self.stream.flush().await?;
        }
        Ok(())
    }
}
