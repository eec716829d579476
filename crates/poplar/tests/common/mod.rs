//! Shared fixtures for session tests: a recording backend and a line-based
//! client over an in-memory duplex stream.

#![allow(dead_code, clippy::unwrap_used, clippy::missing_panics_doc)]

use std::io::{self, Cursor};
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use async_trait::async_trait;
use tokio::io::{
    AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWriteExt, BufReader, DuplexStream, ReadBuf, ReadHalf,
    WriteHalf,
};
use tokio::task::JoinHandle;

use poplar::{
    Backend, BackendError, BackendResult, Error, MessageNumber, MessageReader, ServerConfig,
    Session,
};

/// Everything the session asked the backend to do.
#[derive(Debug, Default)]
pub struct Record {
    pub calls: Vec<String>,
    pub banner: Option<String>,
    pub deleted: Vec<Vec<u32>>,
    pub errors: Vec<String>,
}

impl Record {
    pub fn count(&self, call: &str) -> usize {
        self.calls.iter().filter(|c| c.as_str() == call).count()
    }
}

/// In-memory backend for user `a` with password `b`.
#[derive(Clone)]
pub struct MockBackend {
    pub messages: Vec<(String, Vec<u8>)>,
    /// Overrides the message count reported to the session.
    pub reported_count: Option<u32>,
    pub fail_banner: bool,
    pub internal_auth: bool,
    pub reject_lock: bool,
    pub internal_lock: bool,
    pub fail_count: bool,
    pub fail_size: bool,
    pub fail_delete: bool,
    pub panic_on_id: bool,
    /// How message content readers break after their first line.
    pub content_breaks: Option<Breakage>,
    pub record: Arc<Mutex<Record>>,
}

impl MockBackend {
    pub fn new(messages: Vec<(&str, Vec<u8>)>) -> Self {
        Self {
            messages: messages
                .into_iter()
                .map(|(id, body)| (id.to_string(), body))
                .collect(),
            reported_count: None,
            fail_banner: false,
            internal_auth: false,
            reject_lock: false,
            internal_lock: false,
            fail_count: false,
            fail_size: false,
            fail_delete: false,
            panic_on_id: false,
            content_breaks: None,
            record: Arc::default(),
        }
    }

    /// Two messages of 100 and 200 octets.
    pub fn two_messages() -> Self {
        Self::new(vec![("msg-1", filler(100)), ("msg-2", filler(200))])
    }

    fn log(&self, call: impl Into<String>) {
        self.record.lock().unwrap().calls.push(call.into());
    }

    fn message(&self, number: MessageNumber) -> BackendResult<&(String, Vec<u8>)> {
        self.messages
            .get(number.index())
            .ok_or_else(|| BackendError::internal(format!("no message {number}")))
    }
}

#[async_trait]
impl Backend for MockBackend {
    async fn authenticate_pass(&mut self, username: &str, password: &str) -> BackendResult<()> {
        self.log(format!("pass {username}"));
        if self.internal_auth {
            return Err(BackendError::internal("credential store unreachable"));
        }
        if username == "a" && password == "b" {
            Ok(())
        } else {
            Err(BackendError::rejected("invalid credentials"))
        }
    }

    async fn authenticate_apop(&mut self, username: &str, digest: &str) -> BackendResult<()> {
        self.log(format!("apop {username}"));
        if username == "a" && digest == "good-digest" {
            Ok(())
        } else {
            Err(BackendError::rejected("invalid credentials"))
        }
    }

    async fn set_banner(&mut self, banner: &str) -> BackendResult<()> {
        self.log("banner");
        if self.fail_banner {
            return Err(BackendError::internal("banner store failed"));
        }
        self.record.lock().unwrap().banner = Some(banner.to_string());
        Ok(())
    }

    async fn lock_mailbox(&mut self) -> BackendResult<()> {
        self.log("lock");
        if self.reject_lock {
            return Err(BackendError::rejected("maildrop already locked"));
        }
        if self.internal_lock {
            return Err(BackendError::internal("lock file unwritable"));
        }
        Ok(())
    }

    async fn unlock_mailbox(&mut self) -> BackendResult<()> {
        self.log("unlock");
        Ok(())
    }

    async fn message_count(&mut self) -> BackendResult<u32> {
        if self.fail_count {
            return Err(BackendError::rejected("maildrop unavailable"));
        }
        if let Some(count) = self.reported_count {
            return Ok(count);
        }
        Ok(u32::try_from(self.messages.len()).unwrap())
    }

    async fn message_size(&mut self, number: MessageNumber) -> BackendResult<u64> {
        if self.fail_size {
            return Err(BackendError::internal("stat failed"));
        }
        Ok(self.message(number)?.1.len() as u64)
    }

    async fn message_id(&mut self, number: MessageNumber) -> BackendResult<String> {
        assert!(!self.panic_on_id, "id lookup exploded");
        Ok(self.message(number)?.0.clone())
    }

    async fn open_message(&mut self, number: MessageNumber) -> BackendResult<MessageReader> {
        let body = self.message(number)?.1.clone();
        if let Some(breakage) = self.content_breaks {
            return Ok(Box::new(BrokenReader::new(body, breakage)));
        }
        Ok(Box::new(Cursor::new(body)))
    }

    async fn delete_messages(&mut self, numbers: &[MessageNumber]) -> BackendResult<()> {
        let mut numbers: Vec<u32> = numbers.iter().map(|n| n.get()).collect();
        numbers.sort_unstable();
        self.log("delete");
        self.record.lock().unwrap().deleted.push(numbers);
        if self.fail_delete {
            return Err(BackendError::internal("rename failed"));
        }
        Ok(())
    }

    fn on_session_error(&mut self, err: &Error) {
        self.record.lock().unwrap().errors.push(err.to_string());
    }
}

/// Failure injected after the content of every message.
#[derive(Debug, Clone, Copy)]
pub enum Breakage {
    Panic,
    Fail,
}

/// Yields a whole message, then breaks instead of reporting the end.
struct BrokenReader {
    body: Cursor<Vec<u8>>,
    breakage: Breakage,
}

impl BrokenReader {
    fn new(body: Vec<u8>, breakage: Breakage) -> Self {
        Self {
            body: Cursor::new(body),
            breakage,
        }
    }
}

impl AsyncRead for BrokenReader {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let before = buf.filled().len();
        let polled = Pin::new(&mut self.body).poll_read(cx, buf);
        if buf.filled().len() > before {
            return polled;
        }
        match self.breakage {
            Breakage::Panic => panic!("content reader exploded"),
            Breakage::Fail => Poll::Ready(Err(io::Error::other("disk read failed"))),
        }
    }
}

/// Message body of exactly `size` octets, made of short CRLF lines.
pub fn filler(size: usize) -> Vec<u8> {
    let mut body = Vec::with_capacity(size);
    while body.len() < size {
        if body.len() % 10 == 8 {
            body.extend_from_slice(b"\r\n");
        } else {
            body.push(b'x');
        }
    }
    body.truncate(size);
    body
}

/// Client side of a running session.
pub struct Client {
    reader: BufReader<ReadHalf<DuplexStream>>,
    writer: WriteHalf<DuplexStream>,
    pub session: JoinHandle<()>,
}

impl Client {
    /// Starts a session with the default configuration.
    pub fn start(backend: MockBackend) -> Self {
        Self::start_with(backend, ServerConfig::default())
    }

    pub fn start_with(backend: MockBackend, config: ServerConfig) -> Self {
        let (client, server) = tokio::io::duplex(64 * 1024);
        let session = Session::new(Arc::new(config), Box::new(backend), server);
        let handle = tokio::spawn(session.serve());
        let (reader, writer) = tokio::io::split(client);
        Self {
            reader: BufReader::new(reader),
            writer,
            session: handle,
        }
    }

    /// Reads one response line without its terminator.
    pub async fn line(&mut self) -> String {
        let mut line = String::new();
        let n = self.reader.read_line(&mut line).await.unwrap();
        assert!(n > 0, "connection closed unexpectedly");
        assert!(line.ends_with("\r\n"), "line not CRLF-terminated: {line:?}");
        line.truncate(line.len() - 2);
        line
    }

    pub async fn send(&mut self, command: &str) {
        self.writer
            .write_all(format!("{command}\r\n").as_bytes())
            .await
            .unwrap();
    }

    /// Sends a command and returns the status line.
    pub async fn cmd(&mut self, command: &str) -> String {
        self.send(command).await;
        self.line().await
    }

    /// Reads the body of a multi-line response, terminator excluded.
    /// Stuffing is left in place.
    pub async fn block(&mut self) -> Vec<String> {
        let mut lines = Vec::new();
        loop {
            let line = self.line().await;
            if line == "." {
                return lines;
            }
            lines.push(line);
        }
    }

    /// Reads the greeting and signs in as `a`.
    pub async fn login(&mut self) -> String {
        let greeting = self.line().await;
        assert!(greeting.starts_with("+OK"), "{greeting}");
        assert_eq!(self.cmd("USER a").await, "+OK welcome a");
        self.cmd("PASS b").await
    }

    /// Asserts the server closed the connection and waits for the session.
    pub async fn expect_closed(mut self) {
        let mut rest = String::new();
        let n = self.reader.read_line(&mut rest).await.unwrap();
        assert_eq!(n, 0, "expected EOF, got {rest:?}");
        self.session.await.unwrap();
    }

    /// Reads everything up to EOF and waits for the session to end.
    pub async fn drain(mut self) -> String {
        let mut rest = Vec::new();
        self.reader.read_to_end(&mut rest).await.unwrap();
        self.session.await.unwrap();
        String::from_utf8_lossy(&rest).into_owned()
    }

    /// Drops the client side and waits for the session to end.
    pub async fn disconnect(self) {
        drop(self.reader);
        drop(self.writer);
        self.session.await.unwrap();
    }
}
