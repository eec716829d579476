//! Command handlers.

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, BufReader};

use super::{Maildrop, Session};
use crate::backend::{BackendError, MessageReader};
use crate::command::Command;
use crate::error::{Error, Result};
use crate::types::{MessageNumber, SessionState};

/// Read size used when copying message content.
const COPY_BUFFER_SIZE: usize = 8192;

impl<S> Session<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Runs one validated command and writes its response.
    pub(super) async fn execute(&mut self, command: Command) -> Result<()> {
        tracing::debug!(verb = %command.verb(), state = %self.state, "command");

        match command {
            Command::User { name } => self.handle_user(name).await,
            Command::Pass { password } => self.handle_pass(&password).await,
            Command::Apop { name, digest } => self.handle_apop(&name, &digest).await,
            Command::Stat => self.handle_stat().await,
            Command::List { number } => self.handle_list(number).await,
            Command::Uidl { number } => self.handle_uidl(number).await,
            Command::Retr { number } => self.handle_retr(number).await,
            Command::Top { number, lines } => self.handle_top(number, lines).await,
            Command::Dele { number } => self.handle_dele(number).await,
            Command::Rset => self.handle_rset().await,
            Command::Noop => self.stream.ok("").await,
            Command::Quit => self.handle_quit().await,
            Command::Capa => self.handle_capa().await,
        }
    }

    async fn handle_user(&mut self, name: String) -> Result<()> {
        let reply = format!("welcome {name}");
        self.username = Some(name);
        self.stream.ok(reply).await
    }

    async fn handle_pass(&mut self, password: &str) -> Result<()> {
        let name = self
            .username
            .take()
            .ok_or_else(|| Error::negative("please provide username first"))?;
        self.backend.authenticate_pass(&name, password).await?;
        self.sign_in(&name).await
    }

    async fn handle_apop(&mut self, name: &str, digest: &str) -> Result<()> {
        if self.banner.is_none() {
            return Err(Error::negative("server does not support APOP"));
        }
        self.backend.authenticate_apop(name, digest).await?;
        self.sign_in(name).await
    }

    /// Shared tail of a successful PASS or APOP.
    ///
    /// A refused lock leaves the session in AUTHORIZATION. Once the lock is
    /// held, any failure while loading the snapshot is fatal; the lock is
    /// then released by [`Session::serve`].
    async fn sign_in(&mut self, name: &str) -> Result<()> {
        self.backend.lock_mailbox().await?;
        self.locked = true;
        self.transition(SessionState::Transaction);

        self.maildrop = self.load_maildrop().await?;
        tracing::debug!(messages = self.maildrop.len(), "maildrop loaded");

        let reply = format!(
            "{name}'s maildrop has {} messages ({} octets)",
            self.maildrop.visible_count(),
            self.maildrop.visible_size()
        );
        self.stream.ok(reply).await
    }

    async fn load_maildrop(&mut self) -> Result<Maildrop> {
        let count = self
            .backend
            .message_count()
            .await
            .map_err(|source| Error::Snapshot { number: 0, source })?;

        let mut sizes = Vec::new();
        for number in (1..=count).filter_map(MessageNumber::new) {
            let size = self
                .backend
                .message_size(number)
                .await
                .map_err(|source| Error::Snapshot {
                    number: number.get(),
                    source,
                })?;
            sizes.push(size);
        }

        Ok(Maildrop::new(sizes))
    }

    async fn handle_stat(&mut self) -> Result<()> {
        let reply = format!(
            "{} {}",
            self.maildrop.visible_count(),
            self.maildrop.visible_size()
        );
        self.stream.ok(reply).await
    }

    async fn handle_list(&mut self, number: Option<u32>) -> Result<()> {
        if let Some(n) = number {
            let (number, size) = self.maildrop.lookup(n)?;
            return self.stream.ok(format!("{number} {size}")).await;
        }

        let entries: Vec<_> = self.maildrop.visible().collect();
        let mut block = self.stream.multiline(format!(
            "{} messages ({} octets)",
            self.maildrop.visible_count(),
            self.maildrop.visible_size()
        ));
        for (number, size) in entries {
            block.write_line(&format!("{number} {size}")).await?;
        }
        block.finish().await
    }

    async fn handle_uidl(&mut self, number: Option<u32>) -> Result<()> {
        if let Some(n) = number {
            let (number, _) = self.maildrop.lookup(n)?;
            let id = self.backend.message_id(number).await?;
            return self.stream.ok(format!("{number} {id}")).await;
        }

        // Ids are fetched up front so a backend failure can still be
        // answered with a single -ERR line.
        let numbers: Vec<_> = self.maildrop.visible().map(|(number, _)| number).collect();
        let mut ids = Vec::with_capacity(numbers.len());
        for number in numbers {
            ids.push((number, self.backend.message_id(number).await?));
        }

        let mut block = self.stream.multiline("unique-id listing follows");
        for (number, id) in ids {
            block.write_line(&format!("{number} {id}")).await?;
        }
        block.finish().await
    }

    async fn handle_retr(&mut self, n: u32) -> Result<()> {
        let (number, size) = self.maildrop.lookup(n)?;
        let mut reader = self.backend.open_message(number).await?;

        let mut block = self.stream.multiline(format!("{size} octets"));
        let mut buf = vec![0u8; COPY_BUFFER_SIZE];
        loop {
            let read = reader.read(&mut buf).await.map_err(content_error)?;
            if read == 0 {
                break;
            }
            block.write(&buf[..read]).await?;
        }
        block.finish().await
    }

    /// Sends the header section, the blank separator line, and at most
    /// `lines` body lines.
    async fn handle_top(&mut self, n: u32, lines: usize) -> Result<()> {
        let (number, _) = self.maildrop.lookup(n)?;
        let reader: MessageReader = self.backend.open_message(number).await?;
        let mut reader = BufReader::with_capacity(COPY_BUFFER_SIZE, reader);

        let mut block = self.stream.multiline("top of message follows");
        let mut line = Vec::new();
        let mut in_headers = true;
        let mut remaining = lines;

        while in_headers || remaining > 0 {
            line.clear();
            if reader
                .read_until(b'\n', &mut line)
                .await
                .map_err(content_error)?
                == 0
            {
                break;
            }
            block.write(&line).await?;

            if in_headers {
                in_headers = !matches!(line.as_slice(), b"\n" | b"\r\n");
            } else {
                remaining -= 1;
            }
        }
        block.finish().await
    }

    async fn handle_dele(&mut self, n: u32) -> Result<()> {
        let number = self.maildrop.mark_deleted(n)?;
        self.stream.ok(format!("message {number} deleted")).await
    }

    async fn handle_rset(&mut self) -> Result<()> {
        self.maildrop.reset();
        let reply = format!(
            "maildrop has {} messages ({} octets)",
            self.maildrop.visible_count(),
            self.maildrop.visible_size()
        );
        self.stream.ok(reply).await
    }

    async fn handle_capa(&mut self) -> Result<()> {
        let capabilities: Vec<String> = self
            .config
            .capabilities()
            .iter()
            .map(ToString::to_string)
            .collect();

        let mut block = self.stream.multiline("capability list follows");
        for capability in &capabilities {
            block.write_line(capability).await?;
        }
        block.finish().await
    }

    /// Ends the session. From TRANSACTION this commits the deletion marks
    /// with exactly one backend call; the goodbye is sent whether or not
    /// that call succeeds.
    async fn handle_quit(&mut self) -> Result<()> {
        if self.state == SessionState::Transaction {
            self.transition(SessionState::Update);
            let numbers = self.maildrop.take_deleted();
            if let Err(err) = self.backend.delete_messages(&numbers).await {
                tracing::warn!(count = numbers.len(), error = %err, "failed to delete marked messages");
                self.backend.on_session_error(&Error::Backend(err));
            }
        }

        self.transition(SessionState::Terminated);
        self.stream.ok("goodbye").await
    }
}

/// Failures reading message content belong to the backend, not the client
/// stream.
fn content_error(err: std::io::Error) -> Error {
    Error::Backend(BackendError::from(err))
}
