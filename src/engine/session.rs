//! Control connection session
//!
//! Greets the client, walks it through USER/PASS and enforces the login attempt
//! ceiling. [`SessionState`] holds the per-connection login state and answers
//! commands without touching the socket; [`run_session`] drives it over TCP.

use std::net::SocketAddr;
use std::path::PathBuf;

use tokio::io::{self, AsyncBufRead, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

use super::commands::{Command, parse_command};
use super::responses::*;
use super::{Authorize, ConnectionHandler, LogSinks};
use crate::auth::{ANONYMOUS, Permissions};
use crate::config::DEFAULT_GOODBYE_MSG;

/// Longest accepted command line, terminator included
pub const MAX_COMMAND_LINE: usize = 2048;

/// Reply to a single command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub code: u16,
    pub message: String,
    /// Close the control connection after sending
    pub close: bool,
}

impl Reply {
    fn new(code: u16, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            close: false,
        }
    }

    fn closing(code: u16, message: impl Into<String>) -> Self {
        Self {
            close: true,
            ..Self::new(code, message)
        }
    }

    pub fn to_wire(&self) -> String {
        format_response(self.code, &self.message)
    }
}

/// A logged in user, as resolved through the authorizer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggedIn {
    pub username: String,
    pub permissions: Permissions,
    pub root: PathBuf,
}

/// Login state of one control connection
#[derive(Debug, Default)]
pub struct SessionState {
    pending_user: Option<String>,
    logged_in: Option<LoggedIn>,
    failed_attempts: u32,
}

impl SessionState {
    pub fn logged_in(&self) -> Option<&LoggedIn> {
        self.logged_in.as_ref()
    }

    pub fn failed_attempts(&self) -> u32 {
        self.failed_attempts
    }

    pub fn handle<A: Authorize>(&mut self, command: Command, handler: &ConnectionHandler<A>) -> Reply {
        match command {
            Command::USER(username) => self.handle_user(username),
            Command::PASS(password) => self.handle_pass(&password, handler),
            Command::QUIT => {
                let message = match &self.logged_in {
                    Some(user) => handler.authorizer.quit_message(&user.username),
                    None => DEFAULT_GOODBYE_MSG,
                };
                Reply::closing(GOODBYE, message)
            }
            Command::NOOP => Reply::new(OK, "NOOP command successful."),
            Command::UNKNOWN(_) if self.logged_in.is_none() => {
                Reply::new(NOT_LOGGED_IN, "Log in with USER and PASS first.")
            }
            Command::UNKNOWN(_) => Reply::new(NOT_IMPLEMENTED, "Command not implemented."),
        }
    }

    fn handle_user(&mut self, mut username: String) -> Reply {
        if self.logged_in.is_some() {
            return Reply::new(BAD_SEQUENCE, "User already authenticated.");
        }
        if username.eq_ignore_ascii_case(ANONYMOUS) {
            username = ANONYMOUS.to_string();
        }
        let reply = if username == ANONYMOUS {
            Reply::new(PASSWORD_REQUIRED, "Guest login ok, send your e-mail address as password.")
        } else {
            Reply::new(PASSWORD_REQUIRED, "Username ok, send password.")
        };
        self.pending_user = Some(username);
        reply
    }

    fn handle_pass<A: Authorize>(&mut self, password: &str, handler: &ConnectionHandler<A>) -> Reply {
        if self.logged_in.is_some() {
            return Reply::new(BAD_SEQUENCE, "User already authenticated.");
        }
        let Some(username) = self.pending_user.take() else {
            return Reply::new(BAD_SEQUENCE, "Login with USER first.");
        };

        let authorizer = &handler.authorizer;
        if authorizer.authenticate(&username, password) {
            let user = LoggedIn {
                permissions: authorizer.permissions_for(&username),
                root: authorizer
                    .root_for(&username)
                    .map(|p| p.to_path_buf())
                    .unwrap_or_default(),
                username,
            };
            let reply = Reply::new(LOGIN_SUCCESS, authorizer.login_message(&user.username));
            self.logged_in = Some(user);
            return reply;
        }

        self.failed_attempts += 1;
        if handler.max_login_attempts > 0 && self.failed_attempts >= handler.max_login_attempts {
            Reply::closing(SERVICE_UNAVAILABLE, "Too many login attempts. Disconnecting.")
        } else {
            Reply::new(NOT_LOGGED_IN, "Authentication failed.")
        }
    }
}

/// What the client sent next on the control connection
#[derive(Debug, PartialEq, Eq)]
pub enum Incoming {
    Line(String),
    /// The line passed [`MAX_COMMAND_LINE`]; the rest of it is skipped.
    TooLong,
    Closed,
}

/// Reads command lines without ever buffering more than [`MAX_COMMAND_LINE`] bytes.
pub struct CommandReader<R> {
    inner: R,
    buf: Vec<u8>,
    discarding: bool,
}

impl<R: AsyncBufRead + Unpin> CommandReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            buf: Vec::new(),
            discarding: false,
        }
    }

    pub async fn next(&mut self) -> io::Result<Incoming> {
        self.buf.clear();
        loop {
            let available = self.inner.fill_buf().await?;
            if available.is_empty() {
                return Ok(Incoming::Closed);
            }
            let newline = available.iter().position(|&b| b == b'\n');
            let used = newline.map_or(available.len(), |i| i + 1);

            if self.discarding {
                self.inner.consume(used);
                self.discarding = newline.is_none();
                continue;
            }

            if self.buf.len() + used > MAX_COMMAND_LINE {
                self.inner.consume(used);
                self.buf.clear();
                self.discarding = newline.is_none();
                return Ok(Incoming::TooLong);
            }

            self.buf.extend_from_slice(&available[..used]);
            self.inner.consume(used);
            if newline.is_some() {
                return Ok(Incoming::Line(String::from_utf8_lossy(&self.buf).into_owned()));
            }
        }
    }
}

/// Serves one control connection until the client quits, disconnects or is
/// dropped for too many failed logins.
pub async fn run_session<A: Authorize>(
    stream: TcpStream,
    peer: SocketAddr,
    handler: ConnectionHandler<A>,
    sinks: LogSinks,
) -> std::io::Result<()> {
    let (read_half, mut writer) = stream.into_split();
    let mut reader = CommandReader::new(BufReader::new(read_half));
    let mut state = SessionState::default();

    let greeting = format_response(READY, &handler.banner);
    writer.write_all(greeting.as_bytes()).await?;
    writer.flush().await?;

    loop {
        let line = match reader.next().await? {
            Incoming::Line(line) => line,
            Incoming::TooLong => {
                sinks.debug(&format!("{} sent a command line over {} bytes", peer, MAX_COMMAND_LINE));
                let reply = Reply::new(SYNTAX_ERROR, "Command too long.");
                writer.write_all(reply.to_wire().as_bytes()).await?;
                writer.flush().await?;
                continue;
            }
            Incoming::Closed => {
                sinks.debug(&format!("{} closed the connection", peer));
                return Ok(());
            }
        };

        let command = parse_command(&line);
        sinks.line(&format!("{} ==> {}", peer, command.redacted()));

        let was_logged_in = state.logged_in().is_some();
        let reply = state.handle(command, &handler);
        sinks.line(&format!("{} <== {} {}", peer, reply.code, reply.message.replace('\n', " ")));

        if let (false, Some(user)) = (was_logged_in, state.logged_in()) {
            sinks.line(&format!("{} USER '{}' logged in.", peer, user.username));
            sinks.debug(&format!(
                "{} root={} perms={}",
                user.username,
                user.root.display(),
                user.permissions
            ));
        }

        writer.write_all(reply.to_wire().as_bytes()).await?;
        writer.flush().await?;

        if reply.close {
            sinks.debug(&format!("{} disconnected after {}", peer, reply.code));
            return Ok(());
        }
    }
}
