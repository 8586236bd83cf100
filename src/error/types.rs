//! Error types
//!
//! Defines the startup error taxonomy of the daemon. Authentication failures are
//! not errors: they are plain `false` outcomes handed to the engine.

use std::fmt;
use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Configuration file errors
#[derive(Debug)]
pub enum ConfigParseError {
    Io(PathBuf, io::Error),
    MalformedLine { line: usize, content: String },
    InvalidValue { key: String, value: String, reason: String },
    Config(config::ConfigError),
}

impl fmt::Display for ConfigParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigParseError::Io(path, e) => {
                write!(f, "Cannot read config file {}: {}", path.display(), e)
            }
            ConfigParseError::MalformedLine { line, content } => {
                write!(f, "Line {}: expected 'key: value', got '{}'", line, content)
            }
            ConfigParseError::InvalidValue { key, value, reason } => {
                write!(f, "Invalid value '{}' for '{}': {}", value, key, reason)
            }
            ConfigParseError::Config(e) => write!(f, "Invalid configuration: {}", e),
        }
    }
}

impl std::error::Error for ConfigParseError {}

impl From<config::ConfigError> for ConfigParseError {
    fn from(error: config::ConfigError) -> Self {
        ConfigParseError::Config(error)
    }
}

/// Users file errors
#[derive(Debug)]
pub enum UserParseError {
    Io(PathBuf, io::Error),
    FieldCount { line: usize, found: usize },
    EmptyUsername { line: usize },
    DuplicateUser { line: usize, username: String },
    UnknownUser(String),
    ReservedCharacter { username: String, field: &'static str },
}

impl fmt::Display for UserParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserParseError::Io(path, e) => {
                write!(f, "Cannot read users file {}: {}", path.display(), e)
            }
            UserParseError::FieldCount { line, found } => write!(
                f,
                "Line {}: expected 4 ':'-separated fields, found {}",
                line, found
            ),
            UserParseError::EmptyUsername { line } => write!(f, "Line {}: empty username", line),
            UserParseError::DuplicateUser { line, username } => {
                write!(f, "Line {}: user '{}' already exists", line, username)
            }
            UserParseError::UnknownUser(u) => write!(f, "No such user: {}", u),
            UserParseError::ReservedCharacter { username, field } => write!(
                f,
                "User '{}': {} must not contain ':' or line breaks",
                username, field
            ),
        }
    }
}

impl std::error::Error for UserParseError {}

/// Errors assembling the authorizer from configuration and users
#[derive(Debug)]
pub enum AuthorizerError {
    MissingUserFile,
    UserFileNotFound(PathBuf),
    Users(UserParseError),
    AnonymousConflict,
}

impl fmt::Display for AuthorizerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthorizerError::MissingUserFile => write!(f, "No 'user_file' set in configuration"),
            AuthorizerError::UserFileNotFound(p) => {
                write!(f, "Users file does not exist: {}", p.display())
            }
            AuthorizerError::Users(e) => write!(f, "Users file error: {}", e),
            AuthorizerError::AnonymousConflict => write!(
                f,
                "Users file defines 'anonymous' while anonymous access is enabled"
            ),
        }
    }
}

impl std::error::Error for AuthorizerError {}

impl From<UserParseError> for AuthorizerError {
    fn from(error: UserParseError) -> Self {
        AuthorizerError::Users(error)
    }
}

/// Log sink could not be opened. Never fatal.
#[derive(Debug)]
pub struct LogOpenError {
    pub path: PathBuf,
    pub source: io::Error,
}

impl fmt::Display for LogOpenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Cannot open log file {}: {}", self.path.display(), self.source)
    }
}

impl std::error::Error for LogOpenError {}

/// Listener bind failures, categorized by cause
#[derive(Debug)]
pub enum BindError {
    Privileged(SocketAddr, io::Error),
    InUse(SocketAddr, io::Error),
    Other(SocketAddr, io::Error),
}

impl BindError {
    /// Classifies an OS bind failure.
    pub fn from_io(addr: SocketAddr, error: io::Error) -> Self {
        match error.kind() {
            io::ErrorKind::PermissionDenied => BindError::Privileged(addr, error),
            io::ErrorKind::AddrInUse => BindError::InUse(addr, error),
            _ => BindError::Other(addr, error),
        }
    }
}

impl fmt::Display for BindError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BindError::Privileged(addr, _) => write!(
                f,
                "Permission denied binding port {}: ports below 1024 require root privileges",
                addr.port()
            ),
            BindError::InUse(addr, _) => write!(
                f,
                "Port {} is already in use: is another FTP server running?",
                addr.port()
            ),
            BindError::Other(addr, e) => write!(f, "Failed to bind to {}: {}", addr, e),
        }
    }
}

impl std::error::Error for BindError {}

/// Daemonization failure
#[derive(Debug)]
pub struct ForkError(pub io::Error);

impl fmt::Display for ForkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Failed to detach from terminal: {}", self.0)
    }
}

impl std::error::Error for ForkError {}

/// Any fatal error raised while bringing the server up
#[derive(Debug)]
pub enum StartupError {
    Config(ConfigParseError),
    Authorizer(AuthorizerError),
    Bind(BindError),
    Fork(ForkError),
    Runtime(io::Error),
}

impl fmt::Display for StartupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StartupError::Config(e) => write!(f, "Configuration error: {}", e),
            StartupError::Authorizer(e) => write!(f, "{}", e),
            StartupError::Bind(e) => write!(f, "{}", e),
            StartupError::Fork(e) => write!(f, "{}", e),
            StartupError::Runtime(e) => write!(f, "Server runtime error: {}", e),
        }
    }
}

impl std::error::Error for StartupError {}

impl From<ConfigParseError> for StartupError {
    fn from(error: ConfigParseError) -> Self {
        StartupError::Config(error)
    }
}

impl From<AuthorizerError> for StartupError {
    fn from(error: AuthorizerError) -> Self {
        StartupError::Authorizer(error)
    }
}

impl From<BindError> for StartupError {
    fn from(error: BindError) -> Self {
        StartupError::Bind(error)
    }
}

impl From<ForkError> for StartupError {
    fn from(error: ForkError) -> Self {
        StartupError::Fork(error)
    }
}

impl From<io::Error> for StartupError {
    fn from(error: io::Error) -> Self {
        StartupError::Runtime(error)
    }
}
