//! FTP protocol engine
//!
//! The engine owns the accept loop and the control connection. It knows nothing about
//! users files or configuration: everything it needs is handed to it as plain values
//! ([`ConnectionHandler`], [`ListenerConfig`], [`LogSinks`]) and it calls back into an
//! [`Authorize`] implementation for every login. Only the login phase is implemented;
//! file commands answer `502`.

pub mod commands;
pub mod core;
pub mod limits;
pub mod responses;
pub mod session;
pub mod sinks;

use std::net::{SocketAddr, TcpListener};
use std::path::Path;
use std::sync::Arc;

use crate::auth::Permissions;
use crate::error::BindError;

pub use self::core::FtpServer;
pub use limits::{ConnectionLimiter, ConnectionSlot, LimitExceeded};
pub use session::{Reply, SessionState};
pub use sinks::{LogSinks, Sink};

/// Capability the engine uses to log users in and look up what they may do
pub trait Authorize: Send + Sync + 'static {
    /// Whether `password` logs `username` in. Never reveals whether the user exists.
    fn authenticate(&self, username: &str, password: &str) -> bool;

    /// Permissions of a known user; empty for anyone else.
    fn permissions_for(&self, username: &str) -> Permissions;

    /// Filesystem root of a known user.
    fn root_for(&self, username: &str) -> Option<&Path>;

    /// Reply text after a successful login.
    fn login_message(&self, username: &str) -> &str;

    /// Reply text on QUIT.
    fn quit_message(&self, username: &str) -> &str;
}

/// Per-connection settings shared by every session
pub struct ConnectionHandler<A> {
    pub authorizer: Arc<A>,
    pub banner: String,
    /// Failed PASS attempts before the connection is dropped; zero disables the limit
    pub max_login_attempts: u32,
}

impl<A> Clone for ConnectionHandler<A> {
    fn clone(&self) -> Self {
        Self {
            authorizer: Arc::clone(&self.authorizer),
            banner: self.banner.clone(),
            max_login_attempts: self.max_login_attempts,
        }
    }
}

/// Where to listen and how many clients to admit; zero disables a limit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenerConfig {
    pub bind_address: SocketAddr,
    pub max_connections: usize,
    pub max_connections_per_source: usize,
}

impl ListenerConfig {
    /// Binds the control socket. Done synchronously so failures surface before
    /// the process detaches or starts a runtime.
    pub fn bind(&self) -> Result<TcpListener, BindError> {
        TcpListener::bind(self.bind_address).map_err(|e| BindError::from_io(self.bind_address, e))
    }

    pub fn limiter(&self) -> ConnectionLimiter {
        ConnectionLimiter::new(self.max_connections, self.max_connections_per_source)
    }
}
