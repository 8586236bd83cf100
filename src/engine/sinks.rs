//! Log sinks
//!
//! The engine reports through three injectable callables instead of global
//! hooks: `line` for commands, replies and logins, `error` for failures and
//! `debug` for internal state changes.

use std::fmt;
use std::sync::Arc;

/// A single log destination
pub type Sink = Arc<dyn Fn(&str) + Send + Sync>;

#[derive(Clone)]
pub struct LogSinks {
    line: Sink,
    error: Sink,
    debug: Sink,
}

impl LogSinks {
    pub fn new(line: Sink, error: Sink, debug: Sink) -> Self {
        Self { line, error, debug }
    }

    /// Sinks that drop everything
    pub fn silent() -> Self {
        let noop: Sink = Arc::new(|_: &str| {});
        Self::new(noop.clone(), noop.clone(), noop)
    }

    pub fn line(&self, msg: &str) {
        (self.line)(msg)
    }

    pub fn error(&self, msg: &str) {
        (self.error)(msg)
    }

    pub fn debug(&self, msg: &str) {
        (self.debug)(msg)
    }
}

/// Forwards to the `log` facade
impl Default for LogSinks {
    fn default() -> Self {
        Self::new(
            Arc::new(|msg: &str| log::info!("{}", msg)),
            Arc::new(|msg: &str| log::error!("{}", msg)),
            Arc::new(|msg: &str| log::debug!("{}", msg)),
        )
    }
}

impl fmt::Debug for LogSinks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogSinks").finish_non_exhaustive()
    }
}
