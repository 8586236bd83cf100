//! Logging setup
//!
//! Process diagnostics go through `log` and `env_logger`. The engine's access
//! and error events go to append-only files under the log directory, one
//! timestamped line per event.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};

use chrono::Local;
use log::warn;

use crate::engine::{LogSinks, Sink};
use crate::error::LogOpenError;

pub const ACCESS_LOG: &str = "access";
pub const ERROR_LOG: &str = "error";

/// Setup logging for the daemon. `RUST_LOG` overrides the default filter.
pub fn setup_logging(silent: bool) {
    let default_filter = if silent { "off" } else { "info" };
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .try_init();
}

/// Sinks for the engine: no-op when logging is disabled, files otherwise.
///
/// A log file that cannot be opened turns file logging off with a single warning
/// on the terminal; startup carries on.
pub fn build_sinks(log_dir: &Path, disabled: bool) -> LogSinks {
    if disabled {
        return LogSinks::silent();
    }
    match open_file_sinks(log_dir) {
        Ok(sinks) => sinks,
        Err(e) => {
            eprintln!("rax-vftpd: {}; logging disabled", e);
            warn!("{}; logging disabled", e);
            LogSinks::silent()
        }
    }
}

/// Opens `access` and `error` under `log_dir` in append mode.
pub fn open_file_sinks(log_dir: &Path) -> Result<LogSinks, LogOpenError> {
    let access = file_sink(open_append(&log_dir.join(ACCESS_LOG))?);
    let error = file_sink(open_append(&log_dir.join(ERROR_LOG))?);
    let debug: Sink = Arc::new(|msg: &str| log::debug!("{}", msg));
    Ok(LogSinks::new(access, error, debug))
}

fn open_append(path: &Path) -> Result<File, LogOpenError> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| LogOpenError {
            path: path.to_path_buf(),
            source,
        })
}

fn file_sink(file: File) -> Sink {
    let file = Mutex::new(file);
    Arc::new(move |msg: &str| {
        let line = format!("[{}] {}\n", Local::now().format("%Y-%m-%d %H:%M:%S"), msg);
        if let Ok(mut file) = file.lock() {
            let _ = file.write_all(line.as_bytes());
        }
    })
}
