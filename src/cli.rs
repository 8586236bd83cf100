//! Command line settings for the daemon.

use std::path::PathBuf;

use clap::Parser;

pub const DEFAULT_CONFIG_PATH: &str = "/etc/rax-vftpd/config";
pub const DEFAULT_LOG_DIR: &str = "/var/log/rax-vftpd";

/// FTP daemon for virtual users
#[derive(Parser, Debug, Clone)]
#[command(name = "rax-vftpd")]
#[command(about = "FTP daemon serving virtual users from a flat users file")]
#[command(version)]
pub struct Settings {
    /// Port to listen on, overrides `default_port` from the config file
    #[arg(short, long, value_parser = clap::value_parser!(u16).range(1..))]
    pub port: Option<u16>,

    /// Configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH, value_parser = existing_file)]
    pub config: PathBuf,

    /// Directory for the access and error logs
    #[arg(short, long = "log-dir", default_value = DEFAULT_LOG_DIR, value_parser = existing_dir)]
    pub log_dir: PathBuf,

    /// Detach from the terminal and run in the background
    #[arg(short, long)]
    pub daemon: bool,

    /// Write no logs at all
    #[arg(short, long)]
    pub silent: bool,
}

/// Paths are made absolute here so they survive the daemon's `chdir("/")`.
fn existing_file(raw: &str) -> Result<PathBuf, String> {
    let path = PathBuf::from(raw);
    if !path.is_file() {
        return Err(format!("config file '{}' does not exist", raw));
    }
    path.canonicalize().map_err(|e| format!("{}: {}", raw, e))
}

fn existing_dir(raw: &str) -> Result<PathBuf, String> {
    let path = PathBuf::from(raw);
    if !path.is_dir() {
        return Err(format!("log directory '{}' does not exist", raw));
    }
    path.canonicalize().map_err(|e| format!("{}: {}", raw, e))
}
