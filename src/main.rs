//! rax-vftpd - Entry Point
//!
//! FTP daemon for virtual users described by a flat users file.

use clap::Parser;

use rax_vftpd::cli::Settings;
use rax_vftpd::error::{EXIT_OK, EXIT_USAGE};
use rax_vftpd::server;

fn main() {
    let settings = match Settings::try_parse() {
        Ok(settings) => settings,
        Err(e) => {
            let _ = e.print();
            // --help and --version print to stdout and succeed
            std::process::exit(if e.use_stderr() { EXIT_USAGE } else { EXIT_OK });
        }
    };

    std::process::exit(server::start(settings));
}
