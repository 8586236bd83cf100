//! Error handlers
//!
//! Maps startup errors to process exit codes and reports them.

use crate::error::types::StartupError;
use log::error;

/// Exit code for a clean shutdown or `--help`
pub const EXIT_OK: i32 = 0;
/// Exit code for any fatal startup failure (bind, fork, config, users)
pub const EXIT_FAILURE: i32 = 1;
/// Exit code for invalid command line input
pub const EXIT_USAGE: i32 = 2;

/// Report a fatal startup error on the log and the terminal
pub fn handle_error(err: &StartupError) {
    error!("{}", err);
    eprintln!("rax-vftpd: {}", err);
}

/// Convert error to process exit code
pub fn error_to_exit_code(err: &StartupError) -> i32 {
    match err {
        StartupError::Config(_) => EXIT_FAILURE,
        StartupError::Authorizer(_) => EXIT_FAILURE,
        StartupError::Bind(_) => EXIT_FAILURE,
        StartupError::Fork(_) => EXIT_FAILURE,
        StartupError::Runtime(_) => EXIT_FAILURE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BindError;
    use std::io;
    use std::net::SocketAddr;

    fn addr(port: u16) -> SocketAddr {
        SocketAddr::from(([0, 0, 0, 0], port))
    }

    #[test]
    fn test_bind_errors_are_categorized() {
        let err = BindError::from_io(addr(21), io::Error::from(io::ErrorKind::PermissionDenied));
        assert!(matches!(err, BindError::Privileged(..)));
        assert!(err.to_string().contains("root privileges"));

        let err = BindError::from_io(addr(2121), io::Error::from(io::ErrorKind::AddrInUse));
        assert!(matches!(err, BindError::InUse(..)));
        assert!(err.to_string().contains("already in use"));

        let err = BindError::from_io(addr(2121), io::Error::from(io::ErrorKind::AddrNotAvailable));
        assert!(matches!(err, BindError::Other(..)));
    }

    #[test]
    fn test_bind_failures_exit_with_one() {
        for kind in [
            io::ErrorKind::PermissionDenied,
            io::ErrorKind::AddrInUse,
            io::ErrorKind::Other,
        ] {
            let err = StartupError::from(BindError::from_io(addr(21), io::Error::from(kind)));
            assert_eq!(error_to_exit_code(&err), EXIT_FAILURE);
        }
    }
}
