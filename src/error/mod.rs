//! Error handling
//!
//! Defines error types and exit code handling for the daemon.

pub mod handlers;
pub mod types;

pub use handlers::{EXIT_FAILURE, EXIT_OK, EXIT_USAGE, error_to_exit_code, handle_error};
pub use types::*;
