//! Server bootstrap
//!
//! Turns command line settings into a running engine: configuration and users
//! are loaded, logging is wired, the port is bound and control passes to the
//! engine's accept loop.

pub mod bootstrap;

pub use bootstrap::{Prepared, prepare, run, start};
