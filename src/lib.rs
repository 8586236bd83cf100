pub mod auth;
pub mod cli;
pub mod config;
pub mod daemon;
pub mod engine;
pub mod error;
pub mod logging;
pub mod server;

pub use auth::Authorizer;
pub use engine::FtpServer;
