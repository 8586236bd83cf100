//! Authentication system
//!
//! Virtual users, their credentials and permissions, and the authorizer that
//! exposes them to the engine.

pub mod authorizer;
pub mod credentials;
pub mod permissions;
pub mod users;

pub use authorizer::Authorizer;
pub use credentials::{generate, verify};
pub use permissions::Permissions;
pub use users::{ANONYMOUS, UserRecord, UserStore};
