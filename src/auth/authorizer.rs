//! Virtual user authorizer
//!
//! Combines the users file, the credential verifier and the configuration into
//! the [`Authorize`] capability handed to the engine.

use std::path::Path;

use log::{info, warn};

use super::credentials;
use super::permissions::Permissions;
use super::users::{ANONYMOUS, UserRecord, UserStore};
use crate::config::ServerConfig;
use crate::engine::Authorize;
use crate::error::AuthorizerError;

/// Compared against when the username is unknown, so that path does the same work.
const UNKNOWN_USER_SECRET: &str =
    "unknown!0000000000000000000000000000000000000000000000000000000000000000";

#[derive(Debug, Clone)]
pub struct Authorizer {
    users: UserStore,
    anonymous: Option<UserRecord>,
    login_msg: String,
    quit_msg: String,
}

impl Authorizer {
    /// Builds the authorizer from an already loaded users set.
    pub fn new(config: &ServerConfig, users: UserStore) -> Result<Self, AuthorizerError> {
        let anonymous = if config.anonymous {
            if users.contains(ANONYMOUS) {
                return Err(AuthorizerError::AnonymousConflict);
            }
            if config.anonymous_perm.can_write() {
                warn!("Write permissions assigned to anonymous user");
            }
            Some(UserRecord::new(
                ANONYMOUS,
                "",
                config.anonymous_perm,
                config.anonymous_root.clone(),
            ))
        } else {
            None
        };

        let authorizer = Self {
            users,
            anonymous,
            login_msg: config.welcome_msg.clone(),
            quit_msg: config.goodbye_msg.clone(),
        };

        for record in authorizer.records() {
            if !record.root.is_dir() {
                warn!(
                    "Root of user '{}' is not a directory: {}",
                    record.username,
                    record.root.display()
                );
            }
        }

        Ok(authorizer)
    }

    /// Loads the users file named by `user_file` and builds the authorizer.
    pub fn from_config(config: &ServerConfig) -> Result<Self, AuthorizerError> {
        let path = config
            .user_file
            .as_deref()
            .ok_or(AuthorizerError::MissingUserFile)?;
        if !path.exists() {
            return Err(AuthorizerError::UserFileNotFound(path.to_path_buf()));
        }

        let users = UserStore::load_file(path)?;
        info!("Loaded {} virtual users from {}", users.len(), path.display());
        Self::new(config, users)
    }

    /// Every registered identity, anonymous included.
    pub fn records(&self) -> impl Iterator<Item = &UserRecord> {
        self.anonymous.iter().chain(self.users.iter())
    }

    fn lookup(&self, username: &str) -> Option<&UserRecord> {
        match &self.anonymous {
            Some(anon) if username == ANONYMOUS => Some(anon),
            _ => self.users.get(username),
        }
    }
}

impl Authorize for Authorizer {
    fn authenticate(&self, username: &str, password: &str) -> bool {
        if username == ANONYMOUS && self.anonymous.is_some() {
            return true;
        }
        match self.users.get(username) {
            Some(record) => credentials::verify(&record.secret, password, username),
            None => {
                let _ = credentials::verify(UNKNOWN_USER_SECRET, password, username);
                false
            }
        }
    }

    fn permissions_for(&self, username: &str) -> Permissions {
        self.lookup(username)
            .map(|r| r.permissions)
            .unwrap_or_default()
    }

    fn root_for(&self, username: &str) -> Option<&Path> {
        self.lookup(username).map(|r| r.root.as_path())
    }

    fn login_message(&self, _username: &str) -> &str {
        &self.login_msg
    }

    fn quit_message(&self, _username: &str) -> &str {
        &self.quit_msg
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigStore;

    fn config(text: &str) -> ServerConfig {
        ServerConfig::from_store(&ConfigStore::load(text.as_bytes()).unwrap()).unwrap()
    }

    fn users(text: &str) -> UserStore {
        UserStore::load(text.as_bytes()).unwrap()
    }

    #[test]
    fn test_plaintext_user() {
        let auth = Authorizer::new(&config(""), users("pub:banana:r:/srv/pub\n")).unwrap();
        assert!(auth.authenticate("pub", "banana"));
        assert!(!auth.authenticate("pub", "wrong"));
        assert!(!auth.authenticate("nouser", "x"));
        assert_eq!(auth.permissions_for("pub"), Permissions::READ);
        assert_eq!(auth.root_for("pub"), Some(Path::new("/srv/pub")));
        assert_eq!(auth.permissions_for("nouser"), Permissions::NONE);
        assert_eq!(auth.root_for("nouser"), None);
    }

    #[test]
    fn test_hashed_user() {
        let line = format!("alice:{}:rw:/srv/alice\n", credentials::generate("wonderland"));
        let auth = Authorizer::new(&config(""), users(&line)).unwrap();
        assert!(auth.authenticate("alice", "wonderland"));
        assert!(!auth.authenticate("alice", "wonderlandx"));
        assert_eq!(auth.permissions_for("alice"), Permissions::READ_WRITE);
    }

    #[test]
    fn test_anonymous_identity() {
        let cfg = config("anonymous: yes\nanonymous_root: /tmp\nanonymous_perm: r\n");
        let auth = Authorizer::new(&cfg, UserStore::new()).unwrap();
        assert_eq!(auth.records().next().map(|r| r.username.as_str()), Some(ANONYMOUS));
        assert!(auth.authenticate(ANONYMOUS, "anything@example.com"));
        assert!(auth.authenticate(ANONYMOUS, ""));
        assert_eq!(auth.permissions_for(ANONYMOUS), Permissions::READ);
        assert_eq!(auth.root_for(ANONYMOUS), Some(Path::new("/tmp")));
    }

    #[test]
    fn test_anonymous_disabled() {
        let auth = Authorizer::new(&config("anonymous: no\n"), UserStore::new()).unwrap();
        assert!(!auth.authenticate(ANONYMOUS, ""));
        assert_eq!(auth.root_for(ANONYMOUS), None);
        assert_eq!(auth.records().count(), 0);
    }

    #[test]
    fn test_anonymous_conflicts_with_users_file_entry() {
        let err = Authorizer::new(&config("anonymous: yes\n"), users("anonymous::r:/tmp\n")).unwrap_err();
        assert!(matches!(err, AuthorizerError::AnonymousConflict));
    }

    #[test]
    fn test_shared_messages() {
        let cfg = config("welcome_msg: Hi there\ngoodbye_msg: Bye now\nanonymous: yes\n");
        let auth = Authorizer::new(&cfg, users("pub:banana:r:/srv/pub\n")).unwrap();
        for name in ["pub", ANONYMOUS] {
            assert_eq!(auth.login_message(name), "Hi there");
            assert_eq!(auth.quit_message(name), "Bye now");
        }
        assert_eq!(auth.records().count(), 2);
    }

    #[test]
    fn test_missing_user_file() {
        let err = Authorizer::from_config(&config("")).unwrap_err();
        assert!(matches!(err, AuthorizerError::MissingUserFile));

        let err = Authorizer::from_config(&config("user_file: /nonexistent/rax-vftpd/users\n")).unwrap_err();
        assert!(matches!(err, AuthorizerError::UserFileNotFound(_)));
    }
}
