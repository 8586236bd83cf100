//! Virtual users file
//!
//! One user per line, `username:secret:permissions:root`. Blank lines and lines
//! starting with `#` are skipped. Colons cannot be escaped, so a secret or root
//! containing `:` is rejected as a malformed line.

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use log::debug;
use tempfile::NamedTempFile;

use super::credentials;
use super::permissions::Permissions;
use crate::error::UserParseError;

/// Name of the synthetic anonymous identity
pub const ANONYMOUS: &str = "anonymous";

/// A single virtual user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub username: String,
    pub secret: String,
    pub permissions: Permissions,
    pub root: PathBuf,
}

impl UserRecord {
    pub fn new(
        username: impl Into<String>,
        secret: impl Into<String>,
        permissions: Permissions,
        root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            username: username.into(),
            secret: secret.into(),
            permissions,
            root: root.into(),
        }
    }

    /// Parses one users-file line. `line_no` is only used in errors.
    pub fn parse_line(line: &str, line_no: usize) -> Result<Self, UserParseError> {
        let fields: Vec<&str> = line.split(':').collect();
        if fields.len() != 4 {
            return Err(UserParseError::FieldCount {
                line: line_no,
                found: fields.len(),
            });
        }

        let username = fields[0].trim();
        if username.is_empty() {
            return Err(UserParseError::EmptyUsername { line: line_no });
        }

        Ok(Self::new(
            username,
            fields[1],
            Permissions::from_flags(fields[2]),
            fields[3].trim_end(),
        ))
    }

    /// Fails if any field would break the users-file line format.
    pub fn check_fields(&self) -> Result<(), UserParseError> {
        let root = self.root.to_string_lossy();
        let fields = [
            ("username", self.username.as_str()),
            ("password", self.secret.as_str()),
            ("root", root.as_ref()),
        ];
        for (field, value) in fields {
            if value.contains([':', '\n', '\r']) {
                return Err(UserParseError::ReservedCharacter {
                    username: self.username.clone(),
                    field,
                });
            }
        }
        Ok(())
    }

    /// Users-file form of this record.
    pub fn to_line(&self) -> String {
        format!(
            "{}:{}:{}:{}",
            self.username,
            self.secret,
            self.permissions,
            self.root.display()
        )
    }
}

/// The set of virtual users, keyed by name
#[derive(Debug, Clone, Default)]
pub struct UserStore {
    users: BTreeMap<String, UserRecord>,
}

impl UserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses users from any line source.
    pub fn load<R: BufRead>(source: R) -> Result<Self, UserParseError> {
        let mut store = Self::new();

        for (idx, line) in source.lines().enumerate() {
            let line_no = idx + 1;
            let line = line.map_err(|e| UserParseError::Io(PathBuf::new(), e))?;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            let record = UserRecord::parse_line(&line, line_no)?;
            if store.users.contains_key(&record.username) {
                return Err(UserParseError::DuplicateUser {
                    line: line_no,
                    username: record.username,
                });
            }
            store.users.insert(record.username.clone(), record);
        }

        debug!("Loaded {} virtual users", store.users.len());
        Ok(store)
    }

    /// Parses the users file at `path`.
    pub fn load_file(path: &Path) -> Result<Self, UserParseError> {
        let file = fs::File::open(path).map_err(|e| UserParseError::Io(path.to_path_buf(), e))?;
        Self::load(BufReader::new(file)).map_err(|e| match e {
            UserParseError::Io(_, err) => UserParseError::Io(path.to_path_buf(), err),
            other => other,
        })
    }

    pub fn get(&self, username: &str) -> Option<&UserRecord> {
        self.users.get(username)
    }

    pub fn get_mut(&mut self, username: &str) -> Result<&mut UserRecord, UserParseError> {
        self.users
            .get_mut(username)
            .ok_or_else(|| UserParseError::UnknownUser(username.to_string()))
    }

    pub fn contains(&self, username: &str) -> bool {
        self.users.contains_key(username)
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &UserRecord> {
        self.users.values()
    }

    /// Adds a new user; the name must not already exist.
    pub fn insert(&mut self, record: UserRecord) -> Result<(), UserParseError> {
        if record.username.is_empty() {
            return Err(UserParseError::EmptyUsername { line: 0 });
        }
        record.check_fields()?;
        if self.users.contains_key(&record.username) {
            return Err(UserParseError::DuplicateUser {
                line: 0,
                username: record.username,
            });
        }
        self.users.insert(record.username.clone(), record);
        Ok(())
    }

    pub fn remove(&mut self, username: &str) -> Result<UserRecord, UserParseError> {
        self.users
            .remove(username)
            .ok_or_else(|| UserParseError::UnknownUser(username.to_string()))
    }

    /// Replaces the user's secret with a freshly salted hash of `password`.
    pub fn set_password(&mut self, username: &str, password: &str) -> Result<(), UserParseError> {
        let record = self.get_mut(username)?;
        record.secret = credentials::generate(password);
        Ok(())
    }

    /// Writes the store in users-file form, `anonymous` first.
    pub fn dump<W: Write>(&self, mut out: W) -> io::Result<()> {
        if let Some(anon) = self.users.get(ANONYMOUS) {
            writeln!(out, "{}", anon.to_line())?;
            writeln!(out)?;
        }
        for record in self.users.values().filter(|r| r.username != ANONYMOUS) {
            writeln!(out, "{}", record.to_line())?;
        }
        out.flush()
    }

    /// Rewrites the users file at `path` through a temporary file in the same
    /// directory, so a failed write leaves the old file in place.
    pub fn save_file(&self, path: &Path) -> io::Result<()> {
        let dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        let mut file = NamedTempFile::new_in(dir)?;
        self.dump(BufWriter::new(file.as_file_mut()))?;
        file.as_file().sync_all()?;
        file.persist(path).map_err(|e| e.error)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::credentials::verify;

    fn load(text: &str) -> Result<UserStore, UserParseError> {
        UserStore::load(text.as_bytes())
    }

    #[test]
    fn test_load_well_formed() {
        let store = load("pub:banana:r:/srv/pub\n# admins\n\nadmin:pw:rw:/srv\nnobody:x::/tmp\n").unwrap();
        assert_eq!(store.len(), 3);

        let public = store.get("pub").unwrap();
        assert_eq!(public.secret, "banana");
        assert_eq!(public.permissions, Permissions::READ);
        assert_eq!(public.root, PathBuf::from("/srv/pub"));

        assert_eq!(store.get("admin").unwrap().permissions, Permissions::READ_WRITE);
        assert!(store.get("nobody").unwrap().permissions.is_empty());
    }

    #[test]
    fn test_permissions_follow_flag_characters() {
        let store = load("a:x:r:/a\nb:x:w:/b\nc:x:wr:/c\nd:x:-:/d\n").unwrap();
        for record in store.iter() {
            let field = match record.username.as_str() {
                "a" => "r",
                "b" => "w",
                "c" => "wr",
                _ => "-",
            };
            assert_eq!(record.permissions.can_read(), field.contains('r'));
            assert_eq!(record.permissions.can_write(), field.contains('w'));
        }
    }

    #[test]
    fn test_duplicate_username_fails() {
        let err = load("pub:a:r:/srv\npub:b:rw:/srv\n").unwrap_err();
        assert!(matches!(err, UserParseError::DuplicateUser { line: 2, ref username } if username == "pub"));
    }

    #[test]
    fn test_short_line_fails() {
        let err = load("pub:banana:r\n").unwrap_err();
        assert!(matches!(err, UserParseError::FieldCount { line: 1, found: 3 }));
    }

    #[test]
    fn test_extra_colon_fails() {
        let err = load("pub:banana:r:/srv:pub\n").unwrap_err();
        assert!(matches!(err, UserParseError::FieldCount { found: 5, .. }));
    }

    #[test]
    fn test_empty_username_fails() {
        let err = load(":banana:r:/srv\n").unwrap_err();
        assert!(matches!(err, UserParseError::EmptyUsername { line: 1 }));
    }

    #[test]
    fn test_dump_puts_anonymous_first() {
        let store = load("zed:z:r:/z\nanonymous::r:/tmp\nalpha:a:rw:/a\n").unwrap();
        let mut out = Vec::new();
        store.dump(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, "anonymous::r:/tmp\n\nalpha:a:rw:/a\nzed:z:r:/z\n");

        let reloaded = load(&text).unwrap();
        assert_eq!(reloaded.len(), 3);
    }

    #[test]
    fn test_modify_users() {
        let mut store = load("pub:banana:r:/srv/pub\n").unwrap();

        assert!(store.insert(UserRecord::new("pub", "x", Permissions::READ, "/")).is_err());
        store
            .insert(UserRecord::new("up", "load", Permissions::WRITE, "/srv/in"))
            .unwrap();
        assert_eq!(store.len(), 2);

        store.set_password("pub", "cherry").unwrap();
        let secret = &store.get("pub").unwrap().secret;
        assert!(verify(secret, "cherry", "pub"));
        assert!(!verify(secret, "banana", "pub"));

        store.remove("up").unwrap();
        assert!(matches!(store.remove("up"), Err(UserParseError::UnknownUser(_))));
        assert!(store.set_password("ghost", "x").is_err());
    }

    #[test]
    fn test_insert_rejects_separator_characters() {
        let mut store = UserStore::new();
        for record in [
            UserRecord::new("bob", "pa:ss", Permissions::READ, "/srv/bob"),
            UserRecord::new("b:ob", "pass", Permissions::READ, "/srv/bob"),
            UserRecord::new("bob", "pass", Permissions::READ, "/srv/b:ob"),
            UserRecord::new("bob", "pa\nss", Permissions::READ, "/srv/bob"),
            UserRecord::new("bob", "pass", Permissions::READ, "/srv/bob\r"),
        ] {
            let err = store.insert(record).unwrap_err();
            assert!(matches!(err, UserParseError::ReservedCharacter { .. }));
        }
        assert!(store.is_empty());

        store
            .insert(UserRecord::new("bob", "pass", Permissions::READ, "/srv/bob"))
            .unwrap();
        let mut out = Vec::new();
        store.dump(&mut out).unwrap();
        assert_eq!(load(std::str::from_utf8(&out).unwrap()).unwrap().len(), 1);
    }

    #[test]
    fn test_save_file_replaces_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users");
        fs::write(&path, "old:x:r:/old\n").unwrap();

        let store = load("pub:banana:r:/srv/pub\n").unwrap();
        store.save_file(&path).unwrap();

        let reloaded = UserStore::load_file(&path).unwrap();
        assert!(reloaded.contains("pub"));
        assert!(!reloaded.contains("old"));
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}
