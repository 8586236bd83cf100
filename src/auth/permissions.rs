//! Virtual user permissions
//!
//! A user may read, write, both or neither. Nothing finer grained exists: the
//! permission applies to everything below the user's root.

use serde::{Deserialize, Deserializer};
use std::fmt;
use std::str::FromStr;

/// Set of permissions, a subset of {read, write}
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Permissions {
    read: bool,
    write: bool,
}

impl Permissions {
    pub const NONE: Permissions = Permissions { read: false, write: false };
    pub const READ: Permissions = Permissions { read: true, write: false };
    pub const WRITE: Permissions = Permissions { read: false, write: true };
    pub const READ_WRITE: Permissions = Permissions { read: true, write: true };

    /// Derives permissions from a users-file field: `r` anywhere grants read,
    /// `w` anywhere grants write, every other character is ignored.
    pub fn from_flags(field: &str) -> Self {
        Self {
            read: field.contains('r'),
            write: field.contains('w'),
        }
    }

    pub fn can_read(&self) -> bool {
        self.read
    }

    pub fn can_write(&self) -> bool {
        self.write
    }

    pub fn is_empty(&self) -> bool {
        !self.read && !self.write
    }
}

impl fmt::Display for Permissions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.read {
            f.write_str("r")?;
        }
        if self.write {
            f.write_str("w")?;
        }
        Ok(())
    }
}

/// Strict parsing used for configuration values: only `r`, `w` or `rw`.
impl FromStr for Permissions {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "r" => Ok(Permissions::READ),
            "w" => Ok(Permissions::WRITE),
            "rw" => Ok(Permissions::READ_WRITE),
            other => Err(format!("'{}' is not one of r, w, rw", other)),
        }
    }
}

impl<'de> Deserialize<'de> for Permissions {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
