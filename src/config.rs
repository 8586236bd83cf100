//! Configuration management for rax-vftpd
//!
//! The configuration file is a flat list of `key: value` lines. [`ConfigStore`] keeps the
//! raw mapping exactly as written and doubles as a `config` source; [`ServerConfig`] is the
//! typed view built from defaults, the store and `RAX_VFTPD_*` environment overrides.
//! Both are loaded once at startup. Editing the file requires a restart.

use config::{Config, ConfigError, Environment, Map, Source, Value, ValueKind};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use crate::auth::Permissions;
use crate::error::ConfigParseError;

pub const DEFAULT_BANNER: &str = "rax-vftpd ready.";
pub const DEFAULT_WELCOME_MSG: &str = "Login successful.";
pub const DEFAULT_GOODBYE_MSG: &str = "Goodbye.";

/// Keys whose values must be non-negative integers
const INTEGER_KEYS: &[&str] = &[
    "default_port",
    "max_login_attempts",
    "max_connections",
    "max_connections_per_ip",
];

/// Keys whose values must be yes/no style booleans
const BOOLEAN_KEYS: &[&str] = &["anonymous", "disable_logging"];

/// Keys read into [`ServerConfig`]. Only these are handed to the `config` layer,
/// which would otherwise treat a dotted key such as `banner.fr` as a nested path.
const TYPED_KEYS: &[&str] = &[
    "default_port",
    "anonymous",
    "anonymous_root",
    "anonymous_perm",
    "disable_logging",
    "banner",
    "welcome_msg",
    "goodbye_msg",
    "max_login_attempts",
    "max_connections",
    "max_connections_per_ip",
    "user_file",
];

/// Raw `key: value` mapping read from the configuration file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigStore {
    options: BTreeMap<String, String>,
    origin: Option<String>,
}

impl ConfigStore {
    /// Parses `key: value` lines. A literal `\n` in a value becomes a newline.
    pub fn load<R: BufRead>(source: R) -> Result<Self, ConfigParseError> {
        let mut options = BTreeMap::new();

        for (idx, line) in source.lines().enumerate() {
            let line = line.map_err(|e| ConfigParseError::Io(PathBuf::new(), e))?;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            let (key, value) = match trimmed.split_once(':') {
                Some((k, v)) if !k.trim().is_empty() => (k.trim(), v.trim()),
                _ => {
                    return Err(ConfigParseError::MalformedLine {
                        line: idx + 1,
                        content: trimmed.to_string(),
                    });
                }
            };

            check_value(key, value)?;
            options.insert(key.to_string(), value.replace("\\n", "\n"));
        }

        Ok(Self {
            options,
            origin: None,
        })
    }

    /// Parses the configuration file at `path`.
    pub fn load_file(path: &Path) -> Result<Self, ConfigParseError> {
        let file = fs::File::open(path).map_err(|e| ConfigParseError::Io(path.to_path_buf(), e))?;
        let mut store = Self::load(BufReader::new(file)).map_err(|e| match e {
            ConfigParseError::Io(_, err) => ConfigParseError::Io(path.to_path_buf(), err),
            other => other,
        })?;
        store.origin = Some(path.display().to_string());
        Ok(store)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.options.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.options.len()
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    /// Writes the mapping back in `key: value` form.
    pub fn dump<W: Write>(&self, mut out: W) -> io::Result<()> {
        for (key, value) in &self.options {
            writeln!(out, "{}: {}", key, value.replace('\n', "\\n"))?;
        }
        out.flush()
    }
}

/// Recognized keys must coerce to their type; anything else passes through.
fn check_value(key: &str, value: &str) -> Result<(), ConfigParseError> {
    let invalid = |reason: &str| ConfigParseError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    };

    if INTEGER_KEYS.contains(&key) && value.parse::<u64>().is_err() {
        return Err(invalid("expected a non-negative integer"));
    }
    if key == "default_port" && value.parse::<u16>().is_err() {
        return Err(invalid("expected a port number"));
    }
    if BOOLEAN_KEYS.contains(&key) && parse_bool(value).is_none() {
        return Err(invalid("expected yes or no"));
    }
    Ok(())
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "yes" | "true" | "on" | "1" => Some(true),
        "no" | "false" | "off" | "0" => Some(false),
        _ => None,
    }
}

fn value_kind(key: &str, value: &str) -> ValueKind {
    if INTEGER_KEYS.contains(&key) {
        if let Ok(n) = value.parse::<i64>() {
            return ValueKind::I64(n);
        }
    }
    if BOOLEAN_KEYS.contains(&key) {
        if let Some(b) = parse_bool(value) {
            return ValueKind::Boolean(b);
        }
    }
    ValueKind::String(value.to_string())
}

impl Source for ConfigStore {
    fn clone_into_box(&self) -> Box<dyn Source + Send + Sync> {
        Box::new(self.clone())
    }

    fn collect(&self) -> Result<Map<String, Value>, ConfigError> {
        Ok(self
            .options
            .iter()
            .filter(|(key, _)| TYPED_KEYS.contains(&key.as_str()))
            .map(|(key, value)| {
                (
                    key.clone(),
                    Value::new(self.origin.as_ref(), value_kind(key, value)),
                )
            })
            .collect())
    }
}

/// Typed server configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Control port used when no port is given on the command line
    pub default_port: u16,

    /// Register the `anonymous` identity
    pub anonymous: bool,
    pub anonymous_root: PathBuf,
    pub anonymous_perm: Permissions,

    /// Skip the access and error log files entirely
    pub disable_logging: bool,

    /// Greeting sent on connect, then after login and on quit
    pub banner: String,
    pub welcome_msg: String,
    pub goodbye_msg: String,

    /// Limits enforced by the engine. Zero disables the limit.
    pub max_login_attempts: u32,
    pub max_connections: usize,
    pub max_connections_per_ip: usize,

    /// Path of the virtual users file
    #[serde(default)]
    pub user_file: Option<PathBuf>,
}

impl ServerConfig {
    /// Load configuration from the file at `path` with environment overrides
    ///
    /// A relative `user_file` is taken relative to the configuration file's directory.
    pub fn load(path: &Path) -> Result<Self, ConfigParseError> {
        let store = ConfigStore::load_file(path)?;
        let mut config = Self::from_store(&store)?;
        if let (Some(user_file), Some(dir)) = (&config.user_file, path.parent()) {
            if user_file.is_relative() {
                config.user_file = Some(dir.join(user_file));
            }
        }
        Ok(config)
    }

    /// Layer defaults, the parsed store and the environment, then validate
    pub fn from_store(store: &ConfigStore) -> Result<Self, ConfigParseError> {
        let settings = Config::builder()
            .set_default("default_port", 21)?
            .set_default("anonymous", false)?
            .set_default("anonymous_root", "/tmp")?
            .set_default("anonymous_perm", "r")?
            .set_default("disable_logging", false)?
            .set_default("banner", DEFAULT_BANNER)?
            .set_default("welcome_msg", DEFAULT_WELCOME_MSG)?
            .set_default("goodbye_msg", DEFAULT_GOODBYE_MSG)?
            .set_default("max_login_attempts", 3)?
            .set_default("max_connections", 50)?
            .set_default("max_connections_per_ip", 10)?
            .add_source(store.clone())
            .add_source(Environment::with_prefix("RAX_VFTPD"))
            .build()?;

        let config: ServerConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.default_port == 0 {
            return Err(ConfigError::Message("default_port cannot be 0".into()));
        }

        if self.anonymous && self.anonymous_root.as_os_str().is_empty() {
            return Err(ConfigError::Message(
                "anonymous_root cannot be empty when anonymous is enabled".into(),
            ));
        }

        if matches!(&self.user_file, Some(p) if p.as_os_str().is_empty()) {
            return Err(ConfigError::Message("user_file cannot be empty".into()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn typed(text: &str) -> Result<ServerConfig, ConfigParseError> {
        ServerConfig::from_store(&ConfigStore::load(text.as_bytes())?)
    }

    #[test]
    fn test_raw_store_keeps_unknown_keys() {
        let store = ConfigStore::load(
            "# comment\n\n  default_port : 2121 \nfavourite_colour: blue\nbanner: a: b\n".as_bytes(),
        )
        .unwrap();
        assert_eq!(store.get("default_port"), Some("2121"));
        assert_eq!(store.get("favourite_colour"), Some("blue"));
        assert_eq!(store.get("banner"), Some("a: b"));
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_dotted_unknown_key_is_ignored() {
        let store = ConfigStore::load("banner: Hello\nbanner.fr: Bonjour\nfavourite.colour: blue\n".as_bytes()).unwrap();
        assert_eq!(store.get("banner.fr"), Some("Bonjour"));

        let config = ServerConfig::from_store(&store).unwrap();
        assert_eq!(config.banner, "Hello");

        let config = typed("banner.fr: x\n").unwrap();
        assert_eq!(config.banner, DEFAULT_BANNER);
    }

    #[test]
    fn test_line_without_separator_fails() {
        let err = ConfigStore::load("anonymous yes\n".as_bytes()).unwrap_err();
        assert!(matches!(err, ConfigParseError::MalformedLine { line: 1, .. }));

        let err = ConfigStore::load(": value\n".as_bytes()).unwrap_err();
        assert!(matches!(err, ConfigParseError::MalformedLine { .. }));
    }

    #[test]
    fn test_recognized_keys_are_coerced() {
        for bad in [
            "max_connections: lots",
            "default_port: -21",
            "max_login_attempts: 2.5",
            "anonymous: maybe",
        ] {
            let err = ConfigStore::load(bad.as_bytes()).unwrap_err();
            assert!(matches!(err, ConfigParseError::InvalidValue { .. }), "{}", bad);
        }
    }

    #[test]
    fn test_defaults() {
        let config = typed("").unwrap();
        assert_eq!(config.default_port, 21);
        assert!(!config.anonymous);
        assert_eq!(config.anonymous_root, PathBuf::from("/tmp"));
        assert_eq!(config.anonymous_perm, Permissions::READ);
        assert!(!config.disable_logging);
        assert_eq!(config.banner, DEFAULT_BANNER);
        assert_eq!(config.welcome_msg, DEFAULT_WELCOME_MSG);
        assert_eq!(config.goodbye_msg, DEFAULT_GOODBYE_MSG);
        assert_eq!(config.max_login_attempts, 3);
        assert_eq!(config.max_connections, 50);
        assert_eq!(config.max_connections_per_ip, 10);
        assert!(config.user_file.is_none());
    }

    #[test]
    fn test_file_values_override_defaults() {
        let config = typed(
            "default_port: 2121\nanonymous: yes\nanonymous_perm: rw\ndisable_logging: no\n\
             banner: Hello\\nWorld\nmax_connections: 5\nuser_file: /etc/rax-vftpd/users\n",
        )
        .unwrap();
        assert_eq!(config.default_port, 2121);
        assert!(config.anonymous);
        assert_eq!(config.anonymous_perm, Permissions::READ_WRITE);
        assert_eq!(config.banner, "Hello\nWorld");
        assert_eq!(config.max_connections, 5);
        assert_eq!(config.user_file, Some(PathBuf::from("/etc/rax-vftpd/users")));
    }

    #[test]
    fn test_invalid_anonymous_perm() {
        let err = typed("anonymous_perm: x\n").unwrap_err();
        assert!(matches!(err, ConfigParseError::Config(_)));
    }

    #[test]
    fn test_out_of_range_port() {
        let err = typed("default_port: 70000\n").unwrap_err();
        assert!(matches!(err, ConfigParseError::InvalidValue { .. }));
        assert!(typed("default_port: 0\n").is_err());
    }

    #[test]
    fn test_load_file_resolves_relative_user_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config");
        std::fs::write(&path, "user_file: users\nanonymous: yes\n").unwrap();

        let config = ServerConfig::load(&path).unwrap();
        assert_eq!(config.user_file, Some(dir.path().join("users")));
        assert!(config.anonymous);
    }

    #[test]
    fn test_load_missing_file() {
        let err = ServerConfig::load(Path::new("/nonexistent/rax-vftpd/config")).unwrap_err();
        assert!(matches!(err, ConfigParseError::Io(..)));
    }

    #[test]
    fn test_dump_escapes_newlines() {
        let store = ConfigStore::load("banner: one\\ntwo\nanonymous: no\n".as_bytes()).unwrap();
        let mut out = Vec::new();
        store.dump(&mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "anonymous: no\nbanner: one\\ntwo\n");
    }
}
