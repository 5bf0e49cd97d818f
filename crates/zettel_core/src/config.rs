//! Core runtime configuration.
//!
//! # Responsibility
//! - Describe where the database, note files and logs live.
//! - Resolve those locations from environment variables with defaults.
//!
//! # Invariants
//! - A validated config has non-empty paths, a known log level, and an
//!   absolute log directory when one is set.

use crate::logging::{default_log_level, normalize_level};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::ffi::OsString;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

pub const ENV_HOME: &str = "ZETTEL_HOME";
pub const ENV_DB_PATH: &str = "ZETTEL_DB_PATH";
pub const ENV_NOTES_ROOT: &str = "ZETTEL_NOTES_ROOT";
pub const ENV_LOG_LEVEL: &str = "ZETTEL_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "ZETTEL_LOG_DIR";

const DEFAULT_HOME_DIR: &str = ".zettel";
const DB_FILE_NAME: &str = "zettel.sqlite3";
const NOTES_DIR_NAME: &str = "notes";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Neither `ZETTEL_HOME` nor `HOME` is set.
    MissingHome,
    EmptyPath(&'static str),
    RelativeLogDir(PathBuf),
    InvalidLogLevel(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingHome => write!(f, "set {ENV_HOME} or HOME to locate zettel data"),
            Self::EmptyPath(field) => write!(f, "config field `{field}` must not be empty"),
            Self::RelativeLogDir(path) => {
                write!(f, "log_dir must be an absolute path, got `{}`", path.display())
            }
            Self::InvalidLogLevel(message) => write!(f, "{message}"),
        }
    }
}

impl Error for ConfigError {}

/// Locations and log settings for one zettel workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoreConfig {
    pub db_path: PathBuf,
    /// Directory note `file_path`s are relative to.
    pub notes_root: PathBuf,
    #[serde(default = "default_level_string")]
    pub log_level: String,
    /// Rolling log directory. `None` disables file logging.
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
}

impl CoreConfig {
    /// Default layout under one base directory.
    pub fn with_home(home: impl AsRef<Path>) -> Self {
        let home = home.as_ref();
        Self {
            db_path: home.join(DB_FILE_NAME),
            notes_root: home.join(NOTES_DIR_NAME),
            log_level: default_level_string(),
            log_dir: None,
        }
    }

    /// Reads the process environment. See [`CoreConfig::from_vars`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|key| std::env::var_os(key))
    }

    /// Builds a config from a variable lookup.
    ///
    /// The base directory is `ZETTEL_HOME`, else `$HOME/.zettel`; individual
    /// `ZETTEL_*` variables override the derived locations.
    pub fn from_vars<L>(lookup: L) -> Result<Self, ConfigError>
    where
        L: Fn(&str) -> Option<OsString>,
    {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.is_empty());

        let home = match non_empty(ENV_HOME) {
            Some(home) => PathBuf::from(home),
            None => PathBuf::from(non_empty("HOME").ok_or(ConfigError::MissingHome)?)
                .join(DEFAULT_HOME_DIR),
        };

        let mut config = Self::with_home(home);
        if let Some(db_path) = non_empty(ENV_DB_PATH) {
            config.db_path = PathBuf::from(db_path);
        }
        if let Some(notes_root) = non_empty(ENV_NOTES_ROOT) {
            config.notes_root = PathBuf::from(notes_root);
        }
        if let Some(level) = non_empty(ENV_LOG_LEVEL) {
            config.log_level = level.to_string_lossy().into_owned();
        }
        config.log_dir = non_empty(ENV_LOG_DIR).map(PathBuf::from);

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.db_path.as_os_str().is_empty() {
            return Err(ConfigError::EmptyPath("db_path"));
        }
        if self.notes_root.as_os_str().is_empty() {
            return Err(ConfigError::EmptyPath("notes_root"));
        }
        normalize_level(&self.log_level).map_err(ConfigError::InvalidLogLevel)?;
        if let Some(log_dir) = &self.log_dir {
            if !log_dir.is_absolute() {
                return Err(ConfigError::RelativeLogDir(log_dir.clone()));
            }
        }
        Ok(())
    }
}

fn default_level_string() -> String {
    default_log_level().to_string()
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, CoreConfig};
    use std::collections::HashMap;
    use std::ffi::OsString;
    use std::path::PathBuf;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<OsString> {
        let map: HashMap<String, OsString> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), OsString::from(value)))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_live_under_home_dot_zettel() {
        let config = CoreConfig::from_vars(vars(&[("HOME", "/home/ana")])).unwrap();
        assert_eq!(config.db_path, PathBuf::from("/home/ana/.zettel/zettel.sqlite3"));
        assert_eq!(config.notes_root, PathBuf::from("/home/ana/.zettel/notes"));
        assert_eq!(config.log_dir, None);
    }

    #[test]
    fn zettel_variables_override_defaults() {
        let config = CoreConfig::from_vars(vars(&[
            ("ZETTEL_HOME", "/data/zk"),
            ("ZETTEL_NOTES_ROOT", "/srv/notes"),
            ("ZETTEL_LOG_LEVEL", "WARN"),
            ("ZETTEL_LOG_DIR", "/var/log/zettel"),
        ]))
        .unwrap();
        assert_eq!(config.db_path, PathBuf::from("/data/zk/zettel.sqlite3"));
        assert_eq!(config.notes_root, PathBuf::from("/srv/notes"));
        assert_eq!(config.log_level, "WARN");
        assert_eq!(config.log_dir, Some(PathBuf::from("/var/log/zettel")));
    }

    #[test]
    fn missing_home_is_reported() {
        let err = CoreConfig::from_vars(vars(&[])).unwrap_err();
        assert_eq!(err, ConfigError::MissingHome);
    }

    #[test]
    fn rejects_bad_level_and_relative_log_dir() {
        let err = CoreConfig::from_vars(vars(&[("HOME", "/h"), ("ZETTEL_LOG_LEVEL", "loud")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidLogLevel(_)));

        let err = CoreConfig::from_vars(vars(&[("HOME", "/h"), ("ZETTEL_LOG_DIR", "logs")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::RelativeLogDir(_)));
    }

    #[test]
    fn deserializes_with_optional_fields_defaulted() {
        let config: CoreConfig = serde_json::from_str(
            r#"{"db_path": "/tmp/z.sqlite3", "notes_root": "/tmp/notes"}"#,
        )
        .unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.log_dir, None);
        assert!(!config.log_level.is_empty());
    }
}
