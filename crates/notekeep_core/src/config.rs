//! Runtime configuration for the note core.
//!
//! # Responsibility
//! - Resolve the database location and logging settings.
//! - Read overrides from `NOTEKEEP_*` environment variables.
//!
//! # Invariants
//! - Blank environment values are treated as unset.
//! - `db_path` always resolves to some path, falling back to the temp dir.

use crate::logging::default_log_level;
use std::path::PathBuf;

pub const DB_PATH_ENV: &str = "NOTEKEEP_DB_PATH";
pub const LOG_LEVEL_ENV: &str = "NOTEKEEP_LOG_LEVEL";
pub const LOG_DIR_ENV: &str = "NOTEKEEP_LOG_DIR";

const APP_DIR_NAME: &str = "notekeep";
const DB_FILE_NAME: &str = "notes.sqlite3";
const LOG_DIR_NAME: &str = "logs";

/// Settings needed to open the store and start logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreConfig {
    pub db_path: PathBuf,
    pub log_level: String,
    /// `None` disables file logging.
    pub log_dir: Option<PathBuf>,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            log_level: default_log_level().to_string(),
            log_dir: None,
        }
    }
}

impl CoreConfig {
    /// Builds config from process environment with platform defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds config from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let mut config = Self::default();
        if let Some(path) = read(DB_PATH_ENV) {
            config.db_path = PathBuf::from(path);
        }
        if let Some(level) = read(LOG_LEVEL_ENV) {
            config.log_level = level;
        }
        config.log_dir = read(LOG_DIR_ENV).map(PathBuf::from);
        config
    }

    pub fn with_db_path(mut self, db_path: impl Into<PathBuf>) -> Self {
        self.db_path = db_path.into();
        self
    }

    pub fn with_log_dir(mut self, log_dir: impl Into<PathBuf>) -> Self {
        self.log_dir = Some(log_dir.into());
        self
    }
}

/// Platform data directory for NoteKeep, or the temp dir if unknown.
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(APP_DIR_NAME)
}

/// Default on-device database file.
pub fn default_db_path() -> PathBuf {
    default_data_dir().join(DB_FILE_NAME)
}

/// Default rolling-log directory next to the database.
pub fn default_log_dir() -> PathBuf {
    default_data_dir().join(LOG_DIR_NAME)
}
