use std::env;
use std::path::PathBuf;

use crate::logging::default_log_level;

pub const ENV_DB_PATH: &str = "CONTACTCORE_DB";
pub const ENV_LOG_LEVEL: &str = "CONTACTCORE_LOG";
pub const ENV_LOG_DIR: &str = "CONTACTCORE_LOG_DIR";

const APP_DIR: &str = "contactcore";
const DB_FILE: &str = "contacts.db";

/// Runtime settings for the binary.
///
/// Resolution order: built-in defaults, then environment, then CLI flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub db_path: PathBuf,
    pub log_level: String,
    /// `None` logs to stderr.
    pub log_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            log_level: default_log_level().to_string(),
            log_dir: None,
        }
    }
}

impl Config {
    /// Defaults overridden by the process environment.
    pub fn load() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each variable.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(path) = lookup(ENV_DB_PATH) {
            config.db_path = PathBuf::from(path);
        }
        if let Some(level) = lookup(ENV_LOG_LEVEL) {
            config.log_level = level.trim().to_string();
        }
        if let Some(dir) = lookup(ENV_LOG_DIR) {
            config.log_dir = Some(PathBuf::from(dir));
        }
        config
    }

    /// Apply command-line flags; `None` keeps the current value.
    pub fn with_overrides(
        mut self,
        db_path: Option<PathBuf>,
        log_level: Option<String>,
        log_dir: Option<PathBuf>,
    ) -> Self {
        if let Some(path) = db_path {
            self.db_path = path;
        }
        if let Some(level) = log_level {
            self.log_level = level;
        }
        if let Some(dir) = log_dir {
            self.log_dir = Some(dir);
        }
        self
    }
}

/// `<config dir>/contactcore/contacts.db`, or the working directory when the
/// platform has no config directory.
pub fn default_db_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
        .join(DB_FILE)
}
