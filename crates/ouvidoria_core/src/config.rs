//! Runtime configuration for storage and logging.
//!
//! # Responsibility
//! - Describe how the persistence core opens its database and where it
//!   finds the schema script.
//! - Load that description from a JSON file or from process environment.
//!
//! # Invariants
//! - Every field has a default, so partial sources are valid.
//! - `database_path = None` means an in-memory database.

use crate::db::SchemaLoadMode;
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

pub const ENV_DB_PATH: &str = "OUVIDORIA_DB_PATH";
pub const ENV_SCHEMA_SCRIPT: &str = "OUVIDORIA_SCHEMA_SCRIPT";
pub const ENV_SCHEMA_MODE: &str = "OUVIDORIA_SCHEMA_MODE";
pub const ENV_LOG_LEVEL: &str = "OUVIDORIA_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "OUVIDORIA_LOG_DIR";

const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// Configuration loading errors.
#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, source: std::io::Error },
    Parse { path: PathBuf, source: serde_json::Error },
    InvalidValue { key: &'static str, value: String },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse { path, source } => {
                write!(f, "failed to parse config `{}`: {source}", path.display())
            }
            Self::InvalidValue { key, value } => {
                write!(f, "invalid value `{value}` for `{key}`")
            }
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse { source, .. } => Some(source),
            Self::InvalidValue { .. } => None,
        }
    }
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Database connection and schema bootstrap settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DbConfig {
    /// SQLite file path. `None` opens a private in-memory database.
    pub database_path: Option<PathBuf>,
    /// Script used by `create_schema_from_script(None)`.
    pub schema_script: PathBuf,
    pub schema_load_mode: SchemaLoadMode,
    pub busy_timeout_ms: u64,
    pub foreign_keys: bool,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            schema_script: default_schema_script(),
            schema_load_mode: SchemaLoadMode::default(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            foreign_keys: true,
        }
    }
}

/// Logging backend settings consumed by [`crate::logging::init_logging`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// One of `trace|debug|info|warn|error`.
    pub level: String,
    /// Absolute directory for rolling log files. `None` logs to stderr.
    pub log_dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: crate::logging::default_log_level().to_string(),
            log_dir: None,
        }
    }
}

/// Top-level configuration document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub db: DbConfig,
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Parses a JSON configuration document.
    pub fn from_json_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Builds configuration from `OUVIDORIA_*` environment variables.
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds configuration from an arbitrary key lookup.
    ///
    /// Unset or blank keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let mut config = Self::default();
        if let Some(path) = get(ENV_DB_PATH) {
            config.db.database_path = Some(PathBuf::from(path));
        }
        if let Some(path) = get(ENV_SCHEMA_SCRIPT) {
            config.db.schema_script = PathBuf::from(path);
        }
        if let Some(mode) = get(ENV_SCHEMA_MODE) {
            config.db.schema_load_mode =
                mode.parse().map_err(|_| ConfigError::InvalidValue {
                    key: ENV_SCHEMA_MODE,
                    value: mode.clone(),
                })?;
        }
        if let Some(level) = get(ENV_LOG_LEVEL) {
            config.logging.level = level;
        }
        if let Some(dir) = get(ENV_LOG_DIR) {
            config.logging.log_dir = Some(PathBuf::from(dir));
        }
        Ok(config)
    }
}

/// Schema script bundled with this crate.
pub fn default_schema_script() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("schema")
        .join("ouvidoria.sql")
}
