//! Synchronizer configuration.
//!
//! # Responsibility
//! - Load host configuration from TOML with defaults for every field.
//! - Carry the naming and mount policy handed to the reconciliation policy.
//!
//! # Invariants
//! - A loaded `SyncConfig` has passed `validate()`.
//! - Missing config files fall back to defaults; unreadable or malformed
//!   files are errors.

use crate::logging::default_log_level;
use crate::model::{is_dns_label, ResourceId};
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

/// Environment variable selecting the config file.
pub const CONFIG_PATH_ENV: &str = "EXAMPLESERVICE_CONFIG";

const DEFAULT_CONFIG_FILE: &str = "exampleservice.toml";
const DEFAULT_DB_FILE: &str = "exampleservice.sqlite3";
const DEFAULT_NAME_PREFIX: &str = "simpleexampleserviceinstance";
const DEFAULT_CONFIG_MOUNT_PATH: &str = "/usr/local/apache2/htdocs";
const DEFAULT_SECRET_MOUNT_PATH: &str = "/usr/local/apache2/secrets";
const DEFAULT_INDEX_FILE_NAME: &str = "index.html";
// Longest generated suffix is `-secret-<i64>`; keep names within 63 chars.
const MAX_NAME_PREFIX_LEN: usize = 35;

/// Configuration loading/validation errors.
#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse(toml::de::Error),
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "failed to parse config TOML: {err}"),
            Self::Invalid(message) => write!(f, "invalid config: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
            Self::Invalid(_) => None,
        }
    }
}

/// Top-level host configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// SQLite database backing the resource store.
    pub db_path: PathBuf,
    pub logging: LoggingConfig,
    pub policy: PolicyConfig,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_FILE),
            logging: LoggingConfig::default(),
            policy: PolicyConfig::default(),
        }
    }
}

impl SyncConfig {
    /// Parses and validates configuration text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: SyncConfig = toml::from_str(text).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from `path`; a missing file yields defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(text) => Self::from_toml_str(&text),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Resolves the config path: explicit argument, then `CONFIG_PATH_ENV`,
    /// then `./exampleservice.toml`.
    pub fn resolve_path(
        explicit: Option<&Path>,
        env: impl Fn(&str) -> Option<String>,
    ) -> PathBuf {
        if let Some(path) = explicit {
            return path.to_path_buf();
        }
        match env(CONFIG_PATH_ENV) {
            Some(value) if !value.trim().is_empty() => PathBuf::from(value.trim()),
            _ => PathBuf::from(DEFAULT_CONFIG_FILE),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.db_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("db_path cannot be empty".to_string()));
        }
        self.policy.validate()
    }
}

/// Logging section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `trace|debug|info|warn|error`.
    pub level: String,
    /// Absolute directory for rolling log files; stderr when unset.
    pub dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level().to_string(),
            dir: None,
        }
    }
}

/// Naming and mount policy for provisioned resources.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Prefix of every generated resource name.
    pub name_prefix: String,
    pub config_mount_path: String,
    pub secret_mount_path: String,
    /// Key of the rendered page inside the config artifact.
    pub index_file_name: String,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            name_prefix: DEFAULT_NAME_PREFIX.to_string(),
            config_mount_path: DEFAULT_CONFIG_MOUNT_PATH.to_string(),
            secret_mount_path: DEFAULT_SECRET_MOUNT_PATH.to_string(),
            index_file_name: DEFAULT_INDEX_FILE_NAME.to_string(),
        }
    }
}

impl PolicyConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !is_dns_label(&self.name_prefix) || self.name_prefix.len() > MAX_NAME_PREFIX_LEN {
            return Err(ConfigError::Invalid(format!(
                "policy.name_prefix must be a DNS label of at most {MAX_NAME_PREFIX_LEN} chars, got `{}`",
                self.name_prefix
            )));
        }
        for (field, path) in [
            ("policy.config_mount_path", &self.config_mount_path),
            ("policy.secret_mount_path", &self.secret_mount_path),
        ] {
            if !path.starts_with('/') {
                return Err(ConfigError::Invalid(format!(
                    "{field} must be absolute, got `{path}`"
                )));
            }
        }
        if self.index_file_name.trim().is_empty() || self.index_file_name.contains('/') {
            return Err(ConfigError::Invalid(format!(
                "policy.index_file_name must be a bare file name, got `{}`",
                self.index_file_name
            )));
        }
        Ok(())
    }

    /// Name of the workload provisioned for a parent.
    pub fn workload_name(&self, instance_id: ResourceId) -> String {
        format!("{}-{instance_id}", self.name_prefix)
    }

    /// Name of the config artifact provisioned for a parent.
    pub fn config_name(&self, instance_id: ResourceId) -> String {
        format!("{}-map-{instance_id}", self.name_prefix)
    }

    /// Name of the secret artifact provisioned for a parent.
    pub fn secret_name(&self, instance_id: ResourceId) -> String {
        format!("{}-secret-{instance_id}", self.name_prefix)
    }
}
