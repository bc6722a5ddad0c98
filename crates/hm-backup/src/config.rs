//! Settings of a run
//!
//! Values come from three layers: command line flags win over the optional
//! YAML config file, which wins over the built-in defaults.

use hm_links::DeviceNames;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

pub const DEFAULT_HOST: &str = "ccu";
pub const DEFAULT_PORT: u16 = 2000;
pub const DEFAULT_NAME_FILE: &str = "homematic_manager_names.json";
pub const DEFAULT_BACKUP_FILE: &str = "link_backup.json";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors that can occur while loading settings or the name file
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read a file
    #[error("failed to read file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse YAML
    #[error("failed to parse YAML in {path}: {source}")]
    ParseYaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// Name file is not a JSON object of address -> name
    #[error("failed to parse name file {path}: {source}")]
    ParseNames {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Invalid configuration value
    #[error("invalid configuration value for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },
}

/// Content of the YAML config file; every key is optional
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub name_file: Option<PathBuf>,
    pub backup_file: Option<PathBuf>,
    pub timeout_secs: Option<u64>,
}

impl FileConfig {
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&content, path)
    }

    pub fn from_yaml_str(content: &str, source_path: &Path) -> ConfigResult<Self> {
        // An empty document is a valid, empty config
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content).map_err(|source| ConfigError::ParseYaml {
            path: source_path.to_path_buf(),
            source,
        })
    }
}

/// Values given on the command line
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub name_file: Option<PathBuf>,
    pub backup_file: Option<PathBuf>,
}

/// Effective settings of a run
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    pub name_file: PathBuf,
    pub backup_file: PathBuf,
    pub timeout: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            name_file: PathBuf::from(DEFAULT_NAME_FILE),
            backup_file: PathBuf::from(DEFAULT_BACKUP_FILE),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl Settings {
    /// Merge defaults, the config file and command line overrides
    pub fn resolve(file: FileConfig, overrides: Overrides) -> ConfigResult<Self> {
        let defaults = Self::default();
        let timeout = match file.timeout_secs {
            Some(0) => {
                return Err(ConfigError::InvalidValue {
                    key: "timeout_secs".to_string(),
                    reason: "must be greater than zero".to_string(),
                })
            }
            Some(secs) => Duration::from_secs(secs),
            None => defaults.timeout,
        };

        let settings = Self {
            host: overrides.host.or(file.host).unwrap_or(defaults.host),
            port: overrides.port.or(file.port).unwrap_or(defaults.port),
            name_file: overrides
                .name_file
                .or(file.name_file)
                .unwrap_or(defaults.name_file),
            backup_file: overrides
                .backup_file
                .or(file.backup_file)
                .unwrap_or(defaults.backup_file),
            timeout,
        };

        if settings.host.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "host".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        if settings.port == 0 {
            return Err(ConfigError::InvalidValue {
                key: "port".to_string(),
                reason: "must not be 0".to_string(),
            });
        }
        debug!(?settings, "Settings resolved");
        Ok(settings)
    }

    /// Directory the backup file lives in; also receives the device list
    pub fn backup_dir(&self) -> &Path {
        self.backup_file.parent().unwrap_or_else(|| Path::new(""))
    }
}

/// Load device display names
///
/// A missing name file is not an error: devices are then shown by address.
pub fn load_names(path: &Path) -> ConfigResult<DeviceNames> {
    if !path.exists() {
        warn!(
            path = %path.display(),
            "Name file not found, devices are shown by address"
        );
        return Ok(DeviceNames::new());
    }
    let content = fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;
    let names = DeviceNames::from_json_str(&content).map_err(|source| ConfigError::ParseNames {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), count = names.len(), "Device names loaded");
    Ok(names)
}
