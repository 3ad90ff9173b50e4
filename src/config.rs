//! Application configuration management.
//!
//! Configuration is stored at `~/.config/fountainmap/config.json` (or the
//! platform equivalent). A missing file yields defaults, and every field
//! falls back to its default when absent. Command-line flags override it.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cache::{DEFAULT_CACHE_KEY, DEFAULT_EXPIRY_DAYS};
use crate::data::fetcher::DEFAULT_REQUEST_TIMEOUT;
use crate::data::DataSource;

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Madrid open data catalogue of public drinking fountains
pub const DEFAULT_ENDPOINT: &str = "https://datos.madrid.es/egob/catalogo/300051-0-fuentes.json";

/// Errors that can occur when loading the configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file exists but could not be read
    #[error("Failed to read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid JSON
    #[error("Failed to parse config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Config file parsed but holds an unusable value
    #[error("Invalid config {}: {reason}", path.display())]
    Invalid { path: PathBuf, reason: &'static str },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Primary data endpoint
    pub endpoint: String,
    /// Fallback source: `bundled`, a file path, or a URL
    pub fallback: String,
    /// Name of the cache slot
    pub cache_key: String,
    /// Overrides the platform cache directory
    pub cache_dir: Option<PathBuf>,
    /// Days a cached payload stays valid
    pub expiry_days: u32,
    /// Timeout for each HTTP request, in seconds
    pub request_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            fallback: "bundled".to_string(),
            cache_key: DEFAULT_CACHE_KEY.to_string(),
            cache_dir: None,
            expiry_days: DEFAULT_EXPIRY_DAYS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT.as_secs(),
        }
    }
}

/// Values from the command line that take precedence over the file
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub endpoint: Option<String>,
    pub fallback: Option<String>,
    pub cache_dir: Option<PathBuf>,
    pub expiry_days: Option<u32>,
}

impl Config {
    /// Loads the config from the default location, or defaults if absent
    pub fn load() -> Result<Self, ConfigError> {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    /// Loads the config from `path`, or defaults if the file does not exist
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate().map_err(|reason| ConfigError::Invalid {
            path: path.to_path_buf(),
            reason,
        })?;
        Ok(config)
    }

    /// Rejects values that would make every load fail or every cache entry stale
    fn validate(&self) -> Result<(), &'static str> {
        if self.expiry_days == 0 {
            return Err("expiry_days must be at least 1");
        }
        if self.request_timeout_secs == 0 {
            return Err("request_timeout_secs must be at least 1");
        }
        if self.cache_key.trim().is_empty() {
            return Err("cache_key must not be empty");
        }
        Ok(())
    }

    /// Default config file location
    pub fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "fountainmap").map(|dirs| dirs.config_dir().join(CONFIG_FILE))
    }

    /// Applies command-line overrides
    pub fn with_overrides(mut self, overrides: ConfigOverrides) -> Self {
        if let Some(endpoint) = overrides.endpoint {
            self.endpoint = endpoint;
        }
        if let Some(fallback) = overrides.fallback {
            self.fallback = fallback;
        }
        if let Some(cache_dir) = overrides.cache_dir {
            self.cache_dir = Some(cache_dir);
        }
        if let Some(expiry_days) = overrides.expiry_days {
            self.expiry_days = expiry_days;
        }
        self
    }

    pub fn primary_source(&self) -> DataSource {
        DataSource::parse(&self.endpoint)
    }

    pub fn fallback_source(&self) -> DataSource {
        DataSource::parse(&self.fallback)
    }

    pub fn expiry(&self) -> chrono::Duration {
        chrono::Duration::days(i64::from(self.expiry_days))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
