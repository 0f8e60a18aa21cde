//! Configuration for wrappy.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::{WrappyError, WrappyResult};

/// Main configuration for wrappy.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Memoization settings.
    #[serde(default)]
    pub memoize: MemoizeConfig,
}

/// General settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log format (text, json).
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

/// Construction parameters of a memoized computation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoizeConfig {
    /// Maximum number of distinct inputs kept in memory.
    #[serde(default = "default_cache_limit")]
    pub cache_limit: usize,

    /// Return an owned copy of the cached value instead of a borrow.
    #[serde(default)]
    pub return_copy: bool,

    /// Snapshot file. Persistence is disabled when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persist_path: Option<PathBuf>,

    /// Number of new entries between snapshot flushes.
    #[serde(default = "default_batch_size")]
    pub persist_batch_size: usize,
}

impl Default for MemoizeConfig {
    fn default() -> Self {
        Self {
            cache_limit: default_cache_limit(),
            return_copy: false,
            persist_path: None,
            persist_batch_size: default_batch_size(),
        }
    }
}

fn default_cache_limit() -> usize {
    1000
}

fn default_batch_size() -> usize {
    1000
}

impl MemoizeConfig {
    /// Creates a configuration with the given cache limit and defaults elsewhere.
    pub fn with_limit(cache_limit: usize) -> Self {
        Self {
            cache_limit,
            ..Self::default()
        }
    }

    /// Enables or disables returning owned copies.
    pub fn return_copy(mut self, enabled: bool) -> Self {
        self.return_copy = enabled;
        self
    }

    /// Enables snapshot persistence at `path`, flushing every `batch_size` new entries.
    pub fn persist<P: Into<PathBuf>>(mut self, path: P, batch_size: usize) -> Self {
        self.persist_path = Some(path.into());
        self.persist_batch_size = batch_size;
        self
    }

    /// Checks that limits are positive.
    pub fn validate(&self) -> WrappyResult<()> {
        if self.cache_limit == 0 {
            return Err(WrappyError::config("cache_limit must be a positive integer"));
        }
        if self.persist_batch_size == 0 {
            return Err(WrappyError::config(
                "persist_batch_size must be a positive integer",
            ));
        }
        Ok(())
    }
}

impl Config {
    /// Loads configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> WrappyResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Saves configuration to a TOML file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> WrappyResult<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validates every section.
    pub fn validate(&self) -> WrappyResult<()> {
        match self.general.log_format.as_str() {
            "text" | "json" => {}
            other => {
                return Err(WrappyError::config(format!(
                    "unknown log_format '{}' (expected text or json)",
                    other
                )))
            }
        }
        self.memoize.validate()
    }
}
