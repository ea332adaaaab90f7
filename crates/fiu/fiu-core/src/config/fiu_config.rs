//! Top-level configuration with layered resolution.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::{DatabaseConfig, QueueConfig};
use crate::errors::ConfigError;

/// Top-level configuration aggregating all sub-configs.
///
/// Resolution order (highest priority first):
/// 1. Environment variables (`FIU_*`)
/// 2. Project config (`fiu.toml` in the application root)
/// 3. User config (`~/.fiu/config.toml`)
/// 4. Compiled defaults
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct FiuConfig {
    pub database: DatabaseConfig,
    pub queue: QueueConfig,
}

impl FiuConfig {
    /// Load configuration with layered resolution rooted at `root`.
    pub fn load(root: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        // Lowest priority: user config. Unreadable files are skipped,
        // malformed ones are not.
        if let Some(user_config_path) = Self::user_config_path() {
            if user_config_path.exists() {
                match Self::merge_toml_file(&mut config, &user_config_path) {
                    Ok(()) | Err(ConfigError::FileNotFound { .. }) => {}
                    Err(e) => return Err(e),
                }
            }
        }

        let project_config_path = root.join("fiu.toml");
        if project_config_path.exists() {
            Self::merge_toml_file(&mut config, &project_config_path)?;
        }

        Self::apply_env_overrides(&mut config);

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a TOML string (for testing).
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(toml_str).map_err(|e| ConfigError::ParseError {
            path: "<string>".to_string(),
            message: e.to_string(),
        })?;
        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate the configuration values.
    pub fn validate(config: &FiuConfig) -> Result<(), ConfigError> {
        if config.database.max_retries == Some(0) {
            return Err(ConfigError::ValidationFailed {
                field: "database.max_retries".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if config.database.read_pool_size == Some(0) {
            return Err(ConfigError::ValidationFailed {
                field: "database.read_pool_size".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if config.queue.capacity == Some(0) {
            return Err(ConfigError::ValidationFailed {
                field: "queue.capacity".to_string(),
                message: "must be greater than 0 (omit for unbounded)".to_string(),
            });
        }
        if config.queue.poll_interval_ms == Some(0) {
            return Err(ConfigError::ValidationFailed {
                field: "queue.poll_interval_ms".to_string(),
                message: "must be greater than 0".to_string(),
            });
        }
        Ok(())
    }

    fn user_config_path() -> Option<PathBuf> {
        home_dir().map(|h| h.join(".fiu").join("config.toml"))
    }

    fn merge_toml_file(config: &mut FiuConfig, path: &Path) -> Result<(), ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
            path: path.display().to_string(),
        })?;

        let file_config: FiuConfig =
            toml::from_str(&content).map_err(|e| ConfigError::ParseError {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;

        Self::merge(config, &file_config);
        Ok(())
    }

    /// Merge `other` into `base`; only `Some` values in `other` win.
    fn merge(base: &mut FiuConfig, other: &FiuConfig) {
        let db = &other.database;
        if db.path.is_some() {
            base.database.path = db.path.clone();
        }
        if db.max_retries.is_some() {
            base.database.max_retries = db.max_retries;
        }
        if db.retry_base_delay_ms.is_some() {
            base.database.retry_base_delay_ms = db.retry_base_delay_ms;
        }
        if db.busy_timeout_ms.is_some() {
            base.database.busy_timeout_ms = db.busy_timeout_ms;
        }
        if db.read_pool_size.is_some() {
            base.database.read_pool_size = db.read_pool_size;
        }
        if db.cache_size.is_some() {
            base.database.cache_size = db.cache_size;
        }

        let q = &other.queue;
        if q.capacity.is_some() {
            base.queue.capacity = q.capacity;
        }
        if q.poll_interval_ms.is_some() {
            base.queue.poll_interval_ms = q.poll_interval_ms;
        }
        if q.submit_timeout_secs.is_some() {
            base.queue.submit_timeout_secs = q.submit_timeout_secs;
        }
        if q.stop_join_timeout_secs.is_some() {
            base.queue.stop_join_timeout_secs = q.stop_join_timeout_secs;
        }
    }

    /// Apply environment variable overrides.
    /// Pattern: `FIU_DATABASE_PATH`, `FIU_QUEUE_CAPACITY`, etc.
    fn apply_env_overrides(config: &mut FiuConfig) {
        if let Ok(val) = std::env::var("FIU_DATABASE_PATH") {
            config.database.path = Some(val);
        }
        if let Some(v) = env_parse("FIU_DATABASE_MAX_RETRIES") {
            config.database.max_retries = Some(v);
        }
        if let Some(v) = env_parse("FIU_DATABASE_BUSY_TIMEOUT_MS") {
            config.database.busy_timeout_ms = Some(v);
        }
        if let Some(v) = env_parse("FIU_QUEUE_CAPACITY") {
            config.queue.capacity = Some(v);
        }
        if let Some(v) = env_parse("FIU_QUEUE_SUBMIT_TIMEOUT_SECS") {
            config.queue.submit_timeout_secs = Some(v);
        }
    }

    /// Serialize the config back to TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ParseError {
            path: "<serialization>".to_string(),
            message: e.to_string(),
        })
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from)
}
