//! Database connection and retry configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for the SQLite database manager.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Path to the database file. Default: "fiu_reports.db".
    pub path: Option<String>,
    /// Attempts per statement when the database is locked. Default: 5.
    pub max_retries: Option<u32>,
    /// Back-off step in milliseconds; attempt `n` waits `n * step`. Default: 500.
    pub retry_base_delay_ms: Option<u64>,
    /// SQLite busy timeout in milliseconds. Default: 10000.
    pub busy_timeout_ms: Option<u64>,
    /// Number of read-only connections. Default: 4.
    pub read_pool_size: Option<usize>,
    /// SQLite page cache size (pages). Default: 10000.
    pub cache_size: Option<i64>,
}

impl DatabaseConfig {
    pub fn effective_path(&self) -> &str {
        self.path.as_deref().unwrap_or("fiu_reports.db")
    }

    pub fn effective_max_retries(&self) -> u32 {
        self.max_retries.unwrap_or(5)
    }

    pub fn effective_retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms.unwrap_or(500))
    }

    pub fn effective_busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms.unwrap_or(10_000))
    }

    pub fn effective_read_pool_size(&self) -> usize {
        self.read_pool_size.unwrap_or(4)
    }

    pub fn effective_cache_size(&self) -> i64 {
        self.cache_size.unwrap_or(10_000)
    }
}
