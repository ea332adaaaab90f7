//! Write queue configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for the serialized write queue.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct QueueConfig {
    /// Maximum pending operations. `None` = unbounded.
    pub capacity: Option<usize>,
    /// How long the worker waits on an empty queue before re-checking
    /// its stop flags, in milliseconds. Default: 1000.
    pub poll_interval_ms: Option<u64>,
    /// Default timeout for `submit_and_wait`, in seconds. Default: 30.
    pub submit_timeout_secs: Option<u64>,
    /// Bound on joining the worker during `stop`, in seconds. Default: 5.
    pub stop_join_timeout_secs: Option<u64>,
}

impl QueueConfig {
    pub fn effective_poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.unwrap_or(1_000))
    }

    pub fn effective_submit_timeout(&self) -> Duration {
        Duration::from_secs(self.submit_timeout_secs.unwrap_or(30))
    }

    pub fn effective_stop_join_timeout(&self) -> Duration {
        Duration::from_secs(self.stop_join_timeout_secs.unwrap_or(5))
    }
}
