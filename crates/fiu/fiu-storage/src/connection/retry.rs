//! Linear back-off for lock contention.

use std::time::Duration;

use fiu_core::config::DatabaseConfig;
use fiu_core::errors::StorageError;
use tracing::debug;

/// How many times to attempt a statement and how long to wait between tries.
///
/// Attempt `n` (1-based) that fails with `DbBusy` waits `n * base_delay`
/// before the next try. With the defaults that is 0.5s, 1s, 1.5s, 2s.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &DatabaseConfig) -> Self {
        Self {
            max_attempts: config.effective_max_retries().max(1),
            base_delay: config.effective_retry_base_delay(),
        }
    }

    /// Back-off after the given failed attempt.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay * attempt
    }

    /// Run `f`, retrying transient failures. Non-transient errors return
    /// immediately; exhausting the attempts yields `RetriesExhausted`.
    pub fn run<T, F>(&self, mut f: F) -> Result<T, StorageError>
    where
        F: FnMut() -> Result<T, StorageError>,
    {
        let mut attempt = 1;
        loop {
            match f() {
                Err(e) if e.is_transient() => {
                    if attempt >= self.max_attempts {
                        return Err(StorageError::RetriesExhausted {
                            attempts: attempt,
                            message: e.to_string(),
                        });
                    }
                    let wait = self.delay_for(attempt);
                    debug!(
                        attempt,
                        wait_ms = wait.as_millis() as u64,
                        "database locked, backing off"
                    );
                    std::thread::sleep(wait);
                    attempt += 1;
                }
                other => return other,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn fast() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
        }
    }

    #[test]
    fn delays_grow_linearly() {
        let p = RetryPolicy::default();
        assert_eq!(p.delay_for(1), Duration::from_millis(500));
        assert_eq!(p.delay_for(4), Duration::from_millis(2000));
    }

    #[test]
    fn busy_then_ok_is_retried() {
        let calls = Cell::new(0);
        let out = fast().run(|| {
            calls.set(calls.get() + 1);
            if calls.get() < 3 {
                Err(StorageError::DbBusy)
            } else {
                Ok(7)
            }
        });
        assert_eq!(out.unwrap(), 7);
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn non_transient_error_is_not_retried() {
        let calls = Cell::new(0);
        let out: Result<(), _> = fast().run(|| {
            calls.set(calls.get() + 1);
            Err(StorageError::sqlite("syntax error"))
        });
        assert!(matches!(out, Err(StorageError::SqliteError { .. })));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn exhausted_attempts_are_reported() {
        let out: Result<(), _> = fast().run(|| Err(StorageError::DbBusy));
        match out {
            Err(StorageError::RetriesExhausted { attempts, .. }) => assert_eq!(attempts, 3),
            other => panic!("expected RetriesExhausted, got {other:?}"),
        }
    }
}
