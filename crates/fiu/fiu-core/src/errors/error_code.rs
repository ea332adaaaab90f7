//! FiuErrorCode trait: stable string codes for every error enum.

/// Trait for mapping errors to a stable error code.
/// Every error enum implements this so callers (a UI notification layer,
/// for instance) can branch on the code instead of the message text.
pub trait FiuErrorCode {
    /// Returns the error code string (e.g., "DB_BUSY").
    fn error_code(&self) -> &'static str;

    /// Returns the formatted error string: `[ERROR_CODE] message`.
    fn coded_string(&self) -> String
    where
        Self: std::fmt::Display,
    {
        format!("[{}] {}", self.error_code(), self)
    }
}

pub const CONFIG_ERROR: &str = "CONFIG_ERROR";
pub const STORAGE_ERROR: &str = "STORAGE_ERROR";
pub const DB_BUSY: &str = "DB_BUSY";
pub const DB_CORRUPT: &str = "DB_CORRUPT";
pub const DISK_FULL: &str = "DISK_FULL";
pub const CONSTRAINT_VIOLATION: &str = "CONSTRAINT_VIOLATION";
pub const RETRIES_EXHAUSTED: &str = "RETRIES_EXHAUSTED";
pub const BACKUP_FAILED: &str = "BACKUP_FAILED";
pub const QUEUE_CLOSED: &str = "QUEUE_CLOSED";
pub const QUEUE_FULL: &str = "QUEUE_FULL";
pub const INVALID_STATEMENT: &str = "INVALID_STATEMENT";
pub const TIMEOUT_EXCEEDED: &str = "TIMEOUT_EXCEEDED";
pub const CALLBACK_ERROR: &str = "CALLBACK_ERROR";
pub const WORKER_ERROR: &str = "WORKER_ERROR";
