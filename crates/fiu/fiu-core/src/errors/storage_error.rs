//! Storage-layer errors for SQLite operations.

use rusqlite::ffi::ErrorCode;

use super::error_code::{self, FiuErrorCode};

/// Errors raised by a database executor.
///
/// The write queue forwards these to callers unchanged; it never interprets
/// or retries them.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StorageError {
    #[error("SQLite error: {message}")]
    SqliteError { message: String },

    #[error("Database busy (another writer holds the lock)")]
    DbBusy,

    #[error("Database still locked after {attempts} attempts: {message}")]
    RetriesExhausted { attempts: u32, message: String },

    #[error("Constraint violation: {message}")]
    ConstraintViolation { message: String },

    #[error("Database corrupt: {details}")]
    DbCorrupt { details: String },

    #[error("Disk full")]
    DiskFull,

    #[error("Backup to {path} failed: {message}")]
    BackupFailed { path: String, message: String },
}

impl StorageError {
    /// Shorthand for the catch-all variant.
    pub fn sqlite(message: impl Into<String>) -> Self {
        Self::SqliteError {
            message: message.into(),
        }
    }

    /// Classify a rusqlite error by its SQLite result code.
    pub fn from_sqlite(e: &rusqlite::Error) -> Self {
        match e.sqlite_error_code() {
            Some(ErrorCode::DatabaseBusy) | Some(ErrorCode::DatabaseLocked) => Self::DbBusy,
            Some(ErrorCode::ConstraintViolation) => Self::ConstraintViolation {
                message: e.to_string(),
            },
            Some(ErrorCode::DatabaseCorrupt) | Some(ErrorCode::NotADatabase) => Self::DbCorrupt {
                details: e.to_string(),
            },
            Some(ErrorCode::DiskFull) => Self::DiskFull,
            _ => Self::sqlite(e.to_string()),
        }
    }

    /// True for lock contention that a later attempt may get past.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::DbBusy)
    }
}

impl From<rusqlite::Error> for StorageError {
    fn from(e: rusqlite::Error) -> Self {
        Self::from_sqlite(&e)
    }
}

impl FiuErrorCode for StorageError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::DbBusy => error_code::DB_BUSY,
            Self::RetriesExhausted { .. } => error_code::RETRIES_EXHAUSTED,
            Self::ConstraintViolation { .. } => error_code::CONSTRAINT_VIOLATION,
            Self::DbCorrupt { .. } => error_code::DB_CORRUPT,
            Self::DiskFull => error_code::DISK_FULL,
            Self::BackupFailed { .. } => error_code::BACKUP_FAILED,
            Self::SqliteError { .. } => error_code::STORAGE_ERROR,
        }
    }
}
