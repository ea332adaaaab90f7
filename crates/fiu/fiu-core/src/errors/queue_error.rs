//! Write-queue errors.

use std::time::Duration;

use super::error_code::{self, FiuErrorCode};
use super::storage_error::StorageError;

/// Errors surfaced by the serialized write queue.
#[derive(Debug, Clone, thiserror::Error)]
pub enum QueueError {
    /// The queue was stopped; the operation was not (or will not be) executed.
    #[error("Write queue is closed")]
    Closed,

    #[error("Write queue is full ({capacity} operations pending)")]
    Full { capacity: usize },

    #[error("Invalid statement: {reason}")]
    InvalidStatement { reason: String },

    /// The wait gave up. The operation is still queued and will run.
    #[error("Write did not complete within {timeout:?}; outcome unknown")]
    Timeout { timeout: Duration },

    /// Raised by the executor, forwarded verbatim.
    #[error(transparent)]
    Execution(#[from] StorageError),

    #[error("Callback for operation #{seq} panicked: {message}")]
    CallbackPanicked { seq: u64, message: String },

    #[error("Failed to start write queue worker: {message}")]
    WorkerSpawn { message: String },
}

impl QueueError {
    /// The executor error, if this failure came from running the statement.
    pub fn as_storage(&self) -> Option<&StorageError> {
        match self {
            Self::Execution(e) => Some(e),
            _ => None,
        }
    }
}

impl FiuErrorCode for QueueError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Closed => error_code::QUEUE_CLOSED,
            Self::Full { .. } => error_code::QUEUE_FULL,
            Self::InvalidStatement { .. } => error_code::INVALID_STATEMENT,
            Self::Timeout { .. } => error_code::TIMEOUT_EXCEEDED,
            Self::Execution(e) => e.error_code(),
            Self::CallbackPanicked { .. } => error_code::CALLBACK_ERROR,
            Self::WorkerSpawn { .. } => error_code::WORKER_ERROR,
        }
    }
}
