//! Event payloads emitted by the write queue worker.

use std::time::Duration;

use crate::errors::QueueError;

#[derive(Debug, Clone)]
pub struct OperationSucceededEvent {
    pub seq: u64,
    pub row_count: usize,
    pub elapsed: Duration,
}

#[derive(Debug, Clone)]
pub struct OperationFailedEvent {
    pub seq: u64,
    pub statement: String,
    pub error: QueueError,
    /// Whether the submitter registered an `on_failure` continuation.
    pub handled: bool,
}

#[derive(Debug, Clone)]
pub struct OperationAbandonedEvent {
    pub seq: u64,
    pub statement: String,
}

#[derive(Debug, Clone)]
pub struct CallbackPanickedEvent {
    pub seq: u64,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct WorkerStoppedEvent {
    pub processed: u64,
    pub abandoned: u64,
}

#[derive(Debug, Clone)]
pub struct JoinTimeoutEvent {
    pub timeout: Duration,
    pub pending: usize,
}
