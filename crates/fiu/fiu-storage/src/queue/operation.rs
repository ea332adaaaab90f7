//! WriteOperation: one statement, its parameters, and optional continuations.

use std::fmt;

use fiu_core::errors::QueueError;
use fiu_core::types::{Params, Rows, Value};

/// Invoked on the worker thread with the statement's result rows.
pub type SuccessCallback = Box<dyn FnOnce(Rows) + Send + 'static>;

/// Invoked on the worker thread with the captured error.
pub type FailureCallback = Box<dyn FnOnce(QueueError) + Send + 'static>;

/// A unit of work for the [`WriteQueue`](super::WriteQueue).
///
/// Built by the producer, consumed exactly once by the worker. Callbacks run
/// on the worker thread, so they should be short; a callback that blocks on
/// the same queue (for instance via `submit_and_wait`) stalls every writer
/// until its own wait times out. Calling `stop` from a callback is allowed:
/// it closes the queue and returns without waiting, and the worker finishes
/// what was already accepted.
pub struct WriteOperation {
    pub(crate) seq: u64,
    pub(crate) statement: String,
    pub(crate) params: Params,
    pub(crate) on_success: Option<SuccessCallback>,
    pub(crate) on_failure: Option<FailureCallback>,
}

impl WriteOperation {
    pub fn new(statement: impl Into<String>, params: Params) -> Self {
        Self {
            seq: 0,
            statement: statement.into(),
            params,
            on_success: None,
            on_failure: None,
        }
    }

    pub fn on_success<F>(mut self, f: F) -> Self
    where
        F: FnOnce(Rows) + Send + 'static,
    {
        self.on_success = Some(Box::new(f));
        self
    }

    pub fn on_failure<F>(mut self, f: F) -> Self
    where
        F: FnOnce(QueueError) + Send + 'static,
    {
        self.on_failure = Some(Box::new(f));
        self
    }

    pub fn statement(&self) -> &str {
        &self.statement
    }

    pub fn params(&self) -> &[Value] {
        &self.params
    }

    /// Sequence number assigned at enqueue; 0 until submitted.
    pub fn seq(&self) -> u64 {
        self.seq
    }
}

impl fmt::Debug for WriteOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WriteOperation")
            .field("seq", &self.seq)
            .field("statement", &self.statement)
            .field("params", &self.params.len())
            .field("on_success", &self.on_success.is_some())
            .field("on_failure", &self.on_failure.is_some())
            .finish()
    }
}
