//! WriteQueueEventHandler trait, all methods with no-op defaults.

use super::types::*;

/// Trait for observing write-queue activity.
///
/// All methods have no-op default implementations, so handlers only override
/// the events they care about. Handlers are called from the worker thread
/// and must be `Send + Sync`.
pub trait WriteQueueEventHandler: Send + Sync {
    fn on_operation_succeeded(&self, _event: &OperationSucceededEvent) {}
    fn on_operation_failed(&self, _event: &OperationFailedEvent) {}
    fn on_operation_abandoned(&self, _event: &OperationAbandonedEvent) {}
    fn on_callback_panicked(&self, _event: &CallbackPanickedEvent) {}
    fn on_worker_stopped(&self, _event: &WorkerStoppedEvent) {}
    fn on_join_timeout(&self, _event: &JoinTimeoutEvent) {}
}
