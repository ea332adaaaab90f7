//! EventDispatcher: synchronous event dispatch, free when empty.

use std::sync::Arc;

use super::handler::WriteQueueEventHandler;
use super::types::*;

/// Synchronous event dispatcher wrapping a list of handlers.
#[derive(Default, Clone)]
pub struct EventDispatcher {
    handlers: Vec<Arc<dyn WriteQueueEventHandler>>,
}

impl EventDispatcher {
    /// Create a new empty dispatcher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an event handler.
    pub fn register(&mut self, handler: Arc<dyn WriteQueueEventHandler>) {
        self.handlers.push(handler);
    }

    /// Returns the number of registered handlers.
    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    /// Emit an event to all registered handlers.
    /// A panicking handler is logged and does not stop the others.
    fn emit<F: Fn(&dyn WriteQueueEventHandler)>(&self, f: F) {
        for handler in &self.handlers {
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                f(handler.as_ref());
            }));
            if result.is_err() {
                tracing::error!("write queue event handler panicked");
            }
        }
    }

    pub fn emit_operation_succeeded(&self, event: &OperationSucceededEvent) {
        self.emit(|h| h.on_operation_succeeded(event));
    }

    pub fn emit_operation_failed(&self, event: &OperationFailedEvent) {
        self.emit(|h| h.on_operation_failed(event));
    }

    pub fn emit_operation_abandoned(&self, event: &OperationAbandonedEvent) {
        self.emit(|h| h.on_operation_abandoned(event));
    }

    pub fn emit_callback_panicked(&self, event: &CallbackPanickedEvent) {
        self.emit(|h| h.on_callback_panicked(event));
    }

    pub fn emit_worker_stopped(&self, event: &WorkerStoppedEvent) {
        self.emit(|h| h.on_worker_stopped(event));
    }

    pub fn emit_join_timeout(&self, event: &JoinTimeoutEvent) {
        self.emit(|h| h.on_join_timeout(event));
    }
}

impl std::fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("handlers", &self.handlers.len())
            .finish()
    }
}
