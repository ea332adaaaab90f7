//! Outstanding-operation counter with a drained condition.

use std::sync::{Condvar, Mutex, PoisonError};
use std::time::Duration;

/// Counts operations accepted but not yet finished (callback included).
#[derive(Default)]
pub(crate) struct PendingTracker {
    count: Mutex<usize>,
    drained: Condvar,
}

impl PendingTracker {
    pub(crate) fn add(&self) {
        *self.count.lock().unwrap_or_else(PoisonError::into_inner) += 1;
    }

    pub(crate) fn done(&self) {
        let mut count = self.count.lock().unwrap_or_else(PoisonError::into_inner);
        *count = count.saturating_sub(1);
        if *count == 0 {
            self.drained.notify_all();
        }
    }

    pub(crate) fn pending(&self) -> usize {
        *self.count.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Block until the count reaches zero. Returns false on timeout.
    pub(crate) fn wait_drained(&self, timeout: Option<Duration>) -> bool {
        let guard = self.count.lock().unwrap_or_else(PoisonError::into_inner);
        match timeout {
            None => {
                let _guard = self
                    .drained
                    .wait_while(guard, |count| *count > 0)
                    .unwrap_or_else(PoisonError::into_inner);
                true
            }
            Some(timeout) => {
                let (_guard, result) = self
                    .drained
                    .wait_timeout_while(guard, timeout, |count| *count > 0)
                    .unwrap_or_else(PoisonError::into_inner);
                !result.timed_out()
            }
        }
    }
}

/// Marks one operation done when dropped, so a panic between dequeue and
/// the end of the callback can't leave waiters hanging.
pub(crate) struct DoneGuard<'a>(pub(crate) &'a PendingTracker);

impl Drop for DoneGuard<'_> {
    fn drop(&mut self) {
        self.0.done();
    }
}
