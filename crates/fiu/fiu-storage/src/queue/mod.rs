//! Serialized write queue: many producers, one writer thread.

pub mod operation;
mod tracker;
pub mod write_queue;

pub use operation::{FailureCallback, SuccessCallback, WriteOperation};
pub use write_queue::{QueueStats, WorkerState, WriteQueue};
