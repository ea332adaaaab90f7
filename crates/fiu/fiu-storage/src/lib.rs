//! # fiu-storage
//!
//! SQLite persistence layer for the FIU report store.
//! WAL mode, a retrying executor over one write connection, a read pool,
//! and the serialized write queue every mutation goes through.

pub mod connection;
pub mod queue;

pub use connection::DatabaseManager;
pub use queue::{QueueStats, WorkerState, WriteOperation, WriteQueue};
