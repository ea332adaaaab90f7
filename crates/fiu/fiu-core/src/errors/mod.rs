//! Error handling for the FIU report store.
//! One error enum per subsystem, `thiserror` only.

pub mod config_error;
pub mod error_code;
pub mod queue_error;
pub mod storage_error;

pub use config_error::ConfigError;
pub use error_code::FiuErrorCode;
pub use queue_error::QueueError;
pub use storage_error::StorageError;
