//! # fiu-core
//!
//! Foundation crate for the FIU report store.
//! Defines the shared types, the executor trait, errors, config, queue events,
//! and tracing setup. `fiu-storage` depends on this.

pub mod config;
pub mod errors;
pub mod events;
pub mod tracing;
pub mod traits;
pub mod types;

// Re-export the most commonly used types at the crate root.
pub use config::FiuConfig;
pub use errors::error_code::FiuErrorCode;
pub use events::dispatcher::EventDispatcher;
pub use events::handler::WriteQueueEventHandler;
pub use traits::DatabaseExecutor;
pub use types::{Params, Row, Rows};
