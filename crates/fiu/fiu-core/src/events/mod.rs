//! Write-queue lifecycle events and their dispatch.
//!
//! This is the injected observability hook: applications register handlers
//! to surface failures (alerting, UI notifications) in addition to the
//! `tracing` output the queue always emits.

pub mod dispatcher;
pub mod handler;
pub mod types;

pub use dispatcher::EventDispatcher;
pub use handler::WriteQueueEventHandler;
pub use types::*;
