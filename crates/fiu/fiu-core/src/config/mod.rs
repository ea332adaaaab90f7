//! Configuration system for the FIU report store.
//! TOML-based, layered resolution: env > project > user > defaults.

pub mod database_config;
pub mod fiu_config;
pub mod queue_config;

pub use database_config::DatabaseConfig;
pub use fiu_config::FiuConfig;
pub use queue_config::QueueConfig;
