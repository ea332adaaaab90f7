//! Trait seams between the write queue and its collaborators.

pub mod executor;

pub use executor::DatabaseExecutor;
