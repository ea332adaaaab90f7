//! DatabaseExecutor: the capability the write queue runs statements through.

use std::sync::Arc;

use crate::errors::StorageError;
use crate::types::{Rows, Value};

/// Runs one statement against the database and returns its rows.
///
/// Implementations may retry transient lock errors internally and must
/// return a typed error on unrecoverable failure (syntax error, constraint
/// violation, exhausted retries). Statements that produce no result set
/// return an empty `Rows`.
pub trait DatabaseExecutor: Send + Sync {
    fn execute(&self, statement: &str, params: &[Value]) -> Result<Rows, StorageError>;
}

impl<T: DatabaseExecutor + ?Sized> DatabaseExecutor for Arc<T> {
    fn execute(&self, statement: &str, params: &[Value]) -> Result<Rows, StorageError> {
        (**self).execute(statement, params)
    }
}
