//! Connection management: one serialized write connection, a read pool,
//! and the retrying executor the write queue runs statements through.

pub mod pool;
pub mod pragmas;
pub mod retry;
pub mod writer;

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use fiu_core::config::DatabaseConfig;
use fiu_core::errors::StorageError;
use fiu_core::traits::DatabaseExecutor;
use fiu_core::types::{Params, Rows, Value};
use rusqlite::{Connection, DatabaseName};
use tracing::{debug, info};

use self::pool::ReadPool;
use self::pragmas::apply_pragmas;
use self::retry::RetryPolicy;
use self::writer::{run_many, run_statement, with_immediate_transaction};

/// Manages the single write connection and the read connection pool.
///
/// Every mutation in the application is expected to reach this through the
/// [`WriteQueue`](crate::queue::WriteQueue); calling the write methods
/// directly from several threads is safe but gives up submission ordering.
pub struct DatabaseManager {
    writer: Mutex<Connection>,
    readers: ReadPool,
    retry: RetryPolicy,
    path: Option<PathBuf>,
}

impl DatabaseManager {
    /// Open a database at the given path with default settings.
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        Self::open_with_config(path, &DatabaseConfig::default())
    }

    /// Open a database at the given path and apply pragmas.
    pub fn open_with_config(path: &Path, config: &DatabaseConfig) -> Result<Self, StorageError> {
        let writer = Connection::open(path).map_err(StorageError::from)?;
        apply_pragmas(&writer, config)?;

        let readers = ReadPool::open(path, config)?;
        info!(path = %path.display(), readers = readers.size(), "database opened");

        Ok(Self {
            writer: Mutex::new(writer),
            readers,
            retry: RetryPolicy::from_config(config),
            path: Some(path.to_path_buf()),
        })
    }

    /// Open an in-memory database (for testing).
    /// Readers can't share an in-memory database, so the pool is a stub.
    pub fn open_in_memory() -> Result<Self, StorageError> {
        let config = DatabaseConfig::default();
        let writer = Connection::open_in_memory().map_err(StorageError::from)?;
        apply_pragmas(&writer, &config)?;

        Ok(Self {
            writer: Mutex::new(writer),
            readers: ReadPool::open_in_memory()?,
            retry: RetryPolicy::from_config(&config),
            path: None,
        })
    }

    /// Replace the retry policy.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Execute an operation with the serialized writer connection.
    pub fn with_writer<F, T>(&self, f: F) -> Result<T, StorageError>
    where
        F: FnOnce(&Connection) -> Result<T, StorageError>,
    {
        let guard = self
            .writer
            .lock()
            .map_err(|_| StorageError::sqlite("write lock poisoned"))?;
        f(&guard)
    }

    /// Execute a read operation with a pooled read connection.
    pub fn with_reader<F, T>(&self, f: F) -> Result<T, StorageError>
    where
        F: FnOnce(&Connection) -> Result<T, StorageError>,
    {
        self.readers.with_conn(f)
    }

    /// Run one statement, backing off and retrying while the database is locked.
    pub fn execute_with_retry(
        &self,
        statement: &str,
        params: &[Value],
    ) -> Result<Rows, StorageError> {
        let rows = self
            .retry
            .run(|| self.with_writer(|conn| run_statement(conn, statement, params)))?;
        debug!(rows = rows.len(), "statement executed");
        Ok(rows)
    }

    /// Run one statement per parameter set inside a single transaction.
    /// Returns the total number of affected rows.
    pub fn execute_many(
        &self,
        statement: &str,
        param_sets: &[Params],
    ) -> Result<usize, StorageError> {
        self.retry.run(|| {
            self.with_writer(|conn| {
                with_immediate_transaction(conn, |tx| run_many(tx, statement, param_sets))
            })
        })
    }

    /// Row id of the most recent successful INSERT on the write connection.
    pub fn last_insert_id(&self) -> Result<Option<i64>, StorageError> {
        self.with_writer(|conn| {
            let id = conn.last_insert_rowid();
            Ok((id != 0).then_some(id))
        })
    }

    /// Whether a table with this name exists.
    pub fn table_exists(&self, table: &str) -> Result<bool, StorageError> {
        let rows = self.execute_with_retry(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?1",
            &[Value::Text(table.to_string())],
        )?;
        Ok(!rows.is_empty())
    }

    /// Column names of a table, in declaration order. Empty if no such table.
    pub fn table_columns(&self, table: &str) -> Result<Vec<String>, StorageError> {
        let rows = self.execute_with_retry(
            "SELECT name FROM pragma_table_info(?1) ORDER BY cid",
            &[Value::Text(table.to_string())],
        )?;
        Ok(rows
            .into_iter()
            .filter_map(|row| match row.into_iter().next() {
                Some(Value::Text(name)) => Some(name),
                _ => None,
            })
            .collect())
    }

    /// Copy the database to `dest` with SQLite's online backup API.
    pub fn backup_to(&self, dest: &Path) -> Result<(), StorageError> {
        self.with_writer(|conn| {
            conn.backup(DatabaseName::Main, dest, None)
                .map_err(|e| StorageError::BackupFailed {
                    path: dest.display().to_string(),
                    message: e.to_string(),
                })
        })?;
        info!(dest = %dest.display(), "database backup complete");
        Ok(())
    }

    /// Run a WAL checkpoint (TRUNCATE mode), e.g. before shutdown.
    pub fn checkpoint(&self) -> Result<(), StorageError> {
        self.with_writer(|conn| {
            conn.query_row("PRAGMA wal_checkpoint(TRUNCATE)", [], |_| Ok(()))
                .map_err(StorageError::from)
        })
    }

    /// Get the database file path (None for in-memory).
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

impl DatabaseExecutor for DatabaseManager {
    fn execute(&self, statement: &str, params: &[Value]) -> Result<Rows, StorageError> {
        self.execute_with_retry(statement, params)
    }
}
