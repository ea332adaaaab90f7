//! PRAGMA configuration applied to every SQLite connection.
//!
//! WAL mode, NORMAL sync, in-memory temp store, foreign keys ON,
//! configurable page cache and busy timeout.

use std::time::Duration;

use fiu_core::config::DatabaseConfig;
use fiu_core::errors::StorageError;
use rusqlite::Connection;

/// Apply the write-side pragmas to a connection.
pub fn apply_pragmas(conn: &Connection, config: &DatabaseConfig) -> Result<(), StorageError> {
    conn.execute_batch(&format!(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA cache_size = {};
        PRAGMA temp_store = MEMORY;
        PRAGMA foreign_keys = ON;
        ",
        config.effective_cache_size()
    ))
    .map_err(StorageError::from)?;
    set_busy_timeout(conn, config.effective_busy_timeout())
}

/// Apply read-only pragmas to a read connection.
/// Skips write-side settings (journal_mode, synchronous).
pub fn apply_read_pragmas(conn: &Connection, config: &DatabaseConfig) -> Result<(), StorageError> {
    conn.execute_batch(&format!(
        "
        PRAGMA query_only = ON;
        PRAGMA cache_size = {};
        PRAGMA temp_store = MEMORY;
        ",
        config.effective_cache_size()
    ))
    .map_err(StorageError::from)?;
    set_busy_timeout(conn, config.effective_busy_timeout())
}

fn set_busy_timeout(conn: &Connection, timeout: Duration) -> Result<(), StorageError> {
    conn.busy_timeout(timeout).map_err(StorageError::from)
}

/// Verify that WAL mode is active on a connection.
pub fn verify_wal_mode(conn: &Connection) -> Result<bool, StorageError> {
    let mode: String = conn
        .pragma_query_value(None, "journal_mode", |row| row.get(0))
        .map_err(StorageError::from)?;
    Ok(mode.eq_ignore_ascii_case("wal"))
}
