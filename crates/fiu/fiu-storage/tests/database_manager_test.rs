//! DatabaseManager against real on-disk SQLite files.

use std::thread;
use std::time::{Duration, Instant};

use fiu_core::config::DatabaseConfig;
use fiu_core::errors::StorageError;
use fiu_core::types::Value;
use fiu_storage::connection::pragmas::verify_wal_mode;
use fiu_storage::connection::retry::RetryPolicy;
use fiu_storage::DatabaseManager;
use rusqlite::Connection;

const SCHEMA: &str = "CREATE TABLE reports (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    sn TEXT NOT NULL UNIQUE,
    status TEXT NOT NULL DEFAULT 'Open'
)";

fn open_with_schema(dir: &tempfile::TempDir) -> DatabaseManager {
    let db = DatabaseManager::open(&dir.path().join("fiu.db")).unwrap();
    db.execute_with_retry(SCHEMA, &[]).unwrap();
    db
}

fn text(s: &str) -> Value {
    Value::Text(s.to_string())
}

// ═══════════════════════════════════════════════════════════════════════════
// Setup
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn open_enables_wal_and_read_pool() {
    let dir = tempfile::tempdir().unwrap();
    let db = open_with_schema(&dir);

    assert!(db.with_writer(verify_wal_mode).unwrap());
    assert_eq!(db.path(), Some(dir.path().join("fiu.db").as_path()));

    let foreign_keys: i64 = db
        .with_writer(|conn| {
            conn.query_row("PRAGMA foreign_keys", [], |r| r.get(0))
                .map_err(StorageError::from)
        })
        .unwrap();
    assert_eq!(foreign_keys, 1);
}

#[test]
fn read_pool_sees_committed_writes_and_refuses_writes() {
    let dir = tempfile::tempdir().unwrap();
    let db = open_with_schema(&dir);
    db.execute_with_retry("INSERT INTO reports (sn) VALUES (?1)", &[text("R-1")])
        .unwrap();

    let count: i64 = db
        .with_reader(|conn| {
            conn.query_row("SELECT COUNT(*) FROM reports", [], |r| r.get(0))
                .map_err(StorageError::from)
        })
        .unwrap();
    assert_eq!(count, 1);

    let write = db.with_reader(|conn| {
        conn.execute("DELETE FROM reports", [])
            .map_err(StorageError::from)
    });
    assert!(write.is_err());
}

#[test]
fn in_memory_database_works_for_writes() {
    let db = DatabaseManager::open_in_memory().unwrap();
    db.execute_with_retry(SCHEMA, &[]).unwrap();
    assert!(db.table_exists("reports").unwrap());
    assert_eq!(db.path(), None);
}

// ═══════════════════════════════════════════════════════════════════════════
// Statements
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn plain_insert_returns_no_rows_and_sets_last_insert_id() {
    let dir = tempfile::tempdir().unwrap();
    let db = open_with_schema(&dir);
    assert_eq!(db.last_insert_id().unwrap(), None);

    let rows = db
        .execute_with_retry("INSERT INTO reports (sn) VALUES (?1)", &[text("R-1")])
        .unwrap();
    assert!(rows.is_empty());
    assert_eq!(db.last_insert_id().unwrap(), Some(1));
}

#[test]
fn returning_clause_yields_rows() {
    let dir = tempfile::tempdir().unwrap();
    let db = open_with_schema(&dir);

    let rows = db
        .execute_with_retry(
            "INSERT INTO reports (sn, status) VALUES (?1, ?2) RETURNING id, status",
            &[text("R-9"), text("Under Review")],
        )
        .unwrap();
    assert_eq!(rows, vec![vec![Value::Integer(1), text("Under Review")]]);
}

#[test]
fn constraint_violation_is_classified() {
    let dir = tempfile::tempdir().unwrap();
    let db = open_with_schema(&dir);
    db.execute_with_retry("INSERT INTO reports (sn) VALUES (?1)", &[text("dup")])
        .unwrap();

    let err = db
        .execute_with_retry("INSERT INTO reports (sn) VALUES (?1)", &[text("dup")])
        .unwrap_err();
    assert!(
        matches!(err, StorageError::ConstraintViolation { .. }),
        "got: {err:?}"
    );
}

#[test]
fn syntax_error_is_not_retried() {
    let dir = tempfile::tempdir().unwrap();
    let db = open_with_schema(&dir);
    let started = Instant::now();
    let err = db.execute_with_retry("INSERT INTO nowhere VALUES (1)", &[]).unwrap_err();
    assert!(matches!(err, StorageError::SqliteError { .. }), "got: {err:?}");
    assert!(started.elapsed() < Duration::from_millis(400));
}

#[test]
fn execute_many_runs_in_one_transaction() {
    let dir = tempfile::tempdir().unwrap();
    let db = open_with_schema(&dir);

    let sets: Vec<_> = (0..50).map(|i| vec![text(&format!("R-{i}"))]).collect();
    let affected = db
        .execute_many("INSERT INTO reports (sn) VALUES (?1)", &sets)
        .unwrap();
    assert_eq!(affected, 50);

    // A duplicate in the batch rolls back the whole batch.
    let bad = vec![vec![text("new-1")], vec![text("R-3")]];
    assert!(db
        .execute_many("INSERT INTO reports (sn) VALUES (?1)", &bad)
        .is_err());
    let rows = db
        .execute_with_retry("SELECT COUNT(*) FROM reports", &[])
        .unwrap();
    assert_eq!(rows, vec![vec![Value::Integer(50)]]);
}

#[test]
fn table_introspection() {
    let dir = tempfile::tempdir().unwrap();
    let db = open_with_schema(&dir);

    assert!(db.table_exists("reports").unwrap());
    assert!(!db.table_exists("missing").unwrap());
    assert_eq!(db.table_columns("reports").unwrap(), vec!["id", "sn", "status"]);
    assert!(db.table_columns("missing").unwrap().is_empty());
}

// ═══════════════════════════════════════════════════════════════════════════
// Lock contention
// ═══════════════════════════════════════════════════════════════════════════

fn no_wait_config() -> DatabaseConfig {
    DatabaseConfig {
        busy_timeout_ms: Some(0),
        ..DatabaseConfig::default()
    }
}

#[test]
fn busy_database_is_retried_until_lock_is_released() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fiu.db");
    let db = DatabaseManager::open_with_config(&path, &no_wait_config())
        .unwrap()
        .with_retry_policy(RetryPolicy {
            max_attempts: 5,
            base_delay: Duration::from_millis(40),
        });
    db.execute_with_retry(SCHEMA, &[]).unwrap();

    let holder = Connection::open(&path).unwrap();
    holder.execute_batch("BEGIN IMMEDIATE").unwrap();
    let release = thread::spawn(move || {
        thread::sleep(Duration::from_millis(60));
        holder.execute_batch("COMMIT").unwrap();
    });

    db.execute_with_retry("INSERT INTO reports (sn) VALUES (?1)", &[text("late")])
        .unwrap();
    release.join().unwrap();
    assert!(db.table_exists("reports").unwrap());
    assert_eq!(db.last_insert_id().unwrap(), Some(1));
}

#[test]
fn busy_database_exhausts_retries() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fiu.db");
    let db = DatabaseManager::open_with_config(&path, &no_wait_config())
        .unwrap()
        .with_retry_policy(RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(5),
        });
    db.execute_with_retry(SCHEMA, &[]).unwrap();

    let holder = Connection::open(&path).unwrap();
    holder.execute_batch("BEGIN IMMEDIATE").unwrap();

    let err = db
        .execute_with_retry("INSERT INTO reports (sn) VALUES (?1)", &[text("x")])
        .unwrap_err();
    assert!(
        matches!(err, StorageError::RetriesExhausted { attempts: 3, .. }),
        "got: {err:?}"
    );
    holder.execute_batch("ROLLBACK").unwrap();
}

// ═══════════════════════════════════════════════════════════════════════════
// Backup & checkpoint
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn backup_copies_committed_data() {
    let dir = tempfile::tempdir().unwrap();
    let db = open_with_schema(&dir);
    for i in 0..5 {
        db.execute_with_retry("INSERT INTO reports (sn) VALUES (?1)", &[text(&format!("R-{i}"))])
            .unwrap();
    }

    let dest = dir.path().join("backup.db");
    db.backup_to(&dest).unwrap();

    let copy = Connection::open(&dest).unwrap();
    let count: i64 = copy
        .query_row("SELECT COUNT(*) FROM reports", [], |r| r.get(0))
        .unwrap();
    assert_eq!(count, 5);
}

#[test]
fn backup_to_unwritable_path_fails() {
    let dir = tempfile::tempdir().unwrap();
    let db = open_with_schema(&dir);
    let dest = dir.path().join("no/such/dir/backup.db");

    let err = db.backup_to(&dest).unwrap_err();
    assert!(matches!(err, StorageError::BackupFailed { .. }), "got: {err:?}");
}

#[test]
fn checkpoint_succeeds_after_writes() {
    let dir = tempfile::tempdir().unwrap();
    let db = open_with_schema(&dir);
    db.execute_with_retry("INSERT INTO reports (sn) VALUES (?1)", &[text("R-1")])
        .unwrap();
    db.checkpoint().unwrap();
}
