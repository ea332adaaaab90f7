//! Write connection utilities: BEGIN IMMEDIATE transactions, statement execution.

use fiu_core::errors::StorageError;
use fiu_core::types::{Rows, Value};
use rusqlite::{params_from_iter, Connection, Transaction, TransactionBehavior};

/// Execute `f` inside a BEGIN IMMEDIATE transaction.
/// The write lock is taken at transaction start, so lock contention surfaces
/// as `DbBusy` before any statement runs. Dropping on error rolls back.
pub fn with_immediate_transaction<F, T>(conn: &Connection, f: F) -> Result<T, StorageError>
where
    F: FnOnce(&Transaction<'_>) -> Result<T, StorageError>,
{
    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)
        .map_err(StorageError::from)?;

    let result = f(&tx)?;

    tx.commit().map_err(StorageError::from)?;
    Ok(result)
}

/// Run one statement and collect its result set.
///
/// Statements without result columns (plain INSERT/UPDATE/DELETE) return no
/// rows. `RETURNING` clauses and SELECTs return every row in order.
pub fn run_statement(
    conn: &Connection,
    statement: &str,
    params: &[Value],
) -> Result<Rows, StorageError> {
    let mut stmt = conn.prepare_cached(statement)?;
    let columns = stmt.column_count();

    if columns == 0 {
        stmt.execute(params_from_iter(params.iter()))?;
        return Ok(Vec::new());
    }

    let mut rows = stmt.query(params_from_iter(params.iter()))?;
    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        let mut values = Vec::with_capacity(columns);
        for i in 0..columns {
            values.push(row.get::<_, Value>(i)?);
        }
        out.push(values);
    }
    Ok(out)
}

/// Run one statement once per parameter set, returning total affected rows.
pub fn run_many(
    conn: &Connection,
    statement: &str,
    param_sets: &[Vec<Value>],
) -> Result<usize, StorageError> {
    let mut stmt = conn.prepare_cached(statement)?;
    let mut affected = 0;
    for params in param_sets {
        affected += stmt.execute(params_from_iter(params.iter()))?;
    }
    Ok(affected)
}
