//! Row and parameter types shared by executors and the write queue.

pub use rusqlite::types::Value;

/// Ordered bind values for one statement.
pub type Params = Vec<Value>;

/// One result row, columns in select order.
pub type Row = Vec<Value>;

/// All rows returned by one statement.
pub type Rows = Vec<Row>;
