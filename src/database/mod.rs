//! Relational store abstraction
//!
//! This module provides the SQL-execution capability the pipeline persists
//! into. Two backends are available:
//! - DuckDB: embedded database, file-based or in-memory (default)
//! - PostgreSQL: for server deployments
//!
//! Values always travel as bound parameters. Table and column names cannot be
//! bound, so they go through [`crate::validation`] and are double-quoted.

use std::time::Instant;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::frame::{ColumnType, FrameResult, TabularFrame, Value};
use crate::validation::{IdentifierKind, ValidationError, quote_column_list, quote_identifier};

#[cfg(feature = "duckdb-backend")]
pub mod duckdb;

#[cfg(feature = "postgres-backend")]
pub mod postgres;

#[cfg(feature = "duckdb-backend")]
pub use self::duckdb::DuckDBBackend;

#[cfg(feature = "postgres-backend")]
pub use self::postgres::PostgresBackend;

/// Upper bound on bound parameters in one INSERT statement
pub const MAX_PARAMS_PER_STATEMENT: usize = 60_000;

/// Default number of rows per multi-row INSERT statement
pub const DEFAULT_INSERT_CHUNK_ROWS: usize = 500;

/// Error type for database operations
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    /// Failed to connect to database
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Transaction failed and was rolled back
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// Invalid input (identifier or statement shape)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The connection was already released
    #[error("Database connection is closed")]
    Closed,
}

impl From<ValidationError> for DatabaseError {
    fn from(err: ValidationError) -> Self {
        DatabaseError::InvalidInput(err.to_string())
    }
}

/// Result type for database operations
pub type DatabaseResult<T> = Result<T, DatabaseError>;

/// Query result set
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QueryResult {
    /// Column names
    pub columns: Vec<String>,
    /// Rows of data, positionally aligned with `columns`
    pub rows: Vec<Vec<Value>>,
    /// Execution time in milliseconds
    pub execution_time_ms: u64,
}

impl QueryResult {
    /// Create a new query result
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self {
            columns,
            rows,
            execution_time_ms: 0,
        }
    }

    /// Create an empty result
    pub fn empty() -> Self {
        Self::default()
    }

    /// Get the number of rows
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Check if the result is empty
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// First cell of the first row, if any
    pub fn scalar(&self) -> Option<&Value> {
        self.rows.first().and_then(|r| r.first())
    }

    pub(crate) fn timed(mut self, start: Instant) -> Self {
        self.execution_time_ms = start.elapsed().as_millis() as u64;
        self
    }

    /// Materialize as a frame with declared column types
    pub fn into_typed_frame(self, types: &[ColumnType]) -> FrameResult<TabularFrame> {
        let schema = self.columns.into_iter().zip(types.iter().copied()).collect();
        TabularFrame::from_typed_rows(schema, self.rows)
    }
}

/// A column as declared in the database catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    /// Column name
    pub name: String,
    /// Declared data type as reported by `information_schema`
    pub data_type: String,
}

impl ColumnInfo {
    /// Create a column description
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
        }
    }

    /// Map the declared type back onto a frame column type
    pub fn column_type(&self) -> ColumnType {
        let declared = self.data_type.to_ascii_uppercase();
        if declared.contains("INT") {
            ColumnType::Integer
        } else if ["FLOAT", "DOUBLE", "REAL", "NUMERIC", "DECIMAL"]
            .iter()
            .any(|t| declared.contains(t))
        {
            ColumnType::Float
        } else {
            ColumnType::Text
        }
    }
}

/// Database backend trait for the SQL-execution capability
///
/// All operations are async; the pipeline awaits each one before issuing the
/// next, so a backend never sees concurrent calls.
#[async_trait(?Send)]
pub trait DatabaseBackend: Send + Sync {
    /// Execute a statement that doesn't return rows
    ///
    /// # Returns
    /// Number of rows affected
    async fn execute(&self, sql: &str, params: &[Value]) -> DatabaseResult<u64>;

    /// Execute a query and return its rows
    async fn query(&self, sql: &str, params: &[Value]) -> DatabaseResult<QueryResult>;

    /// Check the catalog for a table in the current schema
    async fn table_exists(&self, name: &str) -> DatabaseResult<bool>;

    /// Declared columns of a table in the current schema, in ordinal order
    ///
    /// Returns an empty list when the table does not exist.
    async fn table_columns(&self, name: &str) -> DatabaseResult<Vec<ColumnInfo>>;

    /// Insert rows into a table in a single transaction
    ///
    /// Rows are sent as multi-row parameterized INSERT statements. Either every
    /// row is committed or none is.
    ///
    /// # Returns
    /// Number of rows inserted
    async fn insert_rows(
        &self,
        table: &str,
        columns: &[String],
        rows: &[Vec<Value>],
    ) -> DatabaseResult<u64>;

    /// Check if database is healthy and accessible
    async fn health_check(&self) -> DatabaseResult<bool>;

    /// Get the database backend type name
    fn backend_type(&self) -> &'static str;

    /// Release the connection; later calls fail with [`DatabaseError::Closed`]
    async fn close(&self) -> DatabaseResult<()>;
}

/// Rows per INSERT statement for a given column count
pub fn chunk_rows(column_count: usize) -> usize {
    if column_count == 0 {
        return DEFAULT_INSERT_CHUNK_ROWS;
    }
    (MAX_PARAMS_PER_STATEMENT / column_count).clamp(1, DEFAULT_INSERT_CHUNK_ROWS)
}

/// Build a multi-row INSERT statement for `row_count` rows
///
/// `placeholder` renders the n-th (1-based) bound parameter in the backend's
/// syntax (`?` for DuckDB, `$n` for PostgreSQL).
pub fn insert_statement(
    table: &str,
    columns: &[String],
    row_count: usize,
    placeholder: impl Fn(usize) -> String,
) -> DatabaseResult<String> {
    if columns.is_empty() {
        return Err(DatabaseError::InvalidInput(format!(
            "Cannot insert into {} without columns",
            table
        )));
    }

    let table = quote_identifier(IdentifierKind::Table, table)?;
    let column_list = quote_column_list(columns)?;

    let width = columns.len();
    let tuples: Vec<String> = (0..row_count)
        .map(|row| {
            let cells: Vec<String> = (1..=width).map(|col| placeholder(row * width + col)).collect();
            format!("({})", cells.join(", "))
        })
        .collect();

    Ok(format!(
        "INSERT INTO {} ({}) VALUES {}",
        table,
        column_list,
        tuples.join(", ")
    ))
}

/// Check that every row has one value per column
pub(crate) fn check_row_widths(columns: &[String], rows: &[Vec<Value>]) -> DatabaseResult<()> {
    match rows.iter().position(|r| r.len() != columns.len()) {
        Some(index) => Err(DatabaseError::InvalidInput(format!(
            "Row {} has {} values, expected {}",
            index,
            rows[index].len(),
            columns.len()
        ))),
        None => Ok(()),
    }
}
