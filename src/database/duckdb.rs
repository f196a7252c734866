//! DuckDB database backend implementation
//!
//! Provides an embedded database backend using DuckDB, either file-based or
//! in-memory. DuckDB accepts the MySQL-style `INT`, `FLOAT` and
//! `VARCHAR(255)` column types the schema inferrer emits.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Instant;

use async_trait::async_trait;
use duckdb::types::{ToSqlOutput, ValueRef};

use super::{
    ColumnInfo, DatabaseBackend, DatabaseError, DatabaseResult, QueryResult, check_row_widths,
    chunk_rows, insert_statement,
};
use crate::frame::Value;

impl duckdb::ToSql for Value {
    fn to_sql(&self) -> duckdb::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Null => ToSqlOutput::Owned(duckdb::types::Value::Null),
            Value::Int(i) => ToSqlOutput::Owned(duckdb::types::Value::BigInt(*i)),
            Value::Float(f) => ToSqlOutput::Owned(duckdb::types::Value::Double(*f)),
            Value::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
        })
    }
}

/// DuckDB database backend
///
/// The connection lives behind a mutex and is taken out on [`close`], after
/// which every call fails with [`DatabaseError::Closed`].
///
/// [`close`]: DatabaseBackend::close
pub struct DuckDBBackend {
    /// Path to the database file (None for in-memory)
    db_path: Option<PathBuf>,
    /// DuckDB connection, None once closed
    connection: Mutex<Option<duckdb::Connection>>,
}

impl DuckDBBackend {
    /// Create a new DuckDB backend with a file-based database
    ///
    /// # Arguments
    /// * `db_path` - Path to the DuckDB database file
    pub fn new(db_path: impl AsRef<Path>) -> DatabaseResult<Self> {
        let path = db_path.as_ref().to_path_buf();
        let connection = duckdb::Connection::open(&path).map_err(|e| {
            DatabaseError::ConnectionFailed(format!("Failed to open DuckDB: {}", e))
        })?;

        Ok(Self {
            db_path: Some(path),
            connection: Mutex::new(Some(connection)),
        })
    }

    /// Create an in-memory DuckDB backend
    ///
    /// Useful for testing or one-off runs where persistence is not needed.
    pub fn in_memory() -> DatabaseResult<Self> {
        let connection = duckdb::Connection::open_in_memory().map_err(|e| {
            DatabaseError::ConnectionFailed(format!("Failed to create in-memory DuckDB: {}", e))
        })?;

        Ok(Self {
            db_path: None,
            connection: Mutex::new(Some(connection)),
        })
    }

    /// Get the database file path (None for in-memory)
    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    /// Check if this is an in-memory database
    pub fn is_in_memory(&self) -> bool {
        self.db_path.is_none()
    }

    fn lock(&self) -> DatabaseResult<MutexGuard<'_, Option<duckdb::Connection>>> {
        self.connection
            .lock()
            .map_err(|e| DatabaseError::ConnectionFailed(format!("Lock error: {}", e)))
    }

    /// Convert a DuckDB ValueRef to a frame value
    fn value_from_ref(value: ValueRef<'_>) -> Value {
        match value {
            ValueRef::Null => Value::Null,
            ValueRef::Boolean(b) => Value::Int(i64::from(b)),
            ValueRef::TinyInt(i) => Value::Int(i.into()),
            ValueRef::SmallInt(i) => Value::Int(i.into()),
            ValueRef::Int(i) => Value::Int(i.into()),
            ValueRef::BigInt(i) => Value::Int(i),
            ValueRef::HugeInt(i) => i64::try_from(i)
                .map(Value::Int)
                .unwrap_or_else(|_| Value::Text(i.to_string())),
            ValueRef::UTinyInt(i) => Value::Int(i.into()),
            ValueRef::USmallInt(i) => Value::Int(i.into()),
            ValueRef::UInt(i) => Value::Int(i.into()),
            ValueRef::UBigInt(i) => i64::try_from(i)
                .map(Value::Int)
                .unwrap_or_else(|_| Value::Text(i.to_string())),
            // FLOAT is single precision; read back the shortest decimal form
            ValueRef::Float(f) => Value::from(f.to_string().parse::<f64>().unwrap_or(f as f64)),
            ValueRef::Double(f) => Value::from(f),
            ValueRef::Decimal(d) => d
                .to_string()
                .parse::<f64>()
                .map(Value::from)
                .unwrap_or_else(|_| Value::Text(d.to_string())),
            ValueRef::Text(bytes) => Value::Text(String::from_utf8_lossy(bytes).into_owned()),
            other => Value::Text(format!("{:?}", other)),
        }
    }

    fn run_query(
        conn: &duckdb::Connection,
        sql: &str,
        params: &[Value],
    ) -> DatabaseResult<QueryResult> {
        let mut stmt = conn
            .prepare(sql)
            .map_err(|e| DatabaseError::QueryFailed(format!("Prepare failed: {}", e)))?;

        let param_refs: Vec<&dyn duckdb::ToSql> =
            params.iter().map(|p| p as &dyn duckdb::ToSql).collect();

        // Columns are only known once the statement has run
        let mut result_rows = stmt
            .query(param_refs.as_slice())
            .map_err(|e| DatabaseError::QueryFailed(format!("Query failed: {}", e)))?;

        let column_count = result_rows.as_ref().map(|r| r.column_count()).unwrap_or(0);
        let columns: Vec<String> = (0..column_count)
            .map(|i| {
                result_rows
                    .as_ref()
                    .and_then(|r| r.column_name(i).ok())
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| format!("col{}", i))
            })
            .collect();

        let mut rows = Vec::new();
        while let Some(row) = result_rows
            .next()
            .map_err(|e| DatabaseError::QueryFailed(format!("Row fetch error: {}", e)))?
        {
            let values = (0..column_count)
                .map(|i| {
                    row.get_ref(i)
                        .map(Self::value_from_ref)
                        .unwrap_or(Value::Null)
                })
                .collect();
            rows.push(values);
        }

        Ok(QueryResult::new(columns, rows))
    }
}

#[async_trait(?Send)]
impl DatabaseBackend for DuckDBBackend {
    async fn execute(&self, sql: &str, params: &[Value]) -> DatabaseResult<u64> {
        let guard = self.lock()?;
        let conn = guard.as_ref().ok_or(DatabaseError::Closed)?;

        let param_refs: Vec<&dyn duckdb::ToSql> =
            params.iter().map(|p| p as &dyn duckdb::ToSql).collect();

        conn.execute(sql, param_refs.as_slice())
            .map(|n| n as u64)
            .map_err(|e| DatabaseError::QueryFailed(format!("Execute failed: {}", e)))
    }

    async fn query(&self, sql: &str, params: &[Value]) -> DatabaseResult<QueryResult> {
        let start = Instant::now();
        let guard = self.lock()?;
        let conn = guard.as_ref().ok_or(DatabaseError::Closed)?;

        Ok(Self::run_query(conn, sql, params)?.timed(start))
    }

    async fn table_exists(&self, name: &str) -> DatabaseResult<bool> {
        let result = self
            .query(
                "SELECT COUNT(*) FROM information_schema.tables \
                 WHERE table_schema = current_schema() AND table_name = ?",
                &[Value::from(name)],
            )
            .await?;

        Ok(result
            .scalar()
            .and_then(Value::as_f64)
            .is_some_and(|count| count > 0.0))
    }

    async fn table_columns(&self, name: &str) -> DatabaseResult<Vec<ColumnInfo>> {
        let result = self
            .query(
                "SELECT column_name, data_type FROM information_schema.columns \
                 WHERE table_schema = current_schema() AND table_name = ? \
                 ORDER BY ordinal_position",
                &[Value::from(name)],
            )
            .await?;

        Ok(result
            .rows
            .iter()
            .filter_map(|row| match (row.first(), row.get(1)) {
                (Some(Value::Text(column)), Some(Value::Text(data_type))) => {
                    Some(ColumnInfo::new(column.as_str(), data_type.as_str()))
                }
                _ => None,
            })
            .collect())
    }

    async fn insert_rows(
        &self,
        table: &str,
        columns: &[String],
        rows: &[Vec<Value>],
    ) -> DatabaseResult<u64> {
        check_row_widths(columns, rows)?;
        if rows.is_empty() {
            return Ok(0);
        }

        let mut guard = self.lock()?;
        let conn = guard.as_mut().ok_or(DatabaseError::Closed)?;

        let tx = conn.transaction().map_err(|e| {
            DatabaseError::TransactionFailed(format!("Failed to begin transaction: {}", e))
        })?;

        let mut inserted = 0u64;
        for chunk in rows.chunks(chunk_rows(columns.len())) {
            let sql = insert_statement(table, columns, chunk.len(), |_| "?".to_string())?;
            let param_refs: Vec<&dyn duckdb::ToSql> = chunk
                .iter()
                .flatten()
                .map(|p| p as &dyn duckdb::ToSql)
                .collect();

            // Dropping the transaction on error rolls it back
            inserted += tx
                .execute(&sql, param_refs.as_slice())
                .map_err(|e| DatabaseError::TransactionFailed(format!("Insert failed: {}", e)))?
                as u64;
        }

        tx.commit().map_err(|e| {
            DatabaseError::TransactionFailed(format!("Failed to commit transaction: {}", e))
        })?;

        Ok(inserted)
    }

    async fn health_check(&self) -> DatabaseResult<bool> {
        let result = self.query("SELECT 1 as healthy", &[]).await?;
        Ok(!result.rows.is_empty())
    }

    fn backend_type(&self) -> &'static str {
        "duckdb"
    }

    async fn close(&self) -> DatabaseResult<()> {
        let connection = self.lock()?.take();
        match connection {
            Some(conn) => conn.close().map_err(|(_, e)| {
                DatabaseError::ConnectionFailed(format!("Failed to close DuckDB: {}", e))
            }),
            None => Ok(()),
        }
    }
}
