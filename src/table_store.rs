//! Idempotent persistence of frames as relational tables
//!
//! A table's existence is the idempotency key: tables are created and
//! populated once, and never overwritten or appended to afterwards.

use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::database::{DatabaseBackend, DatabaseError};
use crate::frame::{ColumnType, FrameError, TabularFrame};
use crate::identity::TableIdentity;
use crate::schema::RelationalSchema;
use crate::validation::{IdentifierKind, ValidationError, quote_identifier};

/// Error type for table store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A table or column name failed the identifier allow-list
    #[error("Invalid identifier for {table}: {source}")]
    InvalidIdentifier {
        table: String,
        source: ValidationError,
    },

    /// A frame without columns has no table shape
    #[error("Cannot create {0} from a frame without columns")]
    NoColumns(String),

    /// The database rejected a statement
    #[error("Database error on {table}: {source}")]
    Database {
        table: String,
        source: DatabaseError,
    },

    /// The table is absent from the catalog
    #[error("Table not found: {0}")]
    NotFound(String),

    /// Fetched rows could not be materialized
    #[error("Failed to materialize {table}: {source}")]
    Frame { table: String, source: FrameError },
}

/// Result type for table store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// What `ensure_table` did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TableStatus {
    Created,
    AlreadyExists,
}

/// What `persist` did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PersistOutcome {
    /// Table created and populated
    Created { rows: usize },
    /// Table was already present; nothing written
    AlreadyExists,
}

/// Relational persistence over a database backend
pub struct TableStore<'a> {
    db: &'a dyn DatabaseBackend,
}

impl<'a> TableStore<'a> {
    /// Create a store over a backend
    pub fn new(db: &'a dyn DatabaseBackend) -> Self {
        Self { db }
    }

    fn log_failure(err: StoreError) -> StoreError {
        error!("{}", err);
        err
    }

    /// Check the catalog for the table
    ///
    /// Fails open: any error is logged and reported as absent.
    pub async fn exists(&self, identity: &TableIdentity) -> bool {
        let name = identity.name();
        match self.db.table_exists(&name).await {
            Ok(exists) => {
                debug!(table = %name, exists, "Checked table existence");
                exists
            }
            Err(e) => {
                warn!(table = %name, "Existence check failed, assuming absent: {}", e);
                false
            }
        }
    }

    /// Create the table from the frame's inferred schema unless it exists
    pub async fn ensure_table(
        &self,
        identity: &TableIdentity,
        frame: &TabularFrame,
    ) -> StoreResult<TableStatus> {
        if self.exists(identity).await {
            debug!(table = %identity, "Table already exists");
            return Ok(TableStatus::AlreadyExists);
        }

        let name = identity.name();
        let schema = RelationalSchema::infer(frame);
        if schema.is_empty() {
            return Err(Self::log_failure(StoreError::NoColumns(name.clone())));
        }

        let sql = schema
            .create_table_sql(identity)
            .map_err(|source| {
                Self::log_failure(StoreError::InvalidIdentifier {
                    table: name.clone(),
                    source,
                })
            })?;

        self.db.execute(&sql, &[]).await.map_err(|source| {
            Self::log_failure(StoreError::Database {
                table: name.clone(),
                source,
            })
        })?;

        info!(table = %name, columns = schema.len(), "Created table");
        Ok(TableStatus::Created)
    }

    /// Insert every row of the frame in one all-or-nothing transaction
    pub async fn bulk_insert(
        &self,
        identity: &TableIdentity,
        frame: &TabularFrame,
    ) -> StoreResult<usize> {
        let name = identity.name();
        let columns: Vec<String> = frame
            .column_names()
            .into_iter()
            .map(str::to_string)
            .collect();
        let rows: Vec<_> = frame.rows().collect();

        let inserted = self
            .db
            .insert_rows(&name, &columns, &rows)
            .await
            .map_err(|source| {
                Self::log_failure(StoreError::Database {
                    table: name.clone(),
                    source,
                })
            })?;

        info!(table = %name, rows = inserted, "Inserted rows");
        Ok(inserted as usize)
    }

    /// Read the whole table back as a frame, typed by its declared columns
    pub async fn fetch(&self, identity: &TableIdentity) -> StoreResult<TabularFrame> {
        let name = identity.name();
        let database_error = |source: DatabaseError| {
            Self::log_failure(StoreError::Database {
                table: name.clone(),
                source,
            })
        };

        let declared = self
            .db
            .table_columns(&name)
            .await
            .map_err(database_error)?;
        if declared.is_empty() {
            return Err(Self::log_failure(StoreError::NotFound(name.clone())));
        }

        let table = quote_identifier(IdentifierKind::Table, &name).map_err(|source| {
            Self::log_failure(StoreError::InvalidIdentifier {
                table: name.clone(),
                source,
            })
        })?;
        let result = self
            .db
            .query(&format!("SELECT * FROM {}", table), &[])
            .await
            .map_err(database_error)?;

        let types: Vec<ColumnType> = result
            .columns
            .iter()
            .map(|column| {
                declared
                    .iter()
                    .find(|c| &c.name == column)
                    .map(|c| c.column_type())
                    .unwrap_or(ColumnType::Text)
            })
            .collect();

        let frame = result.into_typed_frame(&types).map_err(|source| {
            Self::log_failure(StoreError::Frame {
                table: name.clone(),
                source,
            })
        })?;

        info!(table = %name, rows = frame.row_count(), "Fetched table");
        Ok(frame)
    }

    /// Create, then populate, only if absent
    pub async fn persist(
        &self,
        identity: &TableIdentity,
        frame: &TabularFrame,
    ) -> StoreResult<PersistOutcome> {
        match self.ensure_table(identity, frame).await? {
            TableStatus::AlreadyExists => Ok(PersistOutcome::AlreadyExists),
            TableStatus::Created => {
                let rows = self.bulk_insert(identity, frame).await?;
                Ok(PersistOutcome::Created { rows })
            }
        }
    }
}
