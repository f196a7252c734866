//! ETL Pipeline - batch transformation of a tabular dataset
//!
//! Provides:
//! - Tabular frames with typed columns and CSV ingestion/serialization
//! - Relational persistence with idempotent create-and-populate
//! - Eight catalog transforms derived from one base table
//! - Publishing of snapshots to an object store
//! - Backup of the project's own files as a zip archive
//!
//! A run ingests a CSV, bootstraps the base table, fetches it back, and
//! for every transform persists and publishes a derived table named
//! `{table}_{Suffix}`.

pub mod archive;
pub mod config;
pub mod database;
pub mod frame;
pub mod identity;
pub mod pipeline;
pub mod publisher;
pub mod schema;
pub mod storage;
pub mod table_store;
pub mod transform;
pub mod validation;

pub use archive::{BackupConfig, BackupReport, build_archive, upload_backup};
pub use config::{PipelineConfig, sample_config};
pub use database::{DatabaseBackend, DatabaseError, DatabaseResult, QueryResult};
#[cfg(feature = "duckdb-backend")]
pub use database::DuckDBBackend;
#[cfg(feature = "postgres-backend")]
pub use database::PostgresBackend;
pub use frame::{Column, ColumnType, FrameError, TabularFrame, Value, read_csv, to_csv_bytes};
pub use identity::TableIdentity;
pub use pipeline::{
    ArtifactReport, IngestSource, Pipeline, PipelineError, PipelineState, PublishOutcome,
    RunSummary, TableOutcome,
};
pub use publisher::{ArtifactFolder, ArtifactPublisher, PublishError};
pub use schema::{RelationalSchema, SqlType};
#[cfg(feature = "s3")]
pub use storage::S3ObjectStore;
pub use storage::{InMemoryObjectStore, LocalObjectStore, ObjectStore, StorageError};
pub use table_store::{PersistOutcome, StoreError, TableStatus, TableStore};
pub use transform::{TransformCatalog, TransformConfig, TransformError, TransformKind};
