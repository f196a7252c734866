//! Construction of the database and object-store handles from configuration

use tracing::info;

use super::{PipelineError, PipelineResult};
use crate::config::{DatabaseBackendType, PipelineConfig, StorageBackendType};
use crate::database::DatabaseBackend;
use crate::storage::{InMemoryObjectStore, LocalObjectStore, ObjectStore};

/// Open the configured database backend
pub async fn open_database(config: &PipelineConfig) -> PipelineResult<Box<dyn DatabaseBackend>> {
    match config.database.backend {
        DatabaseBackendType::DuckDB => open_duckdb(config),
        DatabaseBackendType::Postgres => open_postgres(config).await,
    }
}

#[cfg(feature = "duckdb-backend")]
fn open_duckdb(config: &PipelineConfig) -> PipelineResult<Box<dyn DatabaseBackend>> {
    use crate::database::DuckDBBackend;

    let backend = match config.duckdb_path() {
        Some(path) => {
            info!(path = %path.display(), "Opening DuckDB database");
            DuckDBBackend::new(&path)
        }
        None => {
            info!("Opening in-memory DuckDB database");
            DuckDBBackend::in_memory()
        }
    }
    .map_err(PipelineError::Connection)?;

    Ok(Box::new(backend))
}

#[cfg(not(feature = "duckdb-backend"))]
fn open_duckdb(_config: &PipelineConfig) -> PipelineResult<Box<dyn DatabaseBackend>> {
    Err(PipelineError::Config(
        "DuckDB backend requires the 'duckdb-backend' feature".to_string(),
    ))
}

#[cfg(feature = "postgres-backend")]
async fn open_postgres(config: &PipelineConfig) -> PipelineResult<Box<dyn DatabaseBackend>> {
    use crate::database::PostgresBackend;
    use std::time::Duration;

    let connection_string = config.postgres_connection_string().ok_or_else(|| {
        PipelineError::Config("PostgreSQL backend requires a connection string".to_string())
    })?;
    let timeout = Duration::from_secs(config.postgres.connect_timeout_secs);

    let backend = PostgresBackend::new(connection_string, timeout)
        .await
        .map_err(PipelineError::Connection)?;
    info!(
        connection = %backend.connection_string_masked(),
        "Connected to PostgreSQL"
    );

    Ok(Box::new(backend))
}

#[cfg(not(feature = "postgres-backend"))]
async fn open_postgres(_config: &PipelineConfig) -> PipelineResult<Box<dyn DatabaseBackend>> {
    Err(PipelineError::Config(
        "PostgreSQL backend requires the 'postgres-backend' feature".to_string(),
    ))
}

/// Open the configured object store
pub async fn open_object_store(config: &PipelineConfig) -> PipelineResult<Box<dyn ObjectStore>> {
    match config.storage.backend {
        StorageBackendType::Local => {
            info!(root = %config.storage.root.display(), "Using local object store");
            Ok(Box::new(LocalObjectStore::new(config.storage.root.clone())))
        }
        StorageBackendType::Memory => {
            info!("Using in-memory object store");
            Ok(Box::new(InMemoryObjectStore::new()))
        }
        StorageBackendType::S3 => open_s3(config).await,
    }
}

#[cfg(feature = "s3")]
async fn open_s3(config: &PipelineConfig) -> PipelineResult<Box<dyn ObjectStore>> {
    info!(region = ?config.storage.region, "Using S3 object store");
    Ok(Box::new(
        crate::storage::S3ObjectStore::from_env(config.storage.region.clone()).await,
    ))
}

#[cfg(not(feature = "s3"))]
async fn open_s3(_config: &PipelineConfig) -> PipelineResult<Box<dyn ObjectStore>> {
    Err(PipelineError::Config(
        "S3 object store requires the 's3' feature".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_memory_store() {
        let mut config = PipelineConfig::default();
        config.storage.backend = StorageBackendType::Memory;
        let store = open_object_store(&config).await.unwrap();
        assert_eq!(store.store_type(), "memory");
    }

    #[cfg(feature = "duckdb-backend")]
    #[tokio::test]
    async fn test_open_in_memory_duckdb() {
        let mut config = PipelineConfig::default();
        config.database.path = ":memory:".to_string();
        let db = open_database(&config).await.unwrap();
        assert_eq!(db.backend_type(), "duckdb");
        assert!(db.health_check().await.unwrap());
    }

    #[cfg(not(feature = "postgres-backend"))]
    #[tokio::test]
    async fn test_postgres_without_feature() {
        let mut config = PipelineConfig::default();
        config.database.backend = DatabaseBackendType::Postgres;
        assert!(matches!(
            open_database(&config).await,
            Err(PipelineError::Config(_))
        ));
    }
}
