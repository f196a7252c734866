//! Object-store capability
//!
//! The pipeline reads its source file from, and publishes snapshots to, a
//! bucket/key object store. Implementations:
//! - [`LocalObjectStore`]: directory tree `root/bucket/key` for local runs
//! - [`InMemoryObjectStore`]: map-backed store for tests and demos
//! - `S3ObjectStore`: AWS S3 (feature `s3`)

use std::path::Path;

use async_trait::async_trait;

pub mod local;
pub mod memory;
#[cfg(feature = "s3")]
pub mod s3;

pub use local::LocalObjectStore;
pub use memory::InMemoryObjectStore;
#[cfg(feature = "s3")]
pub use s3::S3ObjectStore;

/// Error type for object-store operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StorageError {
    /// No object under the key
    #[error("Object not found: {bucket}/{key}")]
    NotFound { bucket: String, key: String },

    /// The store refused access
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// The store could not be reached or failed the request
    #[error("Object store unavailable: {0}")]
    Unavailable(String),

    /// The bucket or key is not acceptable to the store
    #[error("Invalid object key: {0}")]
    InvalidKey(String),

    /// Local filesystem error
    #[error("IO error: {0}")]
    Io(String),
}

/// Result type for object-store operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Bucket/key object store
#[async_trait(?Send)]
pub trait ObjectStore: Send + Sync {
    /// Write an object, replacing any previous version
    async fn put_object(&self, bucket: &str, key: &str, body: Vec<u8>) -> StorageResult<()>;

    /// Read an object
    async fn get_object(&self, bucket: &str, key: &str) -> StorageResult<Vec<u8>>;

    /// Download an object to a local file, creating parent directories
    async fn download_to(&self, bucket: &str, key: &str, path: &Path) -> StorageResult<()> {
        let body = self.get_object(bucket, key).await?;

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StorageError::Io(format!("{}: {}", parent.display(), e)))?;
        }

        tokio::fs::write(path, body)
            .await
            .map_err(|e| StorageError::Io(format!("{}: {}", path.display(), e)))
    }

    /// Store type name for logs
    fn store_type(&self) -> &'static str;
}

#[async_trait(?Send)]
impl<T: ObjectStore + ?Sized> ObjectStore for std::sync::Arc<T> {
    async fn put_object(&self, bucket: &str, key: &str, body: Vec<u8>) -> StorageResult<()> {
        (**self).put_object(bucket, key, body).await
    }

    async fn get_object(&self, bucket: &str, key: &str) -> StorageResult<Vec<u8>> {
        (**self).get_object(bucket, key).await
    }

    fn store_type(&self) -> &'static str {
        (**self).store_type()
    }
}
