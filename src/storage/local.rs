//! Filesystem-backed object store

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;

use super::{ObjectStore, StorageError, StorageResult};

/// Object store laid out as `root/bucket/key` on the local filesystem
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    /// Create a store rooted at a directory
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Filesystem path of an object
    ///
    /// Keys must be relative and may not step out of the bucket.
    pub fn object_path(&self, bucket: &str, key: &str) -> StorageResult<PathBuf> {
        for part in [bucket, key] {
            let path = Path::new(part);
            let safe = !part.is_empty()
                && path
                    .components()
                    .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
            if !safe {
                return Err(StorageError::InvalidKey(format!("{}/{}", bucket, key)));
            }
        }
        Ok(self.root.join(bucket).join(key))
    }
}

fn io_error(err: std::io::Error, bucket: &str, key: &str) -> StorageError {
    match err.kind() {
        ErrorKind::NotFound => StorageError::NotFound {
            bucket: bucket.to_string(),
            key: key.to_string(),
        },
        ErrorKind::PermissionDenied => {
            StorageError::PermissionDenied(format!("{}/{}: {}", bucket, key, err))
        }
        _ => StorageError::Io(format!("{}/{}: {}", bucket, key, err)),
    }
}

#[async_trait(?Send)]
impl ObjectStore for LocalObjectStore {
    async fn put_object(&self, bucket: &str, key: &str, body: Vec<u8>) -> StorageResult<()> {
        let path = self.object_path(bucket, key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| io_error(e, bucket, key))?;
        }
        tokio::fs::write(&path, body)
            .await
            .map_err(|e| io_error(e, bucket, key))
    }

    async fn get_object(&self, bucket: &str, key: &str) -> StorageResult<Vec<u8>> {
        let path = self.object_path(bucket, key)?;
        tokio::fs::read(&path)
            .await
            .map_err(|e| io_error(e, bucket, key))
    }

    fn store_type(&self) -> &'static str {
        "local"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_put_and_get() {
        let dir = TempDir::new().unwrap();
        let store = LocalObjectStore::new(dir.path());

        store
            .put_object("etl", "processed_data/Base_DropNa.csv", b"a\n1\n".to_vec())
            .await
            .unwrap();

        assert!(dir.path().join("etl/processed_data/Base_DropNa.csv").exists());
        assert_eq!(
            store
                .get_object("etl", "processed_data/Base_DropNa.csv")
                .await
                .unwrap(),
            b"a\n1\n"
        );
    }

    #[tokio::test]
    async fn test_put_overwrites() {
        let dir = TempDir::new().unwrap();
        let store = LocalObjectStore::new(dir.path());

        store.put_object("etl", "k.csv", b"old".to_vec()).await.unwrap();
        store.put_object("etl", "k.csv", b"new".to_vec()).await.unwrap();
        assert_eq!(store.get_object("etl", "k.csv").await.unwrap(), b"new");
    }

    #[tokio::test]
    async fn test_missing_object() {
        let dir = TempDir::new().unwrap();
        let store = LocalObjectStore::new(dir.path());
        assert!(matches!(
            store.get_object("etl", "missing.csv").await,
            Err(StorageError::NotFound { .. })
        ));
    }

    #[test]
    fn test_rejects_escaping_keys() {
        let store = LocalObjectStore::new("/tmp/store");
        assert!(store.object_path("etl", "../secret").is_err());
        assert!(store.object_path("etl", "/etc/passwd").is_err());
        assert!(store.object_path("", "key").is_err());
        assert_eq!(
            store.object_path("etl", "original_data/T.csv").unwrap(),
            PathBuf::from("/tmp/store/etl/original_data/T.csv")
        );
    }
}
