//! Best-effort publishing of frames as CSV objects

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::frame::{FrameError, TabularFrame, to_csv_bytes};
use crate::storage::{ObjectStore, StorageError};

/// Folder a snapshot is published under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactFolder {
    /// Base table snapshots
    OriginalData,
    /// Derived table snapshots
    ProcessedData,
}

impl ArtifactFolder {
    /// Folder name used as the key prefix
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactFolder::OriginalData => "original_data",
            ArtifactFolder::ProcessedData => "processed_data",
        }
    }

    /// Object key of a file in this folder
    pub fn key(&self, file_name: &str) -> String {
        format!("{}/{}", self.as_str(), file_name)
    }
}

impl fmt::Display for ArtifactFolder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error type for publishing
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PublishError {
    /// The frame could not be serialized
    #[error("Failed to serialize {key}: {source}")]
    Serialize { key: String, source: FrameError },

    /// The object store rejected the write
    #[error("Failed to upload {key}: {source}")]
    Upload { key: String, source: StorageError },
}

/// Writes frames to an object store bucket as CSV
pub struct ArtifactPublisher<'a> {
    store: &'a dyn ObjectStore,
    bucket: &'a str,
}

impl<'a> ArtifactPublisher<'a> {
    /// Create a publisher for a bucket
    pub fn new(store: &'a dyn ObjectStore, bucket: &'a str) -> Self {
        Self { store, bucket }
    }

    /// Serialize `frame` and write it to `folder/file_name`
    ///
    /// Republishing overwrites the previous object. A failure is logged once
    /// and returned; it never affects other work.
    pub async fn publish(
        &self,
        frame: &TabularFrame,
        file_name: &str,
        folder: ArtifactFolder,
    ) -> Result<String, PublishError> {
        let key = folder.key(file_name);

        let result = match to_csv_bytes(frame) {
            Ok(body) => {
                let size = body.len();
                self.store
                    .put_object(self.bucket, &key, body)
                    .await
                    .map(|()| size)
                    .map_err(|source| PublishError::Upload {
                        key: key.clone(),
                        source,
                    })
            }
            Err(source) => Err(PublishError::Serialize {
                key: key.clone(),
                source,
            }),
        };

        match result {
            Ok(bytes) => {
                info!(bucket = self.bucket, key = %key, bytes, "Published artifact");
                Ok(key)
            }
            Err(e) => {
                error!(bucket = self.bucket, key = %key, "Publish failed: {}", e);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::read_csv;
    use crate::storage::{InMemoryObjectStore, StorageResult};
    use async_trait::async_trait;

    struct UnreachableStore;

    #[async_trait(?Send)]
    impl ObjectStore for UnreachableStore {
        async fn put_object(&self, _bucket: &str, _key: &str, _body: Vec<u8>) -> StorageResult<()> {
            Err(StorageError::Unavailable("connection refused".to_string()))
        }

        async fn get_object(&self, _bucket: &str, _key: &str) -> StorageResult<Vec<u8>> {
            Err(StorageError::Unavailable("connection refused".to_string()))
        }

        fn store_type(&self) -> &'static str {
            "unreachable"
        }
    }

    #[test]
    fn test_folder_keys() {
        assert_eq!(
            ArtifactFolder::OriginalData.key("Titanic.csv"),
            "original_data/Titanic.csv"
        );
        assert_eq!(
            ArtifactFolder::ProcessedData.key("Titanic_Pivot.csv"),
            "processed_data/Titanic_Pivot.csv"
        );
    }

    #[tokio::test]
    async fn test_publish_writes_csv() {
        let store = InMemoryObjectStore::new();
        let publisher = ArtifactPublisher::new(&store, "etl");
        let frame = read_csv("id,age\n1,22\n2,\n".as_bytes()).unwrap();

        let key = publisher
            .publish(&frame, "Base_DropNa.csv", ArtifactFolder::ProcessedData)
            .await
            .unwrap();

        assert_eq!(key, "processed_data/Base_DropNa.csv");
        assert_eq!(store.object("etl", &key).unwrap(), b"id,age\n1,22\n2,\n");
    }

    #[tokio::test]
    async fn test_publish_failure_is_returned() {
        let store = UnreachableStore;
        let publisher = ArtifactPublisher::new(&store, "etl");
        let frame = read_csv("id\n1\n".as_bytes()).unwrap();

        let err = publisher
            .publish(&frame, "Base.csv", ArtifactFolder::OriginalData)
            .await
            .unwrap_err();
        assert!(matches!(err, PublishError::Upload { ref key, .. } if key == "original_data/Base.csv"));
    }
}
