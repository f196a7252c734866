//! AWS S3 object store

use async_trait::async_trait;
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::primitives::ByteStream;

use super::{ObjectStore, StorageError, StorageResult};

/// Object store backed by an S3 client
#[derive(Debug, Clone)]
pub struct S3ObjectStore {
    client: aws_sdk_s3::Client,
}

impl S3ObjectStore {
    /// Build a client from the default AWS credential chain
    ///
    /// `region` overrides the region the chain would pick.
    pub async fn from_env(region: Option<String>) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
        if let Some(region) = region {
            loader = loader.region(aws_config::Region::new(region));
        }
        let config = loader.load().await;

        Self {
            client: aws_sdk_s3::Client::new(&config),
        }
    }
}

fn classify<E>(err: SdkError<E>, bucket: &str, key: &str) -> StorageError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
{
    match err.code() {
        Some("NoSuchKey") | Some("NoSuchBucket") | Some("NotFound") => StorageError::NotFound {
            bucket: bucket.to_string(),
            key: key.to_string(),
        },
        Some("AccessDenied") | Some("Forbidden") | Some("InvalidAccessKeyId") => {
            StorageError::PermissionDenied(format!(
                "{}/{}: {}",
                bucket,
                key,
                DisplayErrorContext(&err)
            ))
        }
        _ => StorageError::Unavailable(format!("{}/{}: {}", bucket, key, DisplayErrorContext(&err))),
    }
}

#[async_trait(?Send)]
impl ObjectStore for S3ObjectStore {
    async fn put_object(&self, bucket: &str, key: &str, body: Vec<u8>) -> StorageResult<()> {
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| classify(e, bucket, key))?;
        Ok(())
    }

    async fn get_object(&self, bucket: &str, key: &str) -> StorageResult<Vec<u8>> {
        let output = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| classify(e, bucket, key))?;

        let data = output
            .body
            .collect()
            .await
            .map_err(|e| StorageError::Unavailable(format!("{}/{}: {}", bucket, key, e)))?;

        Ok(data.into_bytes().to_vec())
    }

    fn store_type(&self) -> &'static str {
        "s3"
    }
}
