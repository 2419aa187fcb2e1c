//! S3 object store client

use crate::error::{Result, TrailError};
use crate::provider::{ObjectListing, ObjectStore};
use async_trait::async_trait;
use aws_sdk_s3::error::DisplayErrorContext;
use bytes::Bytes;

/// `ObjectStore` backed by S3
pub struct S3Store {
    client: aws_sdk_s3::Client,
}

impl S3Store {
    pub fn new(sdk_config: &aws_config::SdkConfig) -> Self {
        Self {
            client: aws_sdk_s3::Client::new(sdk_config),
        }
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn get(&self, bucket: &str, key: &str) -> Result<Bytes> {
        let read_err = |reason: String| TrailError::StorageRead {
            bucket: bucket.to_string(),
            key: key.to_string(),
            reason,
        };

        let output = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| read_err(DisplayErrorContext(&e).to_string()))?;

        let body = output
            .body
            .collect()
            .await
            .map_err(|e| read_err(format!("body read failed: {}", e)))?;

        Ok(body.into_bytes())
    }

    async fn list(
        &self,
        bucket: &str,
        prefix: &str,
        continuation: Option<&str>,
    ) -> Result<ObjectListing> {
        let mut request = self.client.list_objects_v2().bucket(bucket).prefix(prefix);
        if let Some(token) = continuation {
            request = request.continuation_token(token);
        }

        let output = request.send().await.map_err(|e| TrailError::List {
            bucket: bucket.to_string(),
            prefix: prefix.to_string(),
            reason: DisplayErrorContext(&e).to_string(),
        })?;

        let keys = output
            .contents()
            .iter()
            .filter_map(|o| o.key().map(str::to_string))
            .collect();

        let next_continuation = if output.is_truncated().unwrap_or(false) {
            output.next_continuation_token().map(str::to_string)
        } else {
            None
        };

        Ok(ObjectListing {
            keys,
            next_continuation,
        })
    }
}
