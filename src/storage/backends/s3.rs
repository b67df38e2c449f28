//! S3 storage backend implementation
//!
//! Works against AWS S3 and S3-compatible services such as MinIO. A custom
//! endpoint switches the client to path-style addressing, which MinIO expects.

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use std::sync::Arc;
use tracing::{debug, info};

use crate::storage::bucket::BucketResource;
use crate::storage::{
    error::{StorageError, StorageResult},
    traits::{validate_key, ObjectStore},
};

/// S3 storage backend
pub struct S3Backend {
    client: Arc<Client>,
    bucket: String,
    endpoint: Option<String>,
}

impl S3Backend {
    /// Create a new S3 backend and check that the bucket is reachable
    pub async fn new(resource: &BucketResource, region: &str) -> StorageResult<Self> {
        info!("Initializing S3 backend for bucket {}", resource.bucket_name);

        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.to_string()));
        if !resource.access_key.is_empty() {
            loader = loader.credentials_provider(Credentials::new(
                resource.access_key.clone(),
                resource.secret_key.clone(),
                None,
                None,
                "stockpipe",
            ));
        }
        if !resource.endpoint_url.is_empty() {
            loader = loader.endpoint_url(resource.endpoint_url.clone());
        }
        let sdk_config = loader.load().await;

        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(!resource.endpoint_url.is_empty())
            .build();
        let client = Client::from_conf(s3_config);

        client
            .head_bucket()
            .bucket(&resource.bucket_name)
            .send()
            .await
            .map_err(|e| StorageError::connection(format!("Failed to access S3 bucket: {}", e)))?;

        Ok(Self {
            client: Arc::new(client),
            bucket: resource.bucket_name.clone(),
            endpoint: (!resource.endpoint_url.is_empty()).then(|| resource.endpoint_url.clone()),
        })
    }
}

#[async_trait]
impl ObjectStore for S3Backend {
    async fn put(&self, key: &str, body: Vec<u8>) -> StorageResult<()> {
        validate_key(key)?;
        debug!("Uploading s3://{}/{} ({} bytes)", self.bucket, key, body.len());

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| StorageError::backend(format!("Failed to upload {}: {}", key, e)))?;

        Ok(())
    }

    async fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        validate_key(key)?;
        debug!("Downloading s3://{}/{}", self.bucket, key);

        match self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(output) => {
                let bytes = output
                    .body
                    .collect()
                    .await
                    .map_err(|e| StorageError::backend(format!("Failed to read {}: {}", key, e)))?
                    .into_bytes();
                Ok(Some(bytes.to_vec()))
            }
            Err(e) if e.as_service_error().is_some_and(|se| se.is_no_such_key()) => Ok(None),
            Err(e) => Err(StorageError::backend(format!(
                "Failed to download {}: {}",
                key, e
            ))),
        }
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        validate_key(key)?;

        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(e) if e.as_service_error().is_some_and(|se| se.is_not_found()) => Ok(false),
            Err(e) => Err(StorageError::backend(format!("Failed to stat {}: {}", key, e))),
        }
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        validate_key(key)?;

        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| StorageError::backend(format!("Failed to delete {}: {}", key, e)))?;

        Ok(())
    }

    async fn list(&self, prefix: &str) -> StorageResult<Vec<String>> {
        let mut keys = Vec::new();
        let mut continuation: Option<String> = None;

        loop {
            let output = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(prefix)
                .set_continuation_token(continuation.take())
                .send()
                .await
                .map_err(|e| StorageError::backend(format!("Failed to list {}: {}", prefix, e)))?;

            keys.extend(
                output
                    .contents()
                    .iter()
                    .filter_map(|object| object.key().map(str::to_string)),
            );

            match output.next_continuation_token() {
                Some(token) if output.is_truncated().unwrap_or(false) => {
                    continuation = Some(token.to_string());
                }
                _ => break,
            }
        }

        keys.sort();
        Ok(keys)
    }

    fn describe(&self) -> String {
        match &self.endpoint {
            Some(endpoint) => format!("s3://{} via {}", self.bucket, endpoint),
            None => format!("s3://{}", self.bucket),
        }
    }
}
