//! Storage factory for creating object stores from configuration

use std::sync::Arc;
use tracing::info;

use super::backends::{FileBackend, MemoryBackend};
#[cfg(feature = "s3")]
use super::backends::S3Backend;
use super::bucket::BucketResource;
use super::error::{StorageError, StorageResult};
use super::traits::ObjectStore;
use crate::config::{BackendType, PipelineConfig};

/// Factory for creating object stores
pub struct StorageFactory;

impl StorageFactory {
    /// Create the store backing `bucket` as selected by the configuration
    pub async fn from_config(
        config: &PipelineConfig,
        bucket: &BucketResource,
    ) -> StorageResult<Arc<dyn ObjectStore>> {
        let store: Arc<dyn ObjectStore> = match config.storage.backend {
            BackendType::Memory => Arc::new(MemoryBackend::new()),
            BackendType::File => {
                let root = config.storage.root.as_ref().ok_or_else(|| {
                    StorageError::configuration("storage.root is required for the file backend")
                })?;
                Arc::new(FileBackend::new(root.join(&bucket.bucket_name)))
            }
            #[cfg(feature = "s3")]
            BackendType::S3 => Arc::new(S3Backend::new(bucket, &config.bucket.region).await?),
            #[cfg(not(feature = "s3"))]
            BackendType::S3 => {
                return Err(StorageError::configuration(
                    "S3 backend not enabled. Enable with --features s3",
                ))
            }
        };

        info!("Using object store {}", store.describe());
        Ok(store)
    }
}
