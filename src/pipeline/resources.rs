//! Shared resources handed to every asset

use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use crate::config::{BackendType, PipelineConfig};
use crate::crawler::{QuoteSource, StockSpider};
use crate::error::{PipelineError, Result};
use crate::storage::{BucketResource, ObjectStore, StorageFactory};

/// Bucket name used for the memory backend when none is configured
const MEMORY_BUCKET_NAME: &str = "memory";

pub struct Resources {
    /// Where processed crawl data lands
    pub rawdata_bucket: BucketResource,
    pub store: Arc<dyn ObjectStore>,
    pub quotes: Arc<dyn QuoteSource>,
    /// CSV written by the crawl asset and read by data movement
    pub crawler_output: PathBuf,
    /// Days the analysis asset searches back for a partition
    pub lookback_days: u32,
}

impl Resources {
    /// Resources for `config` with the live price spider
    pub async fn from_config(config: &PipelineConfig) -> Result<Self> {
        PipelineConfig::issues_to_result(config.crawler_issues())?;
        let spider = StockSpider::from_settings(&config.crawler).map_err(PipelineError::from)?;
        Self::with_quotes(config, Arc::new(spider)).await
    }

    /// Resources for `config` crawling from `quotes`
    pub async fn with_quotes(config: &PipelineConfig, quotes: Arc<dyn QuoteSource>) -> Result<Self> {
        let rawdata_bucket = bucket_resource(config)?;
        let store = StorageFactory::from_config(config, &rawdata_bucket).await?;
        info!(
            "Using {} for bucket {}",
            store.describe(),
            rawdata_bucket.bucket_name
        );

        Ok(Self {
            rawdata_bucket,
            store,
            quotes,
            crawler_output: config.crawler.output_path.clone(),
            lookback_days: config.schedule.lookback_days,
        })
    }
}

fn bucket_resource(config: &PipelineConfig) -> Result<BucketResource> {
    if config.storage.backend == BackendType::Memory && config.bucket.bucket_name.is_none() {
        let mut settings = config.bucket.clone();
        settings.bucket_name = Some(MEMORY_BUCKET_NAME.to_string());
        return BucketResource::from_settings(&settings);
    }
    BucketResource::from_settings(&config.bucket)
}
