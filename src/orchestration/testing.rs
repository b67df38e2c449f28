//! Fixtures shared by the orchestration tests

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;

use super::asset::{Asset, AssetKey, AssetSpec, MaterializeResult, MetadataValue};
use super::context::AssetExecutionContext;
use crate::crawler::{CrawlResult, PriceRecord, QuoteSource};
use crate::error::{PipelineError, Result};
use crate::pipeline::Resources;
use crate::storage::{BucketResource, MemoryBackend};

pub(crate) struct StubAsset {
    spec: AssetSpec,
    fail: bool,
}

impl StubAsset {
    pub(crate) fn key(name: &str) -> AssetKey {
        AssetKey::new(["test", name])
    }

    fn new(name: &str, deps: &[&str], fail: bool) -> Self {
        let spec = deps
            .iter()
            .fold(AssetSpec::new(Self::key(name)), |spec, dep| spec.with_dep(Self::key(dep)));
        Self { spec, fail }
    }

    pub(crate) fn ok(name: &str, deps: &[&str]) -> Self {
        Self::new(name, deps, false)
    }

    pub(crate) fn failing(name: &str, deps: &[&str]) -> Self {
        Self::new(name, deps, true)
    }

    pub(crate) fn into_arc(self) -> Arc<dyn Asset> {
        Arc::new(self)
    }
}

#[async_trait]
impl Asset for StubAsset {
    fn spec(&self) -> &AssetSpec {
        &self.spec
    }

    async fn materialize(&self, ctx: &AssetExecutionContext) -> Result<MaterializeResult> {
        if self.fail {
            return Err(PipelineError::asset_failed(self.spec.key.to_string(), "stub failure"));
        }
        Ok(MaterializeResult::new().with(
            "partition",
            MetadataValue::Text(ctx.partition_key.clone()),
        ))
    }
}

struct NoQuotes;

#[async_trait]
impl QuoteSource for NoQuotes {
    fn symbol(&self) -> &str {
        "TEST"
    }

    async fn fetch(&self) -> CrawlResult<Vec<PriceRecord>> {
        Ok(Vec::new())
    }
}

pub(crate) fn test_resources() -> Arc<Resources> {
    Arc::new(Resources {
        rawdata_bucket: BucketResource {
            bucket_name: "test-bucket".to_string(),
            ..BucketResource::default()
        },
        store: Arc::new(MemoryBackend::new()),
        quotes: Arc::new(NoQuotes),
        crawler_output: PathBuf::from("unused.csv"),
        lookback_days: 4,
    })
}
