//! Per-materialization execution context

use chrono::NaiveDate;
use std::sync::Arc;

use super::asset::AssetKey;
use crate::pipeline::Resources;

/// What an asset sees while it materializes one partition
#[derive(Clone)]
pub struct AssetExecutionContext {
    pub run_id: String,
    pub asset_key: AssetKey,
    pub partition_key: String,
    pub partition_date: NaiveDate,
    pub resources: Arc<Resources>,
}

impl AssetExecutionContext {
    pub fn resources(&self) -> &Resources {
        &self.resources
    }
}

impl std::fmt::Debug for AssetExecutionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetExecutionContext")
            .field("run_id", &self.run_id)
            .field("asset_key", &self.asset_key)
            .field("partition_key", &self.partition_key)
            .finish_non_exhaustive()
    }
}
