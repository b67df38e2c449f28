//! Jobs and schedules of the pipeline

use crate::assets::KEY_PREFIX;
use crate::config::PipelineConfig;
use crate::error::Result;
use crate::orchestration::{
    build_schedule_from_partitioned_job, define_asset_job, AssetJob, AssetSelection,
    DailyPartitionsDefinition, ScheduleDefinition,
};

use super::partitions::daily_partitions;

pub const DAILY_STOCK_PRICE_JOB: &str = "daily_alpha_vantage_stock_price_job";

/// Crawl, store and chart one day of prices
pub fn daily_stock_price_job(partitions: DailyPartitionsDefinition) -> AssetJob {
    define_asset_job(
        DAILY_STOCK_PRICE_JOB,
        AssetSelection::key_prefix(&KEY_PREFIX),
        Some(partitions),
    )
    .with_description("Daily Alpha Vantage intraday prices: crawl, store as Parquet, chart")
}

/// Every job the pipeline defines
pub fn load_jobs(config: &PipelineConfig) -> Result<Vec<AssetJob>> {
    let partitions = daily_partitions(&config.schedule)?;
    Ok(vec![daily_stock_price_job(partitions)])
}

/// A daily schedule for every partitioned job
pub fn load_schedules(config: &PipelineConfig, jobs: &[AssetJob]) -> Result<Vec<ScheduleDefinition>> {
    jobs.iter()
        .filter(|job| job.partitions.is_some())
        .map(|job| {
            build_schedule_from_partitioned_job(job, config.schedule.hour, config.schedule.minute)
                .map(|schedule| schedule.with_enabled(config.schedule.enabled))
        })
        .collect()
}
