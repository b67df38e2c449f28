//! Wiring of assets, jobs, schedules and resources into [`Definitions`]

pub mod jobs;
pub mod partitions;
pub mod resources;

use std::sync::Arc;

use crate::assets::stock_price_assets;
use crate::config::PipelineConfig;
use crate::crawler::QuoteSource;
use crate::error::Result;
use crate::orchestration::{Definitions, JobExecutor, RunLog};

pub use jobs::{daily_stock_price_job, load_jobs, load_schedules, DAILY_STOCK_PRICE_JOB};
pub use partitions::daily_partitions;
pub use resources::Resources;

/// Definitions without resources; enough to list and inspect the pipeline
pub fn build_definitions(config: &PipelineConfig) -> Result<Definitions> {
    let jobs = load_jobs(config)?;
    let schedules = load_schedules(config, &jobs)?;
    Definitions::new(stock_price_assets(), jobs, schedules)
}

/// Definitions ready to run against the live price API
pub async fn load_definitions(config: &PipelineConfig) -> Result<Definitions> {
    let resources = Resources::from_config(config).await?;
    Ok(build_definitions(config)?.with_resources(Arc::new(resources)))
}

/// Definitions ready to run, crawling from `quotes`
pub async fn load_definitions_with_quotes(
    config: &PipelineConfig,
    quotes: Arc<dyn QuoteSource>,
) -> Result<Definitions> {
    let resources = Resources::with_quotes(config, quotes).await?;
    Ok(build_definitions(config)?.with_resources(Arc::new(resources)))
}

/// Executor over `definitions` recording into the configured home directory
pub fn executor(config: &PipelineConfig, definitions: Definitions) -> Result<JobExecutor> {
    let run_log = RunLog::open(config.home_dir())?;
    Ok(JobExecutor::new(Arc::new(definitions), run_log))
}
