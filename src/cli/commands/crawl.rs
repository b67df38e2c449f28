//! `stockpipe crawl`

use anyhow::Result;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::config::{load_config, PipelineConfig};
use crate::crawler::{write_csv, StockSpider};
use crate::error::PipelineError;

/// Run the spider once, outside of any job
pub async fn run_crawl(
    config_path: Option<&Path>,
    symbol: Option<String>,
    output: Option<PathBuf>,
) -> Result<()> {
    let mut config = load_config(config_path)?;
    if let Some(symbol) = symbol {
        config.crawler.symbol = symbol;
    }
    if let Some(output) = output {
        config.crawler.output_path = output;
    }
    PipelineConfig::issues_to_result(config.crawler_issues())?;

    let spider = StockSpider::from_settings(&config.crawler).map_err(PipelineError::from)?;
    let records = spider.crawl().await.map_err(PipelineError::from)?;
    write_csv(&config.crawler.output_path, &records)?;
    info!("Spider {} finished", StockSpider::NAME);

    println!(
        "Saved {} {} records to {}",
        records.len(),
        config.crawler.symbol,
        config.crawler.output_path.display()
    );
    Ok(())
}
