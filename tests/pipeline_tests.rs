//! End-to-end runs of the daily stock price job against a local bucket

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

use stockpipe::assets::stock_price::{
    asset_key, CRAWL_ASSET, DATA_ANALYSIS_ASSET, DATA_MOVEMENT_ASSET,
};
use stockpipe::config::{BackendType, PipelineConfig};
use stockpipe::crawler::{CrawlError, CrawlResult, PriceRecord, QuoteSource};
use stockpipe::frame::StockFrame;
use stockpipe::orchestration::{JobExecutor, MetadataValue, RunStatus, StepStatus};
use stockpipe::pipeline::{self, DAILY_STOCK_PRICE_JOB};

const PARTITION: &str = "2024-11-14";

enum Quotes {
    Day(Vec<PriceRecord>),
    Empty,
    Rejected,
}

#[async_trait]
impl QuoteSource for Quotes {
    fn symbol(&self) -> &str {
        "NVDA"
    }

    async fn fetch(&self) -> CrawlResult<Vec<PriceRecord>> {
        match self {
            Quotes::Day(records) => Ok(records.clone()),
            Quotes::Empty => Ok(Vec::new()),
            Quotes::Rejected => Err(CrawlError::Api("Invalid API call".to_string())),
        }
    }
}

fn trading_day() -> Vec<PriceRecord> {
    ["09:30:00", "09:31:00", "09:32:00"]
        .iter()
        .enumerate()
        .map(|(i, time)| {
            let close = 140.0 + i as f64;
            PriceRecord {
                time: format!("{} {}", PARTITION, time),
                open: close - 0.5,
                high: close + 0.5,
                low: close - 1.0,
                close,
                volume: 1_000 * (i as i64 + 1),
                symbol: "NVDA".to_string(),
            }
        })
        .collect()
}

fn config(dir: &Path) -> PipelineConfig {
    let mut config = PipelineConfig::default();
    config.home = Some(dir.join("home"));
    config.crawler.api_key = Some("demo".to_string());
    config.crawler.output_path = dir.join("alpha_vantage_stock_price.csv");
    config.bucket.bucket_name = Some("raw-bucket".to_string());
    config.storage.backend = BackendType::File;
    config.storage.root = Some(dir.join("store"));
    config
}

async fn executor(dir: &Path, quotes: Quotes) -> JobExecutor {
    let config = config(dir);
    config.validate().unwrap();
    let definitions = pipeline::load_definitions_with_quotes(&config, Arc::new(quotes))
        .await
        .unwrap();
    pipeline::executor(&config, definitions).unwrap()
}

fn after_partition() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2024-11-15T12:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

fn partition_dir(dir: &Path) -> std::path::PathBuf {
    dir.join("store")
        .join("raw-bucket")
        .join("alpha_vantage_stock_price_data")
        .join(format!("date={}", PARTITION))
}

#[tokio::test]
async fn test_daily_job_materializes_every_asset() {
    let dir = TempDir::new().unwrap();
    let executor = executor(dir.path(), Quotes::Day(trading_day())).await;

    let report = executor
        .execute_at(DAILY_STOCK_PRICE_JOB, Some(PARTITION), None, after_partition())
        .await
        .unwrap();

    assert_eq!(report.status, RunStatus::Success, "{}", report.summary());
    assert_eq!(report.steps.len(), 3);
    for step in &report.steps {
        assert_eq!(step.status, StepStatus::Succeeded, "{}", report.summary());
    }

    let movement = report.step(&asset_key(DATA_MOVEMENT_ASSET)).unwrap();
    assert_eq!(movement.metadata.get("num_records"), Some(&MetadataValue::Int(3)));
    assert_eq!(
        movement.metadata.get("stock_date"),
        Some(&MetadataValue::Text(PARTITION.to_string()))
    );

    let partition = partition_dir(dir.path());
    let parquet = std::fs::read(partition.join("stock_price.parquet")).unwrap();
    let frame = StockFrame::from_parquet(parquet).unwrap();
    assert_eq!(frame.len(), 3);
    assert_eq!(frame.closes(), vec![140.0, 141.0, 142.0]);

    for chart in ["price_plot.png", "volume_plot.png"] {
        let png = std::fs::read(partition.join(chart)).unwrap();
        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
    }

    let run_log = executor.run_log().lock().unwrap();
    let analysis = run_log
        .latest(&asset_key(DATA_ANALYSIS_ASSET), PARTITION)
        .unwrap();
    assert_eq!(analysis.run_id, report.run_id);
    assert_eq!(
        analysis.metadata.get("figure_date"),
        Some(&MetadataValue::Text(PARTITION.to_string()))
    );
    assert_eq!(run_log.runs().len(), 1);
}

#[tokio::test]
async fn test_rematerializing_overwrites_the_partition() {
    let dir = TempDir::new().unwrap();
    let executor = executor(dir.path(), Quotes::Day(trading_day())).await;

    let first = executor
        .execute_at(DAILY_STOCK_PRICE_JOB, Some(PARTITION), None, after_partition())
        .await
        .unwrap();
    let second = executor
        .execute_at(DAILY_STOCK_PRICE_JOB, Some(PARTITION), None, after_partition())
        .await
        .unwrap();
    assert!(first.is_success());
    assert!(second.is_success());

    let run_log = executor.run_log().lock().unwrap();
    assert_eq!(run_log.for_partition(PARTITION).len(), 3);
    assert_eq!(
        run_log
            .latest(&asset_key(CRAWL_ASSET), PARTITION)
            .map(|record| record.run_id.clone()),
        Some(second.run_id.clone())
    );
    assert_eq!(run_log.runs().len(), 2);
}

#[tokio::test]
async fn test_rejected_crawl_skips_downstream_assets() {
    let dir = TempDir::new().unwrap();
    let executor = executor(dir.path(), Quotes::Rejected).await;

    let report = executor
        .execute_at(DAILY_STOCK_PRICE_JOB, Some(PARTITION), None, after_partition())
        .await
        .unwrap();

    assert_eq!(report.status, RunStatus::Failed);
    let crawl = report.step(&asset_key(CRAWL_ASSET)).unwrap();
    assert_eq!(crawl.status, StepStatus::Failed);
    assert!(crawl.error.as_deref().unwrap_or_default().contains("Invalid API call"));
    assert_eq!(
        report.step(&asset_key(DATA_MOVEMENT_ASSET)).unwrap().status,
        StepStatus::Skipped
    );
    assert_eq!(
        report.step(&asset_key(DATA_ANALYSIS_ASSET)).unwrap().status,
        StepStatus::Skipped
    );
    assert!(!partition_dir(dir.path()).exists());
}

#[tokio::test]
async fn test_empty_crawl_leaves_nothing_to_analyse() {
    let dir = TempDir::new().unwrap();
    let executor = executor(dir.path(), Quotes::Empty).await;

    let report = executor
        .execute_at(DAILY_STOCK_PRICE_JOB, Some(PARTITION), None, after_partition())
        .await
        .unwrap();

    let movement = report.step(&asset_key(DATA_MOVEMENT_ASSET)).unwrap();
    assert_eq!(movement.status, StepStatus::Succeeded);
    assert_eq!(movement.metadata.get("num_records"), Some(&MetadataValue::Int(0)));

    let analysis = report.step(&asset_key(DATA_ANALYSIS_ASSET)).unwrap();
    assert_eq!(analysis.status, StepStatus::Failed);
    assert_eq!(report.status, RunStatus::Failed);
}

#[tokio::test]
async fn test_analysis_alone_reads_an_earlier_partition() {
    let dir = TempDir::new().unwrap();
    let executor = executor(dir.path(), Quotes::Day(trading_day())).await;

    executor
        .execute_at(DAILY_STOCK_PRICE_JOB, Some(PARTITION), None, after_partition())
        .await
        .unwrap();

    let later = DateTime::parse_from_rfc3339("2024-11-17T12:00:00Z")
        .unwrap()
        .with_timezone(&Utc);
    let only = [asset_key(DATA_ANALYSIS_ASSET)];
    let report = executor
        .execute_at(DAILY_STOCK_PRICE_JOB, Some("2024-11-16"), Some(&only), later)
        .await
        .unwrap();

    assert!(report.is_success(), "{}", report.summary());
    assert_eq!(report.steps.len(), 1);
    assert_eq!(
        report.steps[0].metadata.get("figure_date"),
        Some(&MetadataValue::Text(PARTITION.to_string()))
    );
}
