//! Crawl, store and chart one day of intraday prices
//!
//! The three assets run in sequence. The crawl writes a CSV on local disk, data
//! movement turns it into a Parquet partition in the bucket, and analysis
//! charts the newest partition it can find.

use async_trait::async_trait;
use chrono::{Days, NaiveDate};
use tracing::{error, info, warn};

use super::{DATA_DIR, KEY_PREFIX, STOCK_PRICE_GROUP};
use crate::crawler::{read_csv, write_csv};
use crate::error::{ErrorCode, PipelineError, Result};
use crate::frame::{StockFrame, STOCK_DATE_FMT};
use crate::orchestration::{
    Asset, AssetExecutionContext, AssetKey, AssetSpec, MaterializeResult, MetadataValue,
};
use crate::plot::{render_price_chart, render_volume_chart};
use crate::storage::{BucketResource, ObjectStore};

pub const CRAWL_ASSET: &str = "daily_crawl_alpha_vantage_stock_price";
pub const DATA_MOVEMENT_ASSET: &str = "daily_data_movement_alpha_vantage_stock_price";
pub const DATA_ANALYSIS_ASSET: &str = "daily_data_analysis_alpha_vantage_stock_price";

pub const PARQUET_FILE: &str = "stock_price.parquet";
pub const PRICE_PLOT_FILE: &str = "price_plot.png";
pub const VOLUME_PLOT_FILE: &str = "volume_plot.png";

/// Rows shown in the Markdown preview
const PREVIEW_ROWS: usize = 5;

pub fn asset_key(name: &str) -> AssetKey {
    AssetKey::with_prefix(&KEY_PREFIX, name)
}

fn spec(name: &str, compute_kind: &str) -> AssetSpec {
    AssetSpec::new(asset_key(name))
        .with_compute_kind(compute_kind)
        .with_group(STOCK_PRICE_GROUP)
}

/// Key parts of a file inside a day's partition directory
fn partition_parts(date: &str, file: &'static str) -> [String; 3] {
    [DATA_DIR.to_string(), format!("date={}", date), file.to_string()]
}

async fn upload(
    store: &dyn ObjectStore,
    bucket: &BucketResource,
    date: &str,
    file: &'static str,
    body: Vec<u8>,
) -> Result<String> {
    let parts = partition_parts(date, file);
    let parts: Vec<&str> = parts.iter().map(String::as_str).collect();
    let uri = bucket.build_uri(&parts, None)?;
    store.put(&bucket.object_key(&parts), body).await?;
    Ok(uri)
}

/// Runs the price spider and saves the readings as CSV
pub struct DailyCrawl {
    spec: AssetSpec,
}

impl DailyCrawl {
    pub fn new() -> Self {
        Self {
            spec: spec(CRAWL_ASSET, "Crawl")
                .with_description("Intraday prices of the configured symbol, saved as CSV"),
        }
    }
}

impl Default for DailyCrawl {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Asset for DailyCrawl {
    fn spec(&self) -> &AssetSpec {
        &self.spec
    }

    async fn materialize(&self, ctx: &AssetExecutionContext) -> Result<MaterializeResult> {
        let resources = ctx.resources();
        let records = resources.quotes.fetch().await.map_err(|e| {
            error!("Error running spider for {}: {}", resources.quotes.symbol(), e);
            PipelineError::from(e)
        })?;

        write_csv(&resources.crawler_output, &records)?;
        info!(
            "Spider completed. {} records saved to {}",
            records.len(),
            resources.crawler_output.display()
        );

        Ok(MaterializeResult::new()
            .with("num_records", MetadataValue::Int(records.len() as i64))
            .with(
                "csv_path",
                MetadataValue::Text(resources.crawler_output.display().to_string()),
            )
            .with(
                "symbol",
                MetadataValue::Text(resources.quotes.symbol().to_string()),
            ))
    }
}

/// Cleans the crawled CSV and stores it as a daily Parquet partition
pub struct DailyDataMovement {
    spec: AssetSpec,
}

impl DailyDataMovement {
    pub fn new() -> Self {
        Self {
            spec: spec(DATA_MOVEMENT_ASSET, "Data Movement")
                .with_dep(asset_key(CRAWL_ASSET))
                .with_description("Crawled prices as Parquet, partitioned by trading date"),
        }
    }
}

impl Default for DailyDataMovement {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Asset for DailyDataMovement {
    fn spec(&self) -> &AssetSpec {
        &self.spec
    }

    async fn materialize(&self, ctx: &AssetExecutionContext) -> Result<MaterializeResult> {
        let resources = ctx.resources();
        let records = read_csv(&resources.crawler_output)?;

        if records.is_empty() {
            info!("Empty dataframe found");
            return Ok(MaterializeResult::new()
                .with("num_records", MetadataValue::Int(0))
                .with(
                    "preview",
                    MetadataValue::Markdown(StockFrame::default().preview_markdown(PREVIEW_ROWS)),
                ));
        }

        let frame = StockFrame::clean(&records)?;
        let stock_date = frame
            .partition_date()
            .ok_or_else(|| PipelineError::data_with_code(ErrorCode::DATA_EMPTY, "no rows to store"))?
            .to_string();
        if stock_date != ctx.partition_key {
            warn!(
                "Crawled data is for {} while partition {} is running",
                stock_date, ctx.partition_key
            );
        }

        let uri = upload(
            resources.store.as_ref(),
            &resources.rawdata_bucket,
            &stock_date,
            PARQUET_FILE,
            frame.to_parquet()?,
        )
        .await?;
        info!("Inserted dataframe into object storage: {}", uri);

        Ok(MaterializeResult::new()
            .with("minio_key", MetadataValue::Url(uri))
            .with("num_records", MetadataValue::Int(frame.len() as i64))
            .with("stock_date", MetadataValue::Text(stock_date))
            .with(
                "preview",
                MetadataValue::Markdown(frame.preview_markdown(PREVIEW_ROWS)),
            ))
    }
}

/// Charts the newest stored partition
pub struct DailyDataAnalysis {
    spec: AssetSpec,
}

impl DailyDataAnalysis {
    pub fn new() -> Self {
        Self {
            spec: spec(DATA_ANALYSIS_ASSET, "Data Analysis")
                .with_dep(asset_key(DATA_MOVEMENT_ASSET))
                .with_description("Closing price and trading volume charts of the newest partition"),
        }
    }

    /// Walk back from the day after `partition_date` for the newest non-empty partition.
    async fn find_latest(
        store: &dyn ObjectStore,
        bucket: &BucketResource,
        partition_date: NaiveDate,
        lookback_days: u32,
    ) -> Option<StockFrame> {
        let anchor = partition_date.checked_add_days(Days::new(1))?;

        for i in 1..=u64::from(lookback_days) {
            let Some(date) = anchor.checked_sub_days(Days::new(i)) else {
                break;
            };
            let date = date.format(STOCK_DATE_FMT).to_string();
            let parts = partition_parts(&date, PARQUET_FILE);
            let parts: Vec<&str> = parts.iter().map(String::as_str).collect();
            let key = bucket.object_key(&parts);

            match store.get(&key).await {
                Ok(Some(bytes)) => match StockFrame::from_parquet(bytes) {
                    Ok(frame) if !frame.is_empty() => return Some(frame),
                    Ok(_) => error!("Error file on {} has no rows: {}", date, key),
                    Err(e) => error!("Error file on {} is unreadable: {}", date, e),
                },
                Ok(None) => error!("Error file not found on {}: {}", date, key),
                Err(e) => error!("Error reading file on {}: {}", date, e),
            }
        }
        None
    }
}

impl Default for DailyDataAnalysis {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Asset for DailyDataAnalysis {
    fn spec(&self) -> &AssetSpec {
        &self.spec
    }

    async fn materialize(&self, ctx: &AssetExecutionContext) -> Result<MaterializeResult> {
        let resources = ctx.resources();
        let store = resources.store.as_ref();
        let bucket = &resources.rawdata_bucket;

        let frame = Self::find_latest(store, bucket, ctx.partition_date, resources.lookback_days)
            .await
            .ok_or_else(|| {
                PipelineError::data_with_code(
                    ErrorCode::DATA_EMPTY,
                    format!(
                        "no stock price partition in the {} days up to {}",
                        resources.lookback_days, ctx.partition_key
                    ),
                )
            })?;

        // A non-empty frame always has a first row
        let figure_date = frame.partition_date().unwrap_or_default().to_string();
        let symbol = frame.symbol().unwrap_or_default().to_string();

        let price_png = render_price_chart(&symbol, &figure_date, &frame.closes())?;
        let price_uri = upload(store, bucket, &figure_date, PRICE_PLOT_FILE, price_png).await?;
        info!("Inserted price plot into object storage: {}", price_uri);

        let volume_png = render_volume_chart(&symbol, &figure_date, &frame.volumes())?;
        let volume_uri = upload(store, bucket, &figure_date, VOLUME_PLOT_FILE, volume_png).await?;
        info!("Inserted volume plot into object storage: {}", volume_uri);

        Ok(MaterializeResult::new()
            .with("figure_date", MetadataValue::Text(figure_date))
            .with("symbol", MetadataValue::Text(symbol))
            .with("num_records", MetadataValue::Int(frame.len() as i64))
            .with("price_plot", MetadataValue::Url(price_uri))
            .with("volume_plot", MetadataValue::Url(volume_uri)))
    }
}
