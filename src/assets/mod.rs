//! Asset definitions of the pipeline

pub mod stock_price;

use std::sync::Arc;

use crate::orchestration::Asset;

pub use stock_price::{DailyCrawl, DailyDataAnalysis, DailyDataMovement};

/// Key prefix shared by the stock price assets
pub const KEY_PREFIX: [&str; 2] = ["alpha_vantage", "stock_price"];

pub const STOCK_PRICE_GROUP: &str = "stock_price";

/// Directory of the stock price partitions inside the bucket
pub const DATA_DIR: &str = "alpha_vantage_stock_price_data";

pub fn stock_price_assets() -> Vec<Arc<dyn Asset>> {
    vec![
        Arc::new(DailyCrawl::new()),
        Arc::new(DailyDataMovement::new()),
        Arc::new(DailyDataAnalysis::new()),
    ]
}
