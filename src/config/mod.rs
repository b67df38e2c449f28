//! Pipeline configuration
//!
//! Configuration is layered:
//!
//! 1. Hardcoded defaults (lowest priority)
//! 2. `stockpipe.toml` in the working directory, or the file passed with `--config`
//! 3. A `.env` file in the working directory
//! 4. Process environment variables (highest priority)
//!
//! The environment variable names match the ones the deployment already uses for
//! the MinIO bucket (`MINIO_*`, `RAW_DATA_PREFIX`) and the price API (`API_KEY`).

pub mod loader;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{ErrorCode, PipelineError, Result};
use crate::utils::timezone::{IST, TIME_ZONE_ENV};

pub use loader::{load_config, DEFAULT_CONFIG_FILE};

/// Valid log levels for configuration validation.
pub const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Top-level configuration for the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PipelineConfig {
    /// Logging level used when no `-v` flag or `RUST_LOG` is given.
    #[serde(default)]
    pub log_level: Option<String>,

    /// Directory holding the run log. Defaults to `~/.stockpipe`.
    #[serde(default)]
    pub home: Option<PathBuf>,

    #[serde(default)]
    pub crawler: CrawlerSettings,

    #[serde(default)]
    pub bucket: BucketSettings,

    #[serde(default)]
    pub storage: StorageSettings,

    #[serde(default)]
    pub schedule: ScheduleSettings,
}

/// Settings for the price API spider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerSettings {
    /// Ticker symbol to crawl.
    #[serde(default = "default_symbol")]
    pub symbol: String,

    /// Query endpoint of the price API.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// API function name.
    #[serde(default = "default_function")]
    pub function: String,

    /// Bar interval requested from the API.
    #[serde(default = "default_interval")]
    pub interval: String,

    /// API key. Usually provided through `API_KEY`.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Where the crawl step writes its CSV and the movement step reads it.
    #[serde(default = "default_output_path")]
    pub output_path: PathBuf,

    #[serde(with = "humantime_serde", default = "default_request_timeout")]
    pub request_timeout: Duration,
}

/// Connection settings for the raw data bucket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BucketSettings {
    #[serde(default)]
    pub endpoint_url: Option<String>,

    #[serde(default)]
    pub access_key: Option<String>,

    #[serde(default)]
    pub secret_key: Option<String>,

    #[serde(default)]
    pub bucket_name: Option<String>,

    /// Key prefix prepended to every object key. Empty means none.
    #[serde(default)]
    pub path_prefix: String,

    #[serde(default = "default_region")]
    pub region: String,
}

/// Which object store backs the bucket.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StorageSettings {
    #[serde(default)]
    pub backend: BackendType,

    /// Root directory for the `file` backend.
    #[serde(default)]
    pub root: Option<PathBuf>,
}

/// Supported object store backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackendType {
    /// S3 compatible service such as MinIO (default).
    #[default]
    S3,
    /// Local directory tree.
    File,
    /// In-memory store (for testing).
    Memory,
}

impl std::str::FromStr for BackendType {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "s3" | "minio" => Ok(Self::S3),
            "file" | "filesystem" => Ok(Self::File),
            "memory" => Ok(Self::Memory),
            other => Err(PipelineError::config_with_code(
                ErrorCode::CONFIG_INVALID_VALUE,
                format!("unknown storage backend '{}'", other),
                Some("storage.backend".to_string()),
            )),
        }
    }
}

/// Daily partitioning and schedule settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleSettings {
    /// First partition, formatted with `partition_fmt`.
    #[serde(default = "default_start_date")]
    pub start_date: String,

    /// IANA time zone the partitions are cut in.
    #[serde(default = "default_partition_timezone")]
    pub timezone: String,

    #[serde(default = "default_partition_fmt")]
    pub partition_fmt: String,

    /// Local time of the daily tick.
    #[serde(default)]
    pub hour: u32,

    #[serde(default)]
    pub minute: u32,

    #[serde(default = "default_true")]
    pub enabled: bool,

    /// How many days back the analysis step searches for the newest data.
    #[serde(default = "default_lookback_days")]
    pub lookback_days: u32,
}

impl Default for CrawlerSettings {
    fn default() -> Self {
        Self {
            symbol: default_symbol(),
            base_url: default_base_url(),
            function: default_function(),
            interval: default_interval(),
            api_key: None,
            output_path: default_output_path(),
            request_timeout: default_request_timeout(),
        }
    }
}

impl Default for BucketSettings {
    fn default() -> Self {
        Self {
            endpoint_url: None,
            access_key: None,
            secret_key: None,
            bucket_name: None,
            path_prefix: String::new(),
            region: default_region(),
        }
    }
}

impl Default for ScheduleSettings {
    fn default() -> Self {
        Self {
            start_date: default_start_date(),
            timezone: default_partition_timezone(),
            partition_fmt: default_partition_fmt(),
            hour: 0,
            minute: 0,
            enabled: true,
            lookback_days: default_lookback_days(),
        }
    }
}

impl PipelineConfig {
    /// Merge overrides from the process environment.
    pub fn merge_env_vars(&mut self) {
        self.merge_env(|key| std::env::var(key).ok());
    }

    /// Merge overrides from an arbitrary variable lookup.
    pub fn merge_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(api_key) = get("API_KEY") {
            self.crawler.api_key = Some(api_key);
        }
        if let Some(symbol) = get("STOCKPIPE_SYMBOL") {
            self.crawler.symbol = symbol;
        }
        if let Some(endpoint) = get("MINIO_ENDPOINT_URL") {
            self.bucket.endpoint_url = Some(endpoint);
        }
        if let Some(access_key) = get("MINIO_ACCESS_KEY") {
            self.bucket.access_key = Some(access_key);
        }
        if let Some(secret_key) = get("MINIO_SECRET_KEY") {
            self.bucket.secret_key = Some(secret_key);
        }
        if let Some(bucket) = get("MINIO_DATA_BUCKET") {
            self.bucket.bucket_name = Some(bucket);
        }
        if let Some(prefix) = lookup("RAW_DATA_PREFIX") {
            self.bucket.path_prefix = prefix.trim().trim_matches('/').to_string();
        }
        if let Some(region) = get("MINIO_REGION") {
            self.bucket.region = region;
        }
        if let Some(backend) = get("STOCKPIPE_STORAGE_BACKEND") {
            match backend.parse() {
                Ok(backend) => self.storage.backend = backend,
                Err(e) => tracing::warn!("Ignoring STOCKPIPE_STORAGE_BACKEND: {}", e),
            }
        }
        if let Some(root) = get("STOCKPIPE_STORAGE_ROOT") {
            self.storage.root = Some(PathBuf::from(root));
        }
        if let Some(timezone) = get(TIME_ZONE_ENV) {
            self.schedule.timezone = timezone;
        }
        if let Some(timezone) = get("STOCKPIPE_PARTITION_TIMEZONE") {
            self.schedule.timezone = timezone;
        }
        if let Some(home) = get("STOCKPIPE_HOME") {
            self.home = Some(PathBuf::from(home));
        }
        if let Some(level) = get("STOCKPIPE_LOG_LEVEL") {
            self.log_level = Some(level);
        }
    }

    /// Directory holding the run log.
    pub fn home_dir(&self) -> PathBuf {
        self.home.clone().unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".stockpipe")
        })
    }

    /// Every problem with this configuration, in field order.
    pub fn issues(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if let Some(level) = &self.log_level {
            if !VALID_LOG_LEVELS.contains(&level.as_str()) {
                issues.push(format!(
                    "log_level: '{}' is not one of {}",
                    level,
                    VALID_LOG_LEVELS.join(", ")
                ));
            }
        }

        issues.extend(self.crawler_issues());

        if self.storage.backend == BackendType::S3 {
            let required = [
                ("bucket.endpoint_url (MINIO_ENDPOINT_URL)", &self.bucket.endpoint_url),
                ("bucket.access_key (MINIO_ACCESS_KEY)", &self.bucket.access_key),
                ("bucket.secret_key (MINIO_SECRET_KEY)", &self.bucket.secret_key),
            ];
            for (field, value) in required {
                if value.is_none() {
                    issues.push(format!("{}: required for the s3 backend", field));
                }
            }
        }
        if self.storage.backend != BackendType::Memory && self.bucket.bucket_name.is_none() {
            issues.push("bucket.bucket_name (MINIO_DATA_BUCKET): required".to_string());
        }
        if self.storage.backend == BackendType::File && self.storage.root.is_none() {
            issues.push("storage.root: required for the file backend".to_string());
        }

        if chrono::NaiveDate::parse_from_str(
            &self.schedule.start_date,
            &self.schedule.partition_fmt,
        )
        .is_err()
        {
            issues.push(format!(
                "schedule.start_date: '{}' does not match '{}'",
                self.schedule.start_date, self.schedule.partition_fmt
            ));
        }
        if self.schedule.timezone.parse::<chrono_tz::Tz>().is_err() {
            issues.push(format!(
                "schedule.timezone: unknown time zone '{}'",
                self.schedule.timezone
            ));
        }
        if self.schedule.hour > 23 || self.schedule.minute > 59 {
            issues.push(format!(
                "schedule: {:02}:{:02} is not a valid time of day",
                self.schedule.hour, self.schedule.minute
            ));
        }
        if self.schedule.lookback_days == 0 {
            issues.push("schedule.lookback_days: must be at least 1".to_string());
        }

        issues
    }

    /// Problems that prevent the spider from running.
    pub fn crawler_issues(&self) -> Vec<String> {
        let mut issues = Vec::new();
        if self.crawler.api_key.is_none() {
            issues.push("crawler.api_key (API_KEY): required".to_string());
        }
        if self.crawler.symbol.trim().is_empty() {
            issues.push("crawler.symbol: must not be empty".to_string());
        }
        if url::Url::parse(&self.crawler.base_url).is_err() {
            issues.push(format!(
                "crawler.base_url: '{}' is not a valid URL",
                self.crawler.base_url
            ));
        }
        issues
    }

    /// Fail with every accumulated issue at once.
    pub fn validate(&self) -> Result<()> {
        Self::issues_to_result(self.issues())
    }

    pub(crate) fn issues_to_result(issues: Vec<String>) -> Result<()> {
        if issues.is_empty() {
            Ok(())
        } else {
            Err(PipelineError::config_with_code(
                ErrorCode::CONFIG_VALIDATION_FAILED,
                issues.join("; "),
                None,
            ))
        }
    }
}

// Default value functions for serde
fn default_symbol() -> String {
    "NVDA".to_string()
}

fn default_base_url() -> String {
    "https://www.alphavantage.co/query".to_string()
}

fn default_function() -> String {
    "TIME_SERIES_INTRADAY".to_string()
}

fn default_interval() -> String {
    "1min".to_string()
}

fn default_output_path() -> PathBuf {
    PathBuf::from("alpha_vantage_stock_price.csv")
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_start_date() -> String {
    "2024-11-01".to_string()
}

fn default_partition_timezone() -> String {
    IST.name().to_string()
}

fn default_partition_fmt() -> String {
    "%Y-%m-%d".to_string()
}

fn default_lookback_days() -> u32 {
    4
}

fn default_true() -> bool {
    true
}
