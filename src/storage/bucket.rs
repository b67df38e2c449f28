//! The raw data bucket resource

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config::BucketSettings;
use crate::error::{ErrorCode, PipelineError, Result};
use crate::utils::build_url;

/// Default URI scheme used when reporting object locations
pub const DEFAULT_PROTOCOL: &str = "s3a";

/// An S3 bucket that stores processed crawl data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketResource {
    /// S3 endpoint URL; empty means the AWS default
    pub endpoint_url: String,
    pub access_key: String,
    #[serde(skip_serializing)]
    pub secret_key: String,
    pub bucket_name: String,
    /// Prepended to every key; empty means none
    pub path_prefix: String,
}

impl BucketResource {
    pub fn from_settings(settings: &BucketSettings) -> Result<Self> {
        let bucket_name = settings.bucket_name.clone().ok_or_else(|| {
            PipelineError::config_with_code(
                ErrorCode::CONFIG_MISSING_REQUIRED,
                "bucket name is not configured (MINIO_DATA_BUCKET)",
                Some("bucket.bucket_name".to_string()),
            )
        })?;

        Ok(Self {
            endpoint_url: settings.endpoint_url.clone().unwrap_or_default(),
            access_key: settings.access_key.clone().unwrap_or_default(),
            secret_key: settings.secret_key.clone().unwrap_or_default(),
            bucket_name,
            path_prefix: settings.path_prefix.trim_matches('/').to_string(),
        })
    }

    /// Connection options in the shape object-store clients take them
    pub fn storage_options(&self) -> BTreeMap<&'static str, String> {
        BTreeMap::from([
            ("endpoint_url", self.endpoint_url.clone()),
            ("key", self.access_key.clone()),
            ("secret", self.secret_key.clone()),
        ])
    }

    /// Key parts with the path prefix in front
    fn prefixed<'a>(&'a self, parts: &[&'a str]) -> Vec<&'a str> {
        let mut all = Vec::with_capacity(parts.len() + 1);
        if !self.path_prefix.is_empty() {
            all.push(self.path_prefix.as_str());
        }
        all.extend_from_slice(parts);
        all
    }

    /// Object key inside the bucket for the given key parts
    pub fn object_key(&self, parts: &[&str]) -> String {
        self.prefixed(parts).join("/")
    }

    /// Complete bucket URI of the given key parts, e.g.
    /// `s3a://bucket/prefix/alpha_vantage_stock_price_data/date=2024-11-14/stock_price.parquet`
    pub fn build_uri(&self, parts: &[&str], protocol: Option<&str>) -> Result<String> {
        let parts = self.prefixed(parts);
        build_url(
            protocol.unwrap_or(DEFAULT_PROTOCOL),
            &self.bucket_name,
            &parts,
            &[],
        )
        .map_err(|e| {
            PipelineError::config_with_code(
                ErrorCode::CONFIG_INVALID_VALUE,
                format!("cannot build URI for bucket {}: {}", self.bucket_name, e),
                Some("bucket.bucket_name".to_string()),
            )
        })
    }
}
