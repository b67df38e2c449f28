//! Error types for the price API spider

use thiserror::Error;

use crate::error::{ErrorCode, PipelineError};

/// Result type for crawl operations
pub type CrawlResult<T> = Result<T, CrawlError>;

#[derive(Error, Debug)]
pub enum CrawlError {
    /// Transport failure or client construction failure
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success HTTP status
    #[error("request to {url} failed with status {status}")]
    Status { status: u16, url: String },

    /// The API answered with an `Error Message` document
    #[error("API error: {0}")]
    Api(String),

    /// The API answered with an `Information` notice (rate limit, premium endpoint)
    #[error("API information: {0}")]
    Information(String),

    /// The response body was not the expected time series document
    #[error("Parse error: {0}")]
    Parse(String),
}

impl CrawlError {
    pub fn parse<E: std::fmt::Display>(msg: E) -> Self {
        Self::Parse(msg.to_string())
    }
}

impl From<serde_json::Error> for CrawlError {
    fn from(err: serde_json::Error) -> Self {
        Self::parse(err)
    }
}

impl From<CrawlError> for PipelineError {
    fn from(err: CrawlError) -> Self {
        let code = match &err {
            CrawlError::Http(_) | CrawlError::Status { .. } => ErrorCode::CRAWL_HTTP_ERROR,
            CrawlError::Api(_) => ErrorCode::CRAWL_API_ERROR,
            CrawlError::Information(_) => ErrorCode::CRAWL_API_INFORMATION,
            CrawlError::Parse(_) => ErrorCode::CRAWL_PARSE_ERROR,
        };
        PipelineError::crawl_with_code(code, err.to_string()).with_source(err)
    }
}
