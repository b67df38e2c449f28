//! Intraday price spider for the Alpha Vantage query API
//!
//! One crawl is one GET request for the `TIME_SERIES_INTRADAY` document of a
//! single symbol at a 1 minute interval. The whole trading day is collected so
//! later steps can analyse intraday price movement. There is no retry, paging or
//! rate-limit handling: a notice from the API fails the crawl.

pub mod csv_file;
pub mod error;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, error, info, warn};

use crate::config::CrawlerSettings;
use crate::utils::USER_AGENT;

pub use csv_file::{read_csv, write_csv, CSV_HEADER};
pub use error::{CrawlError, CrawlResult};

/// One bar of the intraday time series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceRecord {
    /// Exchange-local timestamp, `YYYY-MM-DD HH:MM:SS`
    pub time: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
    pub symbol: String,
}

/// Anything that can produce the price records for one crawl
#[async_trait]
pub trait QuoteSource: Send + Sync {
    /// Symbol this source crawls
    fn symbol(&self) -> &str;

    /// Fetch the current time series
    async fn fetch(&self) -> CrawlResult<Vec<PriceRecord>>;
}

/// Spider for the price API
pub struct StockSpider {
    client: Client,
    symbol: String,
    base_url: String,
    function: String,
    interval: String,
    api_key: String,
}

impl StockSpider {
    pub const NAME: &'static str = "alpha_vantage_stock_spider";

    /// Create a spider from crawler settings. The API key must already be resolved.
    pub fn from_settings(settings: &CrawlerSettings) -> CrawlResult<Self> {
        let api_key = settings
            .api_key
            .clone()
            .ok_or_else(|| CrawlError::Api("no API key configured (API_KEY)".to_string()))?;

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(settings.request_timeout)
            .build()?;

        Ok(Self {
            client,
            symbol: settings.symbol.clone(),
            base_url: settings.base_url.clone(),
            function: settings.function.clone(),
            interval: settings.interval.clone(),
            api_key,
        })
    }

    /// Builds the request URL with the correct parameters
    pub fn build_url(&self, symbol: &str) -> String {
        format!(
            "{}?function={}&symbol={}&interval={}&apikey={}",
            self.base_url, self.function, symbol, self.interval, self.api_key
        )
    }

    /// Issue the request and parse the response
    pub async fn crawl(&self) -> CrawlResult<Vec<PriceRecord>> {
        let url = self.build_url(&self.symbol);
        info!("Crawling {} prices for {}", self.interval, self.symbol);

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(CrawlError::Status {
                status: response.status().as_u16(),
                url: self.base_url.clone(),
            });
        }

        let body = response.text().await?;
        debug!("Received {} bytes from price API", body.len());

        parse_time_series(&body, &self.symbol, &self.interval)
    }
}

#[async_trait]
impl QuoteSource for StockSpider {
    fn symbol(&self) -> &str {
        &self.symbol
    }

    async fn fetch(&self) -> CrawlResult<Vec<PriceRecord>> {
        self.crawl().await
    }
}

/// Parse a time series document into records, oldest bar first
pub fn parse_time_series(body: &str, symbol: &str, interval: &str) -> CrawlResult<Vec<PriceRecord>> {
    let document: Value = serde_json::from_str(body)?;

    if let Some(message) = document.get("Error Message") {
        let message = value_text(message);
        error!("API Error: {}", message);
        return Err(CrawlError::Api(message));
    }

    if let Some(information) = document.get("Information") {
        let information = value_text(information);
        error!("API information: {}", information);
        return Err(CrawlError::Information(information));
    }

    let series_key = format!("Time Series ({})", interval);
    let series = match document.get(&series_key).and_then(Value::as_object) {
        Some(series) if !series.is_empty() => series,
        _ => {
            warn!("No data returned for symbol {}.", symbol);
            return Ok(Vec::new());
        }
    };

    // Timestamps are fixed-width, so lexical order is chronological order
    let ordered: BTreeMap<&String, &Value> = series.iter().collect();

    ordered
        .into_iter()
        .map(|(time, bar)| {
            Ok(PriceRecord {
                time: time.clone(),
                open: field(bar, "1. open", time)?,
                high: field(bar, "2. high", time)?,
                low: field(bar, "3. low", time)?,
                close: field(bar, "4. close", time)?,
                volume: field(bar, "5. volume", time)?,
                symbol: symbol.to_string(),
            })
        })
        .collect()
}

fn field<T>(bar: &Value, name: &str, time: &str) -> CrawlResult<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let raw = bar
        .get(name)
        .ok_or_else(|| CrawlError::parse(format!("bar {} is missing '{}'", time, name)))?;
    let text = value_text(raw);
    text.trim()
        .parse::<T>()
        .map_err(|e| CrawlError::parse(format!("bar {} has invalid '{}' ({}): {}", time, name, text, e)))
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tempfile::TempDir;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    const SERIES: &str = r#"{
        "Meta Data": {
            "1. Information": "Intraday (1min) open, high, low, close prices and volume",
            "2. Symbol": "NVDA"
        },
        "Time Series (1min)": {
            "2024-11-14 19:59:00": {
                "1. open": "146.2500",
                "2. high": "146.3000",
                "3. low": "146.2000",
                "4. close": "146.2800",
                "5. volume": "5321"
            },
            "2024-11-14 19:58:00": {
                "1. open": "146.1000",
                "2. high": "146.2600",
                "3. low": "146.0500",
                "4. close": "146.2500",
                "5. volume": "10877"
            }
        }
    }"#;

    /// Serve one canned response per connection on a local port. Returns the
    /// query URL and the raw request heads received.
    async fn price_api(status: &'static str, body: &'static str) -> (String, Arc<Mutex<Vec<String>>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let seen = requests.clone();

        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let mut head = Vec::new();
                let mut buf = [0u8; 1024];
                while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => head.extend_from_slice(&buf[..n]),
                    }
                }
                seen.lock()
                    .unwrap()
                    .push(String::from_utf8_lossy(&head).into_owned());

                let response = format!(
                    "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });

        (format!("http://{}/query", addr), requests)
    }

    fn local_spider(base_url: String) -> StockSpider {
        StockSpider::from_settings(&CrawlerSettings {
            base_url,
            ..settings()
        })
        .unwrap()
    }

    fn settings() -> CrawlerSettings {
        CrawlerSettings {
            api_key: Some("demo".to_string()),
            request_timeout: Duration::from_secs(5),
            ..CrawlerSettings::default()
        }
    }

    #[test]
    fn test_build_url() {
        let spider = StockSpider::from_settings(&settings()).unwrap();
        assert_eq!(
            spider.build_url("NVDA"),
            "https://www.alphavantage.co/query?function=TIME_SERIES_INTRADAY&symbol=NVDA&interval=1min&apikey=demo"
        );
        assert_eq!(spider.symbol(), "NVDA");
    }

    #[tokio::test]
    async fn test_crawl_sends_one_get_with_user_agent() {
        let (base_url, requests) = price_api("200 OK", SERIES).await;
        let spider = local_spider(base_url);

        let records = spider.crawl().await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].time, "2024-11-14 19:59:00");

        let requests = requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        let head = requests[0].to_lowercase();
        assert!(head.starts_with(
            "get /query?function=time_series_intraday&symbol=nvda&interval=1min&apikey=demo http/1.1\r\n"
        ));
        assert!(head.contains(&format!("user-agent: {}\r\n", USER_AGENT.to_lowercase())));
    }

    #[tokio::test]
    async fn test_crawl_maps_error_status() {
        let (base_url, requests) = price_api("500 Internal Server Error", "{}").await;
        let spider = local_spider(base_url.clone());

        match spider.fetch().await {
            Err(CrawlError::Status { status, url }) => {
                assert_eq!(status, 500);
                assert_eq!(url, base_url);
            }
            other => panic!("expected status error, got {:?}", other),
        }
        assert_eq!(requests.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_crawled_rows_survive_csv_handoff() {
        let (base_url, _requests) = price_api("200 OK", SERIES).await;
        let records = local_spider(base_url).crawl().await.unwrap();

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("alpha_vantage_stock_price.csv");
        write_csv(&path, &records).unwrap();

        assert_eq!(read_csv(&path).unwrap(), records);
    }

    #[test]
    fn test_spider_requires_api_key() {
        let settings = CrawlerSettings::default();
        assert!(matches!(
            StockSpider::from_settings(&settings),
            Err(CrawlError::Api(_))
        ));
    }

    #[test]
    fn test_parse_orders_bars_chronologically() {
        let records = parse_time_series(SERIES, "NVDA", "1min").unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].time, "2024-11-14 19:58:00");
        assert_eq!(records[0].open, 146.10);
        assert_eq!(records[0].volume, 10877);
        assert_eq!(records[1].close, 146.28);
        assert!(records.iter().all(|r| r.symbol == "NVDA"));
    }

    #[test]
    fn test_parse_error_message() {
        let body = r#"{"Error Message": "Invalid API call."}"#;
        match parse_time_series(body, "NVDA", "1min") {
            Err(CrawlError::Api(msg)) => assert_eq!(msg, "Invalid API call."),
            other => panic!("expected API error, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_information_notice() {
        let body = r#"{"Information": "Thank you for using Alpha Vantage! Our standard API rate limit is 25 requests per day."}"#;
        assert!(matches!(
            parse_time_series(body, "NVDA", "1min"),
            Err(CrawlError::Information(_))
        ));
    }

    #[test]
    fn test_parse_missing_or_empty_series_yields_no_rows() {
        let missing = r#"{"Meta Data": {}}"#;
        assert!(parse_time_series(missing, "NVDA", "1min").unwrap().is_empty());

        let empty = r#"{"Time Series (1min)": {}}"#;
        assert!(parse_time_series(empty, "NVDA", "1min").unwrap().is_empty());

        // Series for a different interval than requested
        assert!(parse_time_series(SERIES, "NVDA", "5min").unwrap().is_empty());
    }

    #[test]
    fn test_parse_rejects_malformed_numbers() {
        let body = r#"{"Time Series (1min)": {
            "2024-11-14 19:59:00": {
                "1. open": "n/a", "2. high": "1", "3. low": "1", "4. close": "1", "5. volume": "1"
            }
        }}"#;
        assert!(matches!(
            parse_time_series(body, "NVDA", "1min"),
            Err(CrawlError::Parse(_))
        ));
    }

    #[test]
    fn test_parse_rejects_non_json() {
        assert!(matches!(
            parse_time_series("<html>busy</html>", "NVDA", "1min"),
            Err(CrawlError::Parse(_))
        ));
    }
}
