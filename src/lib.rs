//! # stockpipe
//!
//! A scheduled stock price pipeline. Once a day it crawls the intraday prices
//! of one symbol, stores them as a Parquet partition in S3-compatible object
//! storage and renders closing price and trading volume charts next to it.
//!
//! ## Usage
//!
//! ```bash
//! stockpipe materialize [--partition 2024-11-14]
//! stockpipe schedule
//! ```
//!
//! ## Modules
//!
//! - `assets` - The crawl, data movement and data analysis assets
//! - `cli` - Argument parsing and command handlers
//! - `config` - TOML, `.env` and environment configuration
//! - `crawler` - Alpha Vantage intraday spider and CSV output
//! - `error` - Unified error type with numeric codes
//! - `frame` - Cleaning crawled rows and Parquet encoding
//! - `orchestration` - Assets, partitions, jobs, schedules and the executor
//! - `pipeline` - Wiring of the stock price definitions and resources
//! - `plot` - PNG chart rendering
//! - `storage` - Object storage backends and the bucket resource
//! - `utils` - URL building and time zone helpers
pub mod assets;
pub mod cli;
pub mod config;
pub mod crawler;
pub mod error;
pub mod frame;
pub mod orchestration;
pub mod pipeline;
pub mod plot;
pub mod storage;
pub mod utils;
