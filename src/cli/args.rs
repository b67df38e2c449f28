//! CLI argument structures

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Crawl intraday stock prices into daily Parquet partitions and chart them
#[derive(Parser)]
#[command(name = "stockpipe")]
#[command(about = "stockpipe - Scheduled stock price pipeline", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Enable verbose output (-v for debug, -vv for trace, -vvv for all)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file (default: ./stockpipe.toml if present)
    #[arg(short = 'c', long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run only the price spider and write its CSV
    Crawl {
        /// Symbol to crawl instead of the configured one
        #[arg(long)]
        symbol: Option<String>,

        /// CSV file to write instead of the configured one
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,
    },

    /// Materialize a job for one partition
    Materialize {
        /// Job to run
        #[arg(short = 'j', long, default_value = "daily_alpha_vantage_stock_price_job")]
        job: String,

        /// Partition key, e.g. 2024-11-14 (default: last complete day)
        #[arg(short = 'p', long)]
        partition: Option<String>,

        /// Only materialize these assets (e.g. alpha_vantage/stock_price/daily_crawl_alpha_vantage_stock_price)
        #[arg(short = 'a', long = "asset", value_name = "KEY")]
        assets: Vec<String>,
    },

    /// Run the scheduler until interrupted
    Schedule,

    /// List pipeline definitions
    List {
        #[command(subcommand)]
        what: ListCommands,
    },

    /// Show recorded materializations
    Status {
        /// Only show this partition
        #[arg(short = 'p', long)]
        partition: Option<String>,

        /// Number of recent runs to show
        #[arg(long, default_value = "5")]
        runs: usize,
    },

    /// Configuration commands
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum ListCommands {
    /// Assets with their dependencies
    Assets,
    /// Jobs and the assets they select
    Jobs,
    /// Schedules and their next tick
    Schedules,
    /// Partition keys of a job
    Partitions {
        /// Job whose partitions to list
        #[arg(short = 'j', long, default_value = "daily_alpha_vantage_stock_price_job")]
        job: String,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Validate the configuration and print every problem
    Check,
    /// Print the effective configuration with secrets hidden
    Show,
}
