//! `stockpipe config ...`

use anyhow::Result;
use std::path::Path;

use crate::config::{load_config, PipelineConfig};

const HIDDEN: &str = "********";

/// Print every configuration problem; fails when there is any
pub fn run_config_check(config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;
    let issues = config.issues();

    if issues.is_empty() {
        println!("Configuration is valid");
        return Ok(());
    }

    println!("Found {} configuration problem(s):", issues.len());
    for issue in &issues {
        println!("  - {}", issue);
    }
    PipelineConfig::issues_to_result(issues)?;
    Ok(())
}

pub fn run_config_show(config_path: Option<&Path>) -> Result<()> {
    let mut config = load_config(config_path)?;
    if config.crawler.api_key.is_some() {
        config.crawler.api_key = Some(HIDDEN.to_string());
    }
    if config.bucket.secret_key.is_some() {
        config.bucket.secret_key = Some(HIDDEN.to_string());
    }
    print!("{}", toml::to_string_pretty(&config)?);
    Ok(())
}
