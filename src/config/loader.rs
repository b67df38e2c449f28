use std::fs;
use std::path::Path;
use tracing::debug;

use super::PipelineConfig;
use crate::error::{ErrorCode, PipelineError, Result};

/// Config file picked up from the working directory when `--config` is absent
pub const DEFAULT_CONFIG_FILE: &str = "stockpipe.toml";

/// Load configuration from an explicit file, or from `stockpipe.toml` when present,
/// then apply `.env` and process environment overrides.
pub fn load_config(explicit: Option<&Path>) -> Result<PipelineConfig> {
    let mut config = match explicit {
        Some(path) => {
            if !path.exists() {
                return Err(PipelineError::config_with_code(
                    ErrorCode::CONFIG_NOT_FOUND,
                    format!("config file not found: {}", path.display()),
                    None,
                ));
            }
            load_file(path)?
        }
        None => {
            let default_path = Path::new(DEFAULT_CONFIG_FILE);
            if default_path.exists() {
                load_file(default_path)?
            } else {
                debug!("No {} found, using defaults", DEFAULT_CONFIG_FILE);
                PipelineConfig::default()
            }
        }
    };

    match dotenvy::dotenv() {
        Ok(path) => debug!("Loaded environment from {}", path.display()),
        Err(e) if e.not_found() => {}
        Err(e) => tracing::warn!("Ignoring unreadable .env file: {}", e),
    }

    config.merge_env_vars();
    Ok(config)
}

fn load_file(path: &Path) -> Result<PipelineConfig> {
    debug!("Loading configuration from {}", path.display());
    let content = fs::read_to_string(path).map_err(|e| {
        PipelineError::config_with_code(
            ErrorCode::CONFIG_NOT_FOUND,
            format!("cannot read {}", path.display()),
            None,
        )
        .with_source(e)
    })?;
    parse_config(&content).map_err(|e| e.with_context(path.display()))
}

/// Parse a TOML document into a configuration without touching the environment
pub fn parse_config(content: &str) -> Result<PipelineConfig> {
    toml::from_str(content).map_err(|e| {
        PipelineError::config_with_code(ErrorCode::CONFIG_PARSE_ERROR, e.to_string(), None)
            .with_source(e)
    })
}
