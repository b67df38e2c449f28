//! `stockpipe materialize` and `stockpipe schedule`

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use tracing::warn;

use crate::config::load_config;
use crate::error::{ErrorCode, PipelineError};
use crate::orchestration::{AssetKey, Definitions, Scheduler, StepStatus};
use crate::pipeline;

/// Accept full keys or, when unambiguous, the bare asset name
fn resolve_asset(definitions: &Definitions, arg: &str) -> Result<AssetKey, PipelineError> {
    let key: AssetKey = arg.parse()?;
    if definitions.graph().contains(&key) {
        return Ok(key);
    }

    let matches: Vec<&AssetKey> = definitions
        .asset_specs()
        .map(|spec| &spec.key)
        .filter(|candidate| candidate.name() == arg)
        .collect();
    match matches.as_slice() {
        [only] => Ok((*only).clone()),
        [] => Err(PipelineError::orchestration_with_code(
            ErrorCode::ORCH_ASSET_NOT_FOUND,
            format!("asset '{}' is not defined", arg),
        )),
        _ => Err(PipelineError::orchestration_with_code(
            ErrorCode::ORCH_ASSET_NOT_FOUND,
            format!("asset name '{}' is ambiguous; use the full key", arg),
        )),
    }
}

pub async fn run_materialize(
    config_path: Option<&Path>,
    job: &str,
    partition: Option<&str>,
    assets: &[String],
) -> Result<()> {
    let config = load_config(config_path)?;
    config.validate()?;

    let definitions = pipeline::load_definitions(&config).await?;
    let only = assets
        .iter()
        .map(|arg| resolve_asset(&definitions, arg))
        .collect::<Result<Vec<_>, _>>()?;

    let executor = pipeline::executor(&config, definitions)?;
    let report = executor
        .execute(job, partition, (!only.is_empty()).then_some(only.as_slice()))
        .await?;
    print!("{}", report.summary());

    if let Some(failed) = report.steps.iter().find(|s| s.status == StepStatus::Failed) {
        return Err(PipelineError::asset_failed(
            failed.asset_key.to_string(),
            failed.error.clone().unwrap_or_default(),
        )
        .into());
    }
    Ok(())
}

pub async fn run_schedule(config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;
    config.validate()?;

    let definitions = pipeline::load_definitions(&config).await?;
    let executor = pipeline::executor(&config, definitions)?;
    let scheduler = Scheduler::new(Arc::new(executor));

    scheduler
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for Ctrl+C signal: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await?;
    Ok(())
}
