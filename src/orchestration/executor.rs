//! Runs a job for one partition

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{error, info, info_span, warn, Instrument};

use super::asset::{AssetKey, MetadataValue};
use super::context::AssetExecutionContext;
use super::definitions::Definitions;
use super::run_log::RunLog;
use crate::error::{ErrorCode, PipelineError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Succeeded,
    Failed,
    Skipped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Success,
    Failed,
}

/// Outcome of one asset within a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepReport {
    pub asset_key: AssetKey,
    pub status: StepStatus,
    #[serde(with = "humantime_serde")]
    pub duration: Duration,
    #[serde(default)]
    pub metadata: BTreeMap<String, MetadataValue>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: String,
    pub job_name: String,
    pub partition_key: String,
    pub status: RunStatus,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub steps: Vec<StepReport>,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Success
    }

    pub fn step(&self, key: &AssetKey) -> Option<&StepReport> {
        self.steps.iter().find(|s| &s.asset_key == key)
    }

    /// One line per step, for terminal output
    pub fn summary(&self) -> String {
        let mut out = format!(
            "Run {} of {} for partition {}: {:?}\n",
            self.run_id, self.job_name, self.partition_key, self.status
        );
        for step in &self.steps {
            out.push_str(&format!(
                "  {:<9} {} ({:.2}s)",
                format!("{:?}", step.status),
                step.asset_key,
                step.duration.as_secs_f64()
            ));
            if let Some(err) = &step.error {
                out.push_str(&format!(": {}", err));
            }
            out.push('\n');
        }
        out
    }
}

/// Executes jobs from a set of definitions and records the outcome
pub struct JobExecutor {
    definitions: Arc<Definitions>,
    run_log: Arc<Mutex<RunLog>>,
}

impl JobExecutor {
    pub fn new(definitions: Arc<Definitions>, run_log: RunLog) -> Self {
        Self {
            definitions,
            run_log: Arc::new(Mutex::new(run_log)),
        }
    }

    pub fn definitions(&self) -> &Arc<Definitions> {
        &self.definitions
    }

    pub fn run_log(&self) -> &Arc<Mutex<RunLog>> {
        &self.run_log
    }

    /// Run log writes do blocking file I/O and wait on the lock file
    async fn with_run_log<T, F>(&self, write: F) -> Result<T>
    where
        F: FnOnce(&mut RunLog) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let run_log = Arc::clone(&self.run_log);
        tokio::task::spawn_blocking(move || {
            let mut log = run_log
                .lock()
                .map_err(|_| PipelineError::execution("run log mutex poisoned"))?;
            write(&mut log)
        })
        .await
        .map_err(|e| {
            PipelineError::execution_with_code(
                ErrorCode::EXEC_INTERRUPTED,
                "run log write did not finish",
            )
            .with_source(e)
        })?
    }

    /// Materialize the job's assets for `partition_key` (default: the last
    /// complete partition). `only` narrows the run to some of the job's assets.
    pub async fn execute(
        &self,
        job_name: &str,
        partition_key: Option<&str>,
        only: Option<&[AssetKey]>,
    ) -> Result<RunReport> {
        self.execute_at(job_name, partition_key, only, Utc::now()).await
    }

    /// [`JobExecutor::execute`] with an explicit clock
    pub async fn execute_at(
        &self,
        job_name: &str,
        partition_key: Option<&str>,
        only: Option<&[AssetKey]>,
        now: DateTime<Utc>,
    ) -> Result<RunReport> {
        let job = self.definitions.job(job_name)?;
        let partitions = job.partitions.as_ref().ok_or_else(|| {
            PipelineError::orchestration_with_code(
                ErrorCode::ORCH_INVALID_PARTITION,
                format!("job '{}' is not partitioned", job.name),
            )
        })?;

        let partition_key = match partition_key {
            Some(key) => key.to_string(),
            None => {
                let last = partitions.last_partition(now).ok_or_else(|| {
                    PipelineError::orchestration_with_code(
                        ErrorCode::ORCH_INVALID_PARTITION,
                        format!("job '{}' has no complete partition yet", job.name),
                    )
                })?;
                partitions.format_key(last)
            }
        };
        let partition_date = partitions.validate_key(&partition_key, now)?;

        let mut selection = self.definitions.resolve_selection(job);
        if let Some(only) = only {
            if let Some(missing) = only.iter().find(|key| !selection.contains(*key)) {
                return Err(PipelineError::orchestration_with_code(
                    ErrorCode::ORCH_ASSET_NOT_FOUND,
                    format!("asset '{}' is not part of job '{}'", missing, job.name),
                ));
            }
            selection = only.iter().cloned().collect();
        }
        let order = self.definitions.graph().topological_order(&selection)?;
        let resources = self.definitions.resources()?;

        let run_id = uuid::Uuid::new_v4().to_string();
        let started_at = Utc::now();
        info!(
            "Starting run {} of {} for partition {} ({} assets)",
            run_id,
            job.name,
            partition_key,
            order.len()
        );

        let mut blocked: BTreeSet<AssetKey> = BTreeSet::new();
        let mut steps = Vec::with_capacity(order.len());

        for key in order {
            if blocked.contains(&key) {
                warn!("Skipping {}: an upstream asset failed", key);
                steps.push(StepReport {
                    asset_key: key,
                    status: StepStatus::Skipped,
                    duration: Duration::ZERO,
                    metadata: BTreeMap::new(),
                    error: None,
                });
                continue;
            }

            let asset = self.definitions.asset(&key)?;
            let ctx = AssetExecutionContext {
                run_id: run_id.clone(),
                asset_key: key.clone(),
                partition_key: partition_key.clone(),
                partition_date,
                resources: resources.clone(),
            };
            let span = info_span!(
                "asset",
                run_id = %run_id,
                asset = %key,
                partition = %partition_key
            );

            let started = Instant::now();
            let outcome = asset.materialize(&ctx).instrument(span).await;
            let duration = started.elapsed();

            match outcome {
                Ok(result) => {
                    info!("Materialized {} in {:?}", key, duration);
                    let recorded = {
                        let (run_id, key, partition_key) =
                            (run_id.clone(), key.clone(), partition_key.clone());
                        let metadata = result.metadata.clone();
                        self.with_run_log(move |log| {
                            log.record_materialization(&run_id, &key, &partition_key, metadata)
                        })
                        .await
                    };

                    match recorded {
                        Ok(()) => steps.push(StepReport {
                            asset_key: key,
                            status: StepStatus::Succeeded,
                            duration,
                            metadata: result.metadata,
                            error: None,
                        }),
                        Err(e) => {
                            error!("Materialized {} but could not record it: {}", key, e);
                            blocked.extend(self.definitions.graph().downstream(&key));
                            steps.push(StepReport {
                                asset_key: key,
                                status: StepStatus::Failed,
                                duration,
                                metadata: result.metadata,
                                error: Some(format!("recording materialization failed: {}", e)),
                            });
                        }
                    }
                }
                Err(e) => {
                    error!("Asset {} failed: {}", key, e);
                    blocked.extend(self.definitions.graph().downstream(&key));
                    steps.push(StepReport {
                        asset_key: key,
                        status: StepStatus::Failed,
                        duration,
                        metadata: BTreeMap::new(),
                        error: Some(e.to_string()),
                    });
                }
            }
        }

        let status = if steps.iter().all(|s| s.status == StepStatus::Succeeded) {
            RunStatus::Success
        } else {
            RunStatus::Failed
        };
        let report = RunReport {
            run_id,
            job_name: job.name.clone(),
            partition_key,
            status,
            started_at,
            finished_at: Utc::now(),
            steps,
        };

        info!("Run {} finished: {:?}", report.run_id, report.status);
        let record = report.clone();
        if let Err(e) = self.with_run_log(move |log| log.record_run(record)).await {
            error!("Could not record run {}: {}", report.run_id, e);
        }
        Ok(report)
    }
}
