//! Long-running loop that fires schedules

use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::future::Future;
use std::sync::Arc;
use tracing::{error, info, warn};

use super::executor::{JobExecutor, RunReport};
use super::schedule::ScheduleDefinition;
use crate::error::{ErrorCode, PipelineError, Result};

pub struct Scheduler {
    executor: Arc<JobExecutor>,
}

impl Scheduler {
    pub fn new(executor: Arc<JobExecutor>) -> Self {
        Self { executor }
    }

    fn enabled_schedules(&self) -> Vec<ScheduleDefinition> {
        self.executor
            .definitions()
            .schedules()
            .filter(|s| s.enabled)
            .cloned()
            .collect()
    }

    /// Earliest tick after `after` and every schedule due at it
    pub fn next_due(
        &self,
        after: DateTime<Utc>,
    ) -> Result<Option<(DateTime<Utc>, Vec<ScheduleDefinition>)>> {
        let mut next: Option<(DateTime<Utc>, Vec<ScheduleDefinition>)> = None;
        for schedule in self.enabled_schedules() {
            let tick = schedule.next_tick(after)?;
            match next.as_ref().map(|(at, _)| tick.cmp(at)) {
                Some(Ordering::Greater) => {}
                Some(Ordering::Equal) => {
                    if let Some((_, due)) = next.as_mut() {
                        due.push(schedule);
                    }
                }
                _ => next = Some((tick, vec![schedule])),
            }
        }
        Ok(next)
    }

    /// Run the job of `schedule` for the partition belonging to `tick`
    pub async fn fire(&self, schedule: &ScheduleDefinition, tick: DateTime<Utc>) -> Result<RunReport> {
        let job = self.executor.definitions().job(&schedule.job_name)?;
        let partitions = job.partitions.as_ref().ok_or_else(|| {
            PipelineError::orchestration_with_code(
                ErrorCode::ORCH_INVALID_PARTITION,
                format!("job '{}' is not partitioned", job.name),
            )
        })?;
        let date = schedule.partition_for_tick(tick).ok_or_else(|| {
            PipelineError::orchestration_with_code(
                ErrorCode::ORCH_INVALID_PARTITION,
                format!("tick {} has no previous day", tick),
            )
        })?;
        let key = partitions.format_key(date);

        info!("Schedule {} firing for partition {}", schedule.name, key);
        self.executor
            .execute_at(&schedule.job_name, Some(&key), None, tick)
            .await
    }

    /// Sleep until each tick and fire the due schedules until `shutdown` resolves.
    pub async fn run<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        loop {
            let now = Utc::now();
            let Some((tick, due)) = self.next_due(now)? else {
                warn!("No enabled schedules; waiting for shutdown");
                shutdown.as_mut().await;
                return Ok(());
            };

            let names: Vec<&str> = due.iter().map(|s| s.name.as_str()).collect();
            info!("Next tick at {} for {}", tick, names.join(", "));
            let wait = (tick - now).to_std().unwrap_or_default();

            tokio::select! {
                _ = shutdown.as_mut() => {
                    info!("Scheduler shutting down");
                    return Ok(());
                }
                _ = tokio::time::sleep(wait) => {}
            }

            for schedule in &due {
                match self.fire(schedule, tick).await {
                    Ok(report) if report.is_success() => {
                        info!("{}", report.summary().trim_end());
                    }
                    Ok(report) => {
                        error!("{}", report.summary().trim_end());
                    }
                    Err(e) => {
                        error!("Schedule {} failed to start: {}", schedule.name, e);
                    }
                }
            }
        }
    }
}
