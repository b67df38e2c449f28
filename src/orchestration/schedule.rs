//! Daily schedules for partitioned jobs

use chrono::{DateTime, Days, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

use super::job::AssetJob;
use crate::error::{ErrorCode, PipelineError, Result};

/// Fires once a day at `hour:minute` in the partition time zone and
/// materializes the day that just ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleDefinition {
    pub name: String,
    pub job_name: String,
    pub hour: u32,
    pub minute: u32,
    pub timezone: Tz,
    pub enabled: bool,
}

/// Schedule a daily-partitioned job, named `{job}_schedule`
pub fn build_schedule_from_partitioned_job(
    job: &AssetJob,
    hour: u32,
    minute: u32,
) -> Result<ScheduleDefinition> {
    let partitions = job.partitions.as_ref().ok_or_else(|| {
        PipelineError::orchestration(format!(
            "job '{}' has no partitions to derive a schedule from",
            job.name
        ))
    })?;
    if NaiveTime::from_hms_opt(hour, minute, 0).is_none() {
        return Err(PipelineError::config_with_code(
            ErrorCode::CONFIG_INVALID_VALUE,
            format!("{:02}:{:02} is not a valid time of day", hour, minute),
            Some("schedule".to_string()),
        ));
    }

    Ok(ScheduleDefinition {
        name: format!("{}_schedule", job.name),
        job_name: job.name.clone(),
        hour,
        minute,
        timezone: partitions.timezone(),
        enabled: true,
    })
}

impl ScheduleDefinition {
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Cron form of the tick time
    pub fn cron_schedule(&self) -> String {
        format!("{} {} * * *", self.minute, self.hour)
    }

    /// First tick strictly after `after`
    pub fn next_tick(&self, after: DateTime<Utc>) -> Result<DateTime<Utc>> {
        let time = NaiveTime::from_hms_opt(self.hour, self.minute, 0).ok_or_else(|| {
            PipelineError::orchestration(format!("schedule '{}' has an invalid time", self.name))
        })?;

        let mut day = after.with_timezone(&self.timezone).date_naive();
        // A tick can be skipped by a DST gap, so look a few days ahead
        for _ in 0..3 {
            if let Some(tick) = self
                .timezone
                .from_local_datetime(&day.and_time(time))
                .earliest()
                .map(|t| t.with_timezone(&Utc))
            {
                if tick > after {
                    return Ok(tick);
                }
            }
            day = day.checked_add_days(Days::new(1)).ok_or_else(|| {
                PipelineError::orchestration(format!("schedule '{}' ran out of dates", self.name))
            })?;
        }

        Err(PipelineError::orchestration(format!(
            "schedule '{}' has no tick after {}",
            self.name, after
        )))
    }

    /// Partition date materialized by the tick at `tick`: the previous local day
    pub fn partition_for_tick(&self, tick: DateTime<Utc>) -> Option<NaiveDate> {
        tick.with_timezone(&self.timezone).date_naive().pred_opt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestration::job::{define_asset_job, AssetSelection};
    use crate::orchestration::partitions::DailyPartitionsDefinition;
    use crate::utils::timezone::IST;

    fn job() -> AssetJob {
        define_asset_job(
            "daily_job",
            AssetSelection::All,
            Some(DailyPartitionsDefinition::new("2024-11-01", IST, "%Y-%m-%d").unwrap()),
        )
    }

    fn utc(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn test_schedule_named_after_job() {
        let schedule = build_schedule_from_partitioned_job(&job(), 0, 0).unwrap();
        assert_eq!(schedule.name, "daily_job_schedule");
        assert_eq!(schedule.job_name, "daily_job");
        assert_eq!(schedule.timezone, IST);
        assert_eq!(schedule.cron_schedule(), "0 0 * * *");
    }

    #[test]
    fn test_unpartitioned_job_cannot_be_scheduled() {
        let job = define_asset_job("adhoc", AssetSelection::All, None);
        assert!(build_schedule_from_partitioned_job(&job, 0, 0).is_err());
    }

    #[test]
    fn test_invalid_time_of_day() {
        let err = build_schedule_from_partitioned_job(&job(), 24, 0).unwrap_err();
        assert_eq!(err.code(), ErrorCode::CONFIG_INVALID_VALUE);
    }

    #[test]
    fn test_next_tick_is_local_midnight() {
        let schedule = build_schedule_from_partitioned_job(&job(), 0, 0).unwrap();
        // Midnight IST is 18:30 UTC the day before
        let tick = schedule.next_tick(utc("2024-11-14T12:00:00Z")).unwrap();
        assert_eq!(tick, utc("2024-11-14T18:30:00Z"));
    }

    #[test]
    fn test_next_tick_is_strictly_after() {
        let schedule = build_schedule_from_partitioned_job(&job(), 0, 0).unwrap();
        let tick = schedule.next_tick(utc("2024-11-14T18:30:00Z")).unwrap();
        assert_eq!(tick, utc("2024-11-15T18:30:00Z"));
    }

    #[test]
    fn test_partition_for_tick_is_previous_local_day() {
        let schedule = build_schedule_from_partitioned_job(&job(), 0, 0).unwrap();
        let date = schedule.partition_for_tick(utc("2024-11-14T18:30:00Z")).unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2024, 11, 14).unwrap());
    }
}
