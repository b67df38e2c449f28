//! Daily time partitions
//!
//! A partition is one calendar day in the partition time zone, named by its
//! date formatted with `fmt`. A day only becomes a partition once it is over,
//! so the newest partition at any moment is yesterday's local date.

use chrono::{DateTime, Days, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::error::{ErrorCode, PipelineError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyPartitionsDefinition {
    start: NaiveDate,
    timezone: Tz,
    fmt: String,
}

impl DailyPartitionsDefinition {
    /// `start_date` is formatted with `fmt`.
    pub fn new(start_date: &str, timezone: Tz, fmt: &str) -> Result<Self> {
        let start = NaiveDate::parse_from_str(start_date, fmt).map_err(|e| {
            PipelineError::config_with_code(
                ErrorCode::CONFIG_INVALID_VALUE,
                format!("start date '{}' does not match '{}': {}", start_date, fmt, e),
                Some("schedule.start_date".to_string()),
            )
        })?;
        Ok(Self {
            start,
            timezone,
            fmt: fmt.to_string(),
        })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    pub fn fmt(&self) -> &str {
        &self.fmt
    }

    pub fn format_key(&self, date: NaiveDate) -> String {
        date.format(&self.fmt).to_string()
    }

    /// Parse a key without checking bounds
    pub fn parse_key(&self, key: &str) -> Result<NaiveDate> {
        NaiveDate::parse_from_str(key, &self.fmt)
            .ok()
            .filter(|date| self.format_key(*date) == key)
            .ok_or_else(|| {
                PipelineError::orchestration_with_code(
                    ErrorCode::ORCH_INVALID_PARTITION,
                    format!("partition key '{}' does not match '{}'", key, self.fmt),
                )
            })
    }

    /// Newest complete day as of `now`, if the range has started
    pub fn last_partition(&self, now: DateTime<Utc>) -> Option<NaiveDate> {
        let today = now.with_timezone(&self.timezone).date_naive();
        today.pred_opt().filter(|last| *last >= self.start)
    }

    /// Every partition key from the start date through the last complete day
    pub fn partition_keys(&self, now: DateTime<Utc>) -> Vec<String> {
        let Some(last) = self.last_partition(now) else {
            return Vec::new();
        };
        self.start
            .iter_days()
            .take_while(|day| *day <= last)
            .map(|day| self.format_key(day))
            .collect()
    }

    /// Parse `key` and check that it names an existing partition as of `now`.
    pub fn validate_key(&self, key: &str, now: DateTime<Utc>) -> Result<NaiveDate> {
        let date = self.parse_key(key)?;
        if date < self.start {
            return Err(PipelineError::orchestration_with_code(
                ErrorCode::ORCH_INVALID_PARTITION,
                format!("partition '{}' is before the start date {}", key, self.format_key(self.start)),
            ));
        }
        match self.last_partition(now) {
            Some(last) if date <= last => Ok(date),
            _ => Err(PipelineError::orchestration_with_code(
                ErrorCode::ORCH_INVALID_PARTITION,
                format!("partition '{}' is not complete yet in {}", key, self.timezone),
            )),
        }
    }

    /// Local start (inclusive) and end (exclusive) of a partition
    pub fn time_window(&self, key: &str) -> Result<(DateTime<Tz>, DateTime<Tz>)> {
        let date = self.parse_key(key)?;
        let next = date.checked_add_days(Days::new(1)).ok_or_else(|| {
            PipelineError::orchestration_with_code(
                ErrorCode::ORCH_INVALID_PARTITION,
                format!("partition '{}' is out of range", key),
            )
        })?;
        Ok((self.local_midnight(date)?, self.local_midnight(next)?))
    }

    fn local_midnight(&self, date: NaiveDate) -> Result<DateTime<Tz>> {
        self.timezone
            .from_local_datetime(&date.and_time(NaiveTime::MIN))
            .earliest()
            .ok_or_else(|| {
                PipelineError::orchestration_with_code(
                    ErrorCode::ORCH_INVALID_PARTITION,
                    format!("midnight of {} does not exist in {}", date, self.timezone),
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::timezone::IST;

    fn partitions() -> DailyPartitionsDefinition {
        DailyPartitionsDefinition::new("2024-11-01", IST, "%Y-%m-%d").unwrap()
    }

    fn utc(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn test_last_partition_is_yesterday_in_partition_timezone() {
        let p = partitions();
        // 2024-11-05 20:00 UTC is already 2024-11-06 01:30 in IST
        let last = p.last_partition(utc("2024-11-05T20:00:00Z")).unwrap();
        assert_eq!(p.format_key(last), "2024-11-05");
        let last = p.last_partition(utc("2024-11-05T10:00:00Z")).unwrap();
        assert_eq!(p.format_key(last), "2024-11-04");
    }

    #[test]
    fn test_no_partitions_before_first_day_completes() {
        let p = partitions();
        assert!(p.partition_keys(utc("2024-11-01T12:00:00Z")).is_empty());
        assert_eq!(p.last_partition(utc("2024-10-01T00:00:00Z")), None);
    }

    #[test]
    fn test_partition_keys_range() {
        let keys = partitions().partition_keys(utc("2024-11-04T12:00:00Z"));
        assert_eq!(keys, vec!["2024-11-01", "2024-11-02", "2024-11-03"]);
    }

    #[test]
    fn test_validate_key() {
        let p = partitions();
        let now = utc("2024-11-15T12:00:00Z");
        assert!(p.validate_key("2024-11-14", now).is_ok());
        assert!(p.validate_key("2024-11-01", now).is_ok());

        let err = p.validate_key("2024-10-31", now).unwrap_err();
        assert_eq!(err.code(), ErrorCode::ORCH_INVALID_PARTITION);
        assert!(p.validate_key("2024-11-15", now).is_err());
        assert!(p.validate_key("14/11/2024", now).is_err());
        assert!(p.validate_key("2024-11-5", now).is_err());
    }

    #[test]
    fn test_time_window_spans_one_local_day() {
        let (start, end) = partitions().time_window("2024-11-14").unwrap();
        assert_eq!(start.to_rfc3339(), "2024-11-14T00:00:00+05:30");
        assert_eq!(end.to_rfc3339(), "2024-11-15T00:00:00+05:30");
    }

    #[test]
    fn test_bad_start_date_is_config_error() {
        let err = DailyPartitionsDefinition::new("01/11/2024", IST, "%Y-%m-%d").unwrap_err();
        assert_eq!(err.code(), ErrorCode::CONFIG_INVALID_VALUE);
    }
}
