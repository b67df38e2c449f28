//! Partitioning of the stock price job

use crate::config::ScheduleSettings;
use crate::error::Result;
use crate::orchestration::DailyPartitionsDefinition;
use crate::utils::timezone::get_timezone;

/// One partition per day since `start_date`, cut in the configured time zone
/// (India Standard Time unless overridden).
pub fn daily_partitions(settings: &ScheduleSettings) -> Result<DailyPartitionsDefinition> {
    let timezone = get_timezone(&settings.timezone)?;
    DailyPartitionsDefinition::new(&settings.start_date, timezone, &settings.partition_fmt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::timezone::IST;
    use chrono::NaiveDate;

    #[test]
    fn test_defaults() {
        let partitions = daily_partitions(&ScheduleSettings::default()).unwrap();
        assert_eq!(partitions.start(), NaiveDate::from_ymd_opt(2024, 11, 1).unwrap());
        assert_eq!(partitions.timezone(), IST);
        assert_eq!(partitions.fmt(), "%Y-%m-%d");
    }

    #[test]
    fn test_unknown_timezone() {
        let settings = ScheduleSettings {
            timezone: "Nowhere/Special".to_string(),
            ..ScheduleSettings::default()
        };
        assert!(daily_partitions(&settings).is_err());
    }
}
