//! Time zone lookup

use chrono_tz::Tz;

use crate::error::{ErrorCode, PipelineError, Result};

/// Environment variable naming the deployment time zone. Partitions are cut in
/// it unless `STOCKPIPE_PARTITION_TIMEZONE` says otherwise.
pub const TIME_ZONE_ENV: &str = "TIME_ZONE";

/// India Standard Time, the zone the daily partitions are cut in by default
pub const IST: Tz = chrono_tz::Asia::Kolkata;

/// Look up an IANA time zone by name
pub fn get_timezone(name: &str) -> Result<Tz> {
    name.parse::<Tz>().map_err(|e| {
        PipelineError::config_with_code(
            ErrorCode::CONFIG_INVALID_VALUE,
            format!("unknown time zone '{}': {}", name, e),
            Some("timezone".to_string()),
        )
    })
}
