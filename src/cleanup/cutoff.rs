//! Retention cutoff computation.

use chrono::{DateTime, Duration, Utc};

use super::CleanupError;

/// Largest accepted retention horizon, about 270 years. Anything beyond
/// this is a configuration mistake, and some values past it would
/// overflow the representable time range outright.
pub const MAX_RETENTION_DAYS: u32 = 99_999;

/// Compute `now - days` as the cutoff timestamp, failing fast on
/// unreasonable horizons before any storage is touched.
pub fn retention_cutoff(now: DateTime<Utc>, days: u32) -> Result<DateTime<Utc>, CleanupError> {
    if days > MAX_RETENTION_DAYS {
        return Err(CleanupError::HorizonTooLarge { days });
    }
    Duration::try_days(i64::from(days))
        .and_then(|horizon| now.checked_sub_signed(horizon))
        .ok_or(CleanupError::HorizonTooLarge { days })
}
