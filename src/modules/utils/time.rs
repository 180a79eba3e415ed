use chrono::{DateTime, Utc};
use std::time::{SystemTime, UNIX_EPOCH};

/// Calendar date (UTC) of a unix timestamp, for display
pub fn format_date(timestamp: u64) -> String {
    i64::try_from(timestamp)
        .ok()
        .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
        .map(|date| date.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Seconds since the unix epoch; 0 if the clock is before it
pub fn get_current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_date() {
        assert_eq!(format_date(0), "1970-01-01");
        assert_eq!(format_date(1_700_000_000), "2023-11-14");
        assert_eq!(format_date(u64::MAX), "unknown");
    }

    #[test]
    fn test_current_timestamp_is_after_2023() {
        assert!(get_current_timestamp() > 1_700_000_000);
    }
}
