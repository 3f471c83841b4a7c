//! Date/time utilities for feedhub.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;

/// Format used for human-readable cache times.
pub const DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Format a DateTime<Utc> in the given timezone.
///
/// An unknown timezone name falls back to UTC.
pub fn format_utc_datetime(dt: &DateTime<Utc>, timezone: &str, format: &str) -> String {
    let tz: Tz = match timezone.parse() {
        Ok(tz) => tz,
        Err(_) => return dt.format(format).to_string(),
    };
    dt.with_timezone(&tz).format(format).to_string()
}

/// Format a millisecond epoch timestamp in the given timezone.
///
/// Returns `None` for timestamps outside chrono's range.
pub fn format_millis(ms: i64, timezone: &str) -> Option<String> {
    DateTime::<Utc>::from_timestamp_millis(ms)
        .map(|dt| format_utc_datetime(&dt, timezone, DISPLAY_FORMAT))
}

/// RFC3339 representation of a millisecond epoch timestamp.
pub fn millis_to_rfc3339(ms: i64) -> Option<String> {
    DateTime::<Utc>::from_timestamp_millis(ms)
        .map(|dt| dt.to_rfc3339_opts(chrono::SecondsFormat::Millis, true))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format_utc_datetime() {
        let dt = Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap();
        assert_eq!(
            format_utc_datetime(&dt, "Asia/Shanghai", "%Y/%m/%d %H:%M"),
            "2024/01/15 18:30"
        );
        assert_eq!(
            format_utc_datetime(&dt, "UTC", "%Y/%m/%d %H:%M"),
            "2024/01/15 10:30"
        );
    }

    #[test]
    fn test_format_utc_datetime_invalid_timezone() {
        let dt = Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap();
        assert_eq!(
            format_utc_datetime(&dt, "Invalid/Zone", "%H:%M"),
            "10:30"
        );
    }

    #[test]
    fn test_format_millis() {
        // 2024-01-15T10:30:00.250Z
        let ms = 1_705_314_600_250;
        assert_eq!(
            format_millis(ms, "Asia/Shanghai").as_deref(),
            Some("2024-01-15 18:30:00.250")
        );
        assert_eq!(format_millis(i64::MAX, "UTC"), None);
    }

    #[test]
    fn test_millis_to_rfc3339() {
        assert_eq!(
            millis_to_rfc3339(1_705_314_600_250).as_deref(),
            Some("2024-01-15T10:30:00.250Z")
        );
    }
}
