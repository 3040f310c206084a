//! Sortable timestamp encoding
//!
//! Timestamps are stored as RFC 3339 strings in UTC with second precision and
//! a `Z` suffix (`2024-05-01T12:30:00Z`). Every encoded value has the same
//! width, so string order equals chronological order and the store can
//! filter with a plain `>=` on the string.

use chrono::{DateTime, Datelike, Duration, SecondsFormat, Utc};

/// Smallest fixed-width encoding; every stored timestamp sorts at or after it
pub const MIN_ENCODED: &str = "0000-01-01T00:00:00Z";

/// Encode an instant
pub fn format(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Encode the current instant
pub fn now() -> String {
    format(Utc::now())
}

/// Decode a stored timestamp
pub fn parse(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Encoded lower bound for "the last `minutes` minutes" relative to `now`.
///
/// Windows reaching past year 0 clamp to [`MIN_ENCODED`].
pub fn horizon(now: DateTime<Utc>, minutes: i64) -> String {
    Duration::try_minutes(minutes)
        .and_then(|window| now.checked_sub_signed(window))
        .filter(|instant| (0..=9999).contains(&instant.year()))
        .map_or_else(|| MIN_ENCODED.to_string(), format)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format_is_fixed_width_utc() {
        let instant = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(format(instant), "2024-01-02T03:04:05Z");
        assert_eq!(format(instant).len(), 20);
    }

    #[test]
    fn test_string_order_matches_time_order() {
        let earlier = Utc.with_ymd_and_hms(2024, 9, 30, 23, 59, 59).unwrap();
        let later = Utc.with_ymd_and_hms(2024, 10, 1, 0, 0, 0).unwrap();
        assert!(format(earlier) < format(later));
    }

    #[test]
    fn test_parse_roundtrip() {
        let instant = Utc.with_ymd_and_hms(2023, 12, 31, 8, 0, 0).unwrap();
        assert_eq!(parse(&format(instant)), Some(instant));
        assert_eq!(parse("not a timestamp"), None);
    }

    #[test]
    fn test_horizon() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        assert_eq!(horizon(now, 90), "2024-06-01T10:30:00Z");
    }

    #[test]
    fn test_horizon_clamps_huge_windows() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        assert_eq!(horizon(now, 999_999_999_999), MIN_ENCODED);
        assert_eq!(horizon(now, i64::MAX), MIN_ENCODED);
        assert!(MIN_ENCODED < format(Utc.with_ymd_and_hms(1970, 1, 1, 0, 0, 0).unwrap()).as_str());
    }
}
