// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for date/time parsing and formatting.
//!
//! Activity dates are calendar dates. The canonical stored form is
//! `YYYY-MM-DD`; older records may carry a full date-time, in which case the
//! calendar date is taken as written in the string's own offset so that the
//! day bucket never depends on the server's timezone.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};

const DAY_FORMAT: &str = "%Y-%m-%d";

/// Format a UTC timestamp as RFC3339 using a `Z` suffix.
pub fn format_utc_rfc3339(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Format a calendar date as a `YYYY-MM-DD` day key.
pub fn format_day_key(date: NaiveDate) -> String {
    date.format(DAY_FORMAT).to_string()
}

/// An activity date that could not be interpreted as a calendar date.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unparseable activity date: '{0}'")]
pub struct DateParseError(pub String);

/// Parse an activity date into its calendar day.
///
/// Accepts `YYYY-MM-DD`, RFC3339 date-times and naive `YYYY-MM-DDTHH:MM:SS`.
pub fn parse_activity_date(raw: &str) -> Result<NaiveDate, DateParseError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(DateParseError(raw.to_string()));
    }

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, DAY_FORMAT) {
        return Ok(date);
    }

    if let Ok(date_time) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(date_time.date_naive());
    }

    NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|dt| dt.date())
        .map_err(|_| DateParseError(raw.to_string()))
}

/// Parse a submission timestamp stored as an RFC3339 string.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_plain_calendar_date() {
        assert_eq!(parse_activity_date("2024-03-09"), Ok(day(2024, 3, 9)));
        assert_eq!(parse_activity_date(" 2024-03-09 "), Ok(day(2024, 3, 9)));
    }

    #[test]
    fn test_parse_date_time_keeps_written_calendar_day() {
        // 23:30 at -08:00 is already the next day in UTC; the written day wins.
        assert_eq!(
            parse_activity_date("2024-03-09T23:30:00-08:00"),
            Ok(day(2024, 3, 9))
        );
        assert_eq!(
            parse_activity_date("2024-03-09T10:00:00.123Z"),
            Ok(day(2024, 3, 9))
        );
        assert_eq!(
            parse_activity_date("2024-03-09T10:00:00"),
            Ok(day(2024, 3, 9))
        );
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_activity_date("").is_err());
        assert!(parse_activity_date("yesterday").is_err());
        assert!(parse_activity_date("2024-02-30").is_err());
        assert!(parse_activity_date("2024-13-01").is_err());
    }

    #[test]
    fn test_day_key_format() {
        assert_eq!(format_day_key(day(2024, 1, 5)), "2024-01-05");
    }

    #[test]
    fn test_parse_timestamp() {
        let ts = parse_timestamp("2024-01-15T10:30:00Z").unwrap();
        assert_eq!(format_utc_rfc3339(ts), "2024-01-15T10:30:00.000Z");
        assert!(parse_timestamp("not a time").is_none());
    }
}
