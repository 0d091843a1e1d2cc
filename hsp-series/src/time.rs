//! Timestamp helpers shared across the workspace.
//!
//! All timestamps are UTC and carried as `NaiveDateTime`. The time-series
//! store speaks epoch milliseconds, the model tree and case files speak
//! ISO-8601 strings.

use crate::error::{Result, SeriesError};
use chrono::{DateTime, Duration, NaiveDateTime, Timelike};

/// Format used when timestamps are written to the solver input document.
pub const SOLVER_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const ACCEPTED_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Epoch milliseconds for a UTC timestamp.
pub fn to_millis(timestamp: NaiveDateTime) -> i64 {
    timestamp.and_utc().timestamp_millis()
}

/// UTC timestamp for epoch milliseconds.
pub fn from_millis(millis: i64) -> Result<NaiveDateTime> {
    DateTime::from_timestamp_millis(millis)
        .map(|dt| dt.naive_utc())
        .ok_or_else(|| SeriesError::InvalidTimestamp(millis.to_string()))
}

/// Parse a timestamp given as RFC 3339, `YYYY-MM-DD[T ]HH:MM[:SS]`, or
/// integer epoch milliseconds.
pub fn parse_timestamp(s: &str) -> Result<NaiveDateTime> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.naive_utc());
    }
    for format in ACCEPTED_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Ok(dt);
        }
    }
    match s.parse::<i64>() {
        Ok(millis) => from_millis(millis),
        Err(_) => Err(SeriesError::InvalidTimestamp(s.to_string())),
    }
}

/// Format a timestamp the way the solver input expects it.
pub fn format_timestamp(timestamp: &NaiveDateTime) -> String {
    timestamp.format(SOLVER_TIME_FORMAT).to_string()
}

/// Truncate a timestamp down to the start of its hour.
pub fn floor_hour(timestamp: NaiveDateTime) -> NaiveDateTime {
    timestamp
        .with_minute(0)
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(timestamp)
}

/// Round a timestamp up to the next whole hour (unchanged if already whole).
pub fn ceil_hour(timestamp: NaiveDateTime) -> NaiveDateTime {
    let floored = floor_hour(timestamp);
    if floored == timestamp {
        floored
    } else {
        floored + Duration::hours(1)
    }
}

/// Hourly grid from `floor_hour(first)` through `last` (inclusive).
pub fn hourly_grid(first: NaiveDateTime, last: NaiveDateTime) -> Vec<NaiveDateTime> {
    let mut grid = Vec::new();
    let mut current = floor_hour(first);
    while current <= last {
        grid.push(current);
        current += Duration::hours(1);
    }
    grid
}

/// True if the timestamp sits exactly on an hour boundary.
pub fn is_whole_hour(timestamp: &NaiveDateTime) -> bool {
    floor_hour(*timestamp) == *timestamp
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn test_millis_round_trip() {
        let ts = at(6, 30);
        assert_eq!(from_millis(to_millis(ts)).unwrap(), ts);
    }

    #[test]
    fn test_parse_timestamp_formats() {
        assert_eq!(parse_timestamp("2024-03-01T06:30:00").unwrap(), at(6, 30));
        assert_eq!(parse_timestamp("2024-03-01 06:30").unwrap(), at(6, 30));
        assert_eq!(parse_timestamp("2024-03-01T07:30:00+01:00").unwrap(), at(6, 30));
        assert_eq!(
            parse_timestamp(&to_millis(at(6, 30)).to_string()).unwrap(),
            at(6, 30)
        );
        assert!(parse_timestamp("yesterday").is_err());
    }

    #[test]
    fn test_floor_and_ceil_hour() {
        assert_eq!(floor_hour(at(6, 30)), at(6, 0));
        assert_eq!(ceil_hour(at(6, 30)), at(7, 0));
        assert_eq!(ceil_hour(at(6, 0)), at(6, 0));
        assert!(is_whole_hour(&at(6, 0)));
        assert!(!is_whole_hour(&at(6, 15)));
    }

    #[test]
    fn test_hourly_grid() {
        let grid = hourly_grid(at(1, 30), at(4, 0));
        assert_eq!(grid, vec![at(1, 0), at(2, 0), at(3, 0), at(4, 0)]);
        assert!(hourly_grid(at(4, 0), at(1, 0)).is_empty());
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(&at(6, 30)), "2024-03-01 06:30:00");
    }
}
