//! Timestamp utilities
//!
//! Timestamps are stored in the database as RFC3339 TEXT and parsed back on
//! read; the helpers here keep that round-trip in one place. Month windows are
//! half-open `[first-of-month, first-of-next-month)` so an interval joining on
//! the last second of a month still counts toward that month.

use crate::{Error, Result};
use chrono::{DateTime, TimeZone, Utc};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Format a timestamp for database storage
pub fn to_db(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339()
}

/// Parse a timestamp read back from the database
pub fn from_db(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Internal(format!("Failed to parse timestamp '{}': {}", s, e)))
}

/// Parse an optional timestamp column
pub fn from_db_opt(s: Option<String>) -> Result<Option<DateTime<Utc>>> {
    s.map(|s| from_db(&s)).transpose()
}

/// Elapsed minutes between two timestamps, negative when `end` precedes `start`
pub fn minutes_between(start: DateTime<Utc>, end: DateTime<Utc>) -> f64 {
    (end - start).num_seconds() as f64 / 60.0
}

/// Half-open calendar month window `[start, end)` in UTC
///
/// Aggregation attributes an interval to the month of its join time only;
/// intervals spanning the boundary are not split.
pub fn month_window(year: i32, month: u32) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
    if !(1..=12).contains(&month) {
        return Err(Error::InvalidInput(format!("Invalid month: {}", month)));
    }

    let start = Utc
        .with_ymd_and_hms(year, month, 1, 0, 0, 0)
        .single()
        .ok_or_else(|| Error::InvalidInput(format!("Invalid month: {}-{:02}", year, month)))?;

    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    let end = Utc
        .with_ymd_and_hms(next_year, next_month, 1, 0, 0, 0)
        .single()
        .ok_or_else(|| Error::Internal(format!("Invalid month rollover: {}-{:02}", year, month)))?;

    Ok((start, end))
}
