//! Shared helpers for query parsing and timestamp formatting.

use chrono::{DateTime, Local};

/// Format string for weather observation times.
const LOCAL_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Render epoch seconds as `YYYY-MM-DD HH:MM:SS` in the server's local time zone.
///
/// Returns `None` for timestamps chrono cannot represent.
pub(crate) fn format_local_datetime(epoch_secs: i64) -> Option<String> {
    DateTime::from_timestamp(epoch_secs, 0).map(|utc| {
        utc.with_timezone(&Local)
            .format(LOCAL_DATETIME_FORMAT)
            .to_string()
    })
}

/// Parse an optional query value as a positive integer.
///
/// Missing, blank, non-numeric and zero values all fall back to `default`.
pub(crate) fn positive_query_int(value: Option<&str>, default: usize) -> usize {
    value
        .map(str::trim)
        .and_then(|v| v.parse::<usize>().ok())
        .filter(|&n| n > 0)
        .unwrap_or(default)
}
