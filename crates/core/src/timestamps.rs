//! Epoch timestamp normalisation and display formatting.
//!
//! Clients send capture times in milliseconds while the store keeps whole
//! seconds, and notification payloads may carry either. Values below
//! [`SECONDS_THRESHOLD`] are taken to be seconds.

use chrono::{DateTime, Duration, FixedOffset, NaiveDateTime, Offset, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{EpochMillis, EpochSeconds, Timestamp};

/// Numeric timestamps below this value are seconds, at or above it milliseconds.
pub const SECONDS_THRESHOLD: f64 = 10_000_000_000.0;

/// Display format used in notifications and issue bodies.
pub const DISPLAY_FORMAT: &str = "%Y/%m/%d %H:%M:%S";

/// A timestamp as it may appear in a payload: a number or a string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TimestampInput {
    Number(f64),
    Text(String),
}

impl From<i64> for TimestampInput {
    fn from(value: i64) -> Self {
        Self::Number(value as f64)
    }
}

impl From<&str> for TimestampInput {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

fn scale_numeric(value: f64) -> Option<EpochMillis> {
    if !value.is_finite() {
        return None;
    }
    let millis = if value < SECONDS_THRESHOLD {
        value * 1000.0
    } else {
        value
    };
    Some(millis.trunc() as EpochMillis)
}

fn parse_date_string(text: &str) -> Option<EpochMillis> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.timestamp_millis());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(text) {
        return Some(dt.timestamp_millis());
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y/%m/%d %H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .map(|naive| naive.and_utc().timestamp_millis())
}

/// Convert a payload timestamp to epoch milliseconds.
///
/// Numbers and numeric strings go through the seconds/milliseconds
/// threshold; other strings are parsed as dates. Returns `None` when the
/// input cannot be interpreted.
pub fn normalize_to_millis(input: &TimestampInput) -> Option<EpochMillis> {
    match input {
        TimestampInput::Number(n) => scale_numeric(*n),
        TimestampInput::Text(text) => {
            let text = text.trim();
            if text.is_empty() {
                return None;
            }
            match text.parse::<f64>() {
                Ok(n) => scale_numeric(n),
                Err(_) => parse_date_string(text),
            }
        }
    }
}

/// Floor a millisecond timestamp to whole seconds.
pub fn millis_to_seconds(millis: EpochMillis) -> EpochSeconds {
    millis.div_euclid(1000)
}

/// Fixed display offset from whole hours east of UTC (clamped to ±23h).
pub fn display_offset(hours_east: i32) -> FixedOffset {
    let hours = hours_east.clamp(-23, 23);
    FixedOffset::east_opt(hours * 3600).unwrap_or_else(|| Utc.fix())
}

/// Format epoch milliseconds as local display time.
pub fn format_millis(millis: EpochMillis, offset: FixedOffset) -> Option<String> {
    let utc = DateTime::<Utc>::from_timestamp_millis(millis)?;
    Some(utc.with_timezone(&offset).format(DISPLAY_FORMAT).to_string())
}

/// Format any payload timestamp for display, falling back to the raw
/// input when it cannot be interpreted.
pub fn format_display(input: &TimestampInput, offset: FixedOffset) -> String {
    normalize_to_millis(input)
        .and_then(|ms| format_millis(ms, offset))
        .unwrap_or_else(|| match input {
            TimestampInput::Number(n) => n.to_string(),
            TimestampInput::Text(t) => t.clone(),
        })
}

/// Format a UTC timestamp in the display offset.
pub fn format_timestamp(ts: Timestamp, offset: FixedOffset) -> String {
    ts.with_timezone(&offset).format(DISPLAY_FORMAT).to_string()
}

/// Lower bounds for the "today" and "this week" statistics windows.
///
/// "Today" starts at midnight in `offset`; "this week" is the trailing
/// seven days.
pub fn stats_windows(now: Timestamp, offset: FixedOffset) -> (Timestamp, Timestamp) {
    let local_now = now.with_timezone(&offset);
    let today_start = local_now
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .and_then(|midnight| offset.from_local_datetime(&midnight).single())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or(now);
    (today_start, now - Duration::days(7))
}
