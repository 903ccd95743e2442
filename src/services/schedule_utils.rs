use chrono::{
    DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc,
};

use crate::error::{AppError, AppResult};

const NAIVE_DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// Read a timestamp written by the model.
///
/// RFC 3339 is preferred; timestamps without an offset are read in
/// `local_offset`, the offset of the user's "now".
pub fn parse_model_timestamp(value: &str, local_offset: FixedOffset) -> Option<DateTime<Utc>> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(parsed.with_timezone(&Utc));
    }

    NAIVE_DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(trimmed, format).ok())
        .and_then(|naive| local_offset.from_local_datetime(&naive).single())
        .map(|local| local.with_timezone(&Utc))
}

/// Calendar day of a stored date or timestamp (`2025-03-01` or RFC 3339).
pub fn parse_calendar_date(value: &str) -> Option<NaiveDate> {
    let trimmed = value.trim();
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(trimmed)
                .ok()
                .map(|parsed| parsed.date_naive())
        })
}

pub fn parse_clock_time(value: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M").ok()
}

pub fn add_minutes(dt: DateTime<Utc>, minutes: u32) -> AppResult<DateTime<Utc>> {
    dt.checked_add_signed(Duration::minutes(i64::from(minutes)))
        .ok_or_else(|| AppError::validation("时间计算超出范围"))
}

pub fn format_clock(dt: DateTime<FixedOffset>) -> String {
    dt.format("%H:%M").to_string()
}
