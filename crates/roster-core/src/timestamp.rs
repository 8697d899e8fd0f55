//! Persisted visit timestamp format: `DD/MM/YYYY hh:mm AM|PM`, minute precision.

use chrono::{NaiveDate, NaiveDateTime, Timelike};

/// strftime pattern of the `visits` timestamp columns.
pub const VISIT_TIMESTAMP_FORMAT: &str = "%d/%m/%Y %I:%M %p";

/// strftime pattern of the day prefix of a visit timestamp.
pub const VISIT_DAY_FORMAT: &str = "%d/%m/%Y";

/// Drop seconds and sub-second precision.
pub fn truncate_to_minute(ts: NaiveDateTime) -> NaiveDateTime {
    ts.with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(ts)
}

pub fn format_visit(ts: NaiveDateTime) -> String {
    ts.format(VISIT_TIMESTAMP_FORMAT).to_string()
}

pub fn parse_visit(s: &str) -> Result<NaiveDateTime, chrono::ParseError> {
    NaiveDateTime::parse_from_str(s, VISIT_TIMESTAMP_FORMAT)
}

pub fn format_day(day: NaiveDate) -> String {
    day.format(VISIT_DAY_FORMAT).to_string()
}

/// Parse a day given either as `YYYY-MM-DD` or as the legacy `DD/MM/YYYY`.
pub fn parse_day(s: &str) -> Result<NaiveDate, chrono::ParseError> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").or_else(|_| NaiveDate::parse_from_str(s, VISIT_DAY_FORMAT))
}
