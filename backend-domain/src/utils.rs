use anyhow::{anyhow, Result};
use chrono::{NaiveDate, NaiveDateTime};

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
pub const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn format_timestamp(value: NaiveDateTime) -> String {
    value.format(TIMESTAMP_FORMAT).to_string()
}

pub fn format_date(value: NaiveDate) -> String {
    value.format(DATE_FORMAT).to_string()
}

/// Parses a `YYYY-MM-DD` date, zero padding included. Stored timestamps are
/// matched by text prefix, so "2024-5-1" must be rejected rather than
/// silently matching nothing.
pub fn parse_date(date: &str) -> Result<NaiveDate> {
    let parsed = NaiveDate::parse_from_str(date, DATE_FORMAT).map_err(|err| anyhow!(err))?;
    if format_date(parsed) != date {
        return Err(anyhow!("expected YYYY-MM-DD, got '{}'", date));
    }
    Ok(parsed)
}
