//! ISO calendar-date parsing for request input

use chrono::NaiveDate;

use crate::error::CoreError;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parse a required `YYYY-MM-DD` value
pub fn parse_date(field: &'static str, value: &str) -> Result<NaiveDate, CoreError> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).map_err(|_| CoreError::InvalidDate {
        field,
        value: value.to_string(),
    })
}

/// Parse an optional date; absent and blank values both yield `None`
pub fn parse_optional_date(
    field: &'static str,
    value: Option<&str>,
) -> Result<Option<NaiveDate>, CoreError> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) => parse_date(field, v).map(Some),
    }
}
