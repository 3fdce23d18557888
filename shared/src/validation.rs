//! Field-level parsing for upstream feed payloads
//!
//! IMD feeds deliver every value as a string. These helpers convert them into
//! typed values and report the offending field on failure so an adapter can
//! reject the whole record.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use thiserror::Error;

use crate::types::ist_to_utc;

/// Date layout shared by all IMD JSON feeds
pub const FEED_DATE_FORMAT: &str = "%Y-%m-%d";

/// A required field that could not be converted
#[derive(Debug, Clone, Error, PartialEq)]
#[error("invalid {field} {value:?}: {reason}")]
pub struct FieldError {
    pub field: String,
    pub value: String,
    pub reason: String,
}

impl FieldError {
    pub fn new(field: &str, value: &str, reason: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

/// Parse a required floating point field
pub fn parse_f64_field(field: &str, raw: &str) -> Result<f64, FieldError> {
    let value: f64 = raw
        .trim()
        .parse()
        .map_err(|e: std::num::ParseFloatError| FieldError::new(field, raw, e.to_string()))?;
    if !value.is_finite() {
        return Err(FieldError::new(field, raw, "value is not finite"));
    }
    Ok(value)
}

/// Parse a required integer field
pub fn parse_i64_field(field: &str, raw: &str) -> Result<i64, FieldError> {
    raw.trim()
        .parse()
        .map_err(|e: std::num::ParseIntError| FieldError::new(field, raw, e.to_string()))
}

/// Parse a required `YYYY-MM-DD` date field
pub fn parse_date_field(field: &str, raw: &str) -> Result<NaiveDate, FieldError> {
    NaiveDate::parse_from_str(raw.trim(), FEED_DATE_FORMAT)
        .map_err(|e| FieldError::new(field, raw, e.to_string()))
}

/// Combine a feed date and a time-of-day (in `time_format`) given in India
/// local time into an absolute instant
pub fn parse_ist_datetime(
    field: &str,
    date: &str,
    time: &str,
    time_format: &str,
) -> Result<DateTime<Utc>, FieldError> {
    let combined = format!("{} {}", date.trim(), time.trim());
    let layout = format!("{} {}", FEED_DATE_FORMAT, time_format);
    let local = NaiveDateTime::parse_from_str(&combined, &layout)
        .map_err(|e| FieldError::new(field, &combined, e.to_string()))?;
    ist_to_utc(local).ok_or_else(|| FieldError::new(field, &combined, "not representable in IST"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_f64_accepts_padded_values() {
        assert_eq!(parse_f64_field("rh", " 87.5 ").unwrap(), 87.5);
        assert_eq!(parse_f64_field("rh", "-3").unwrap(), -3.0);
    }

    #[test]
    fn test_parse_f64_rejects_garbage() {
        let err = parse_f64_field("rainfall", "NA").unwrap_err();
        assert_eq!(err.field, "rainfall");
        assert_eq!(err.value, "NA");
        assert!(parse_f64_field("rainfall", "").is_err());
        assert!(parse_f64_field("rainfall", "inf").is_err());
        assert!(parse_f64_field("rainfall", "NaN").is_err());
    }

    #[test]
    fn test_parse_i64() {
        assert_eq!(parse_i64_field("id", "244").unwrap(), 244);
        assert!(parse_i64_field("id", "24.4").is_err());
    }

    #[test]
    fn test_parse_date() {
        let date = parse_date_field("date", "2024-07-15").unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2024, 7, 15).unwrap());
        assert!(parse_date_field("date", "15/07/2024").is_err());
    }

    #[test]
    fn test_parse_ist_datetime_compact_time() {
        let at = parse_ist_datetime("toi", "2024-07-15", "1545", "%H%M").unwrap();
        assert_eq!(at.to_rfc3339(), "2024-07-15T10:15:00+00:00");
    }

    #[test]
    fn test_parse_ist_datetime_seconds() {
        let at = parse_ist_datetime("utc", "2024-07-15", "08:30:00", "%H:%M:%S").unwrap();
        assert_eq!(at.to_rfc3339(), "2024-07-15T03:00:00+00:00");
        assert!(parse_ist_datetime("utc", "2024-07-15", "", "%H:%M:%S").is_err());
    }
}
