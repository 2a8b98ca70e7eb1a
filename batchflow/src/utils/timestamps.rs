//! Timestamp helpers for registry and config documents.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SubsecRound, TimeZone, Utc};
use thiserror::Error;

/// Represents a timestamp that can be serialized/deserialized.
pub type Timestamp = DateTime<Utc>;

/// Errors that can occur during timestamp parsing.
#[derive(Debug, Error)]
pub enum TimestampError {
    /// The timestamp string is empty.
    #[error("Empty timestamp string")]
    EmptyString,

    /// The timestamp value is invalid.
    #[error("Invalid timestamp: {0}")]
    InvalidFormat(String),
}

/// Returns the current UTC time as an ISO 8601 formatted string.
///
/// Format: `YYYY-MM-DDTHH:MM:SS.ffffff+00:00`
///
/// # Examples
///
/// ```
/// use batchflow::utils::iso_timestamp;
///
/// let ts = iso_timestamp();
/// assert!(ts.contains('T'));
/// assert!(ts.ends_with("+00:00"));
/// ```
#[must_use]
pub fn iso_timestamp() -> String {
    format_iso8601(&Utc::now())
}

/// Returns the current UTC timestamp, truncated to the microsecond
/// precision timestamps are stored with.
#[must_use]
pub fn now_utc() -> Timestamp {
    Utc::now().trunc_subsecs(6)
}

/// Formats a timestamp as ISO 8601 string.
#[must_use]
pub fn format_iso8601(dt: &Timestamp) -> String {
    dt.format("%Y-%m-%dT%H:%M:%S%.6f+00:00").to_string()
}

/// Parses an ISO 8601 timestamp.
///
/// Accepts RFC 3339 strings with an offset or `Z`, and naive date-times
/// (taken as UTC), with or without fractional seconds, using `T` or a space
/// as the separator. A bare date is midnight.
///
/// # Errors
///
/// Returns `TimestampError` if the input cannot be parsed.
pub fn parse_timestamp(input: &str) -> Result<Timestamp, TimestampError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(TimestampError::EmptyString);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.with_timezone(&Utc));
    }

    let formats = [
        "%Y-%m-%dT%H:%M:%S%.f%:z",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
    ];

    for fmt in formats {
        if let Ok(dt) = DateTime::parse_from_str(trimmed, fmt) {
            return Ok(dt.with_timezone(&Utc));
        }
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Ok(Utc.from_utc_datetime(&naive));
        }
    }

    if let Some(naive) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
    {
        return Ok(Utc.from_utc_datetime(&naive));
    }

    Err(TimestampError::InvalidFormat(input.to_string()))
}

/// Serde adapter writing [`format_iso8601`] and reading [`parse_timestamp`].
pub mod iso8601 {
    use super::{format_iso8601, parse_timestamp, Timestamp};
    use serde::{Deserialize, Deserializer, Serializer};

    /// Serializes a timestamp as an ISO 8601 string.
    pub fn serialize<S: Serializer>(value: &Timestamp, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format_iso8601(value))
    }

    /// Deserializes a timestamp from any accepted ISO 8601 form.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Timestamp, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse_timestamp(&raw).map_err(serde::de::Error::custom)
    }
}
