//! Lenient deserializers for API fields that arrive as either strings or
//! numbers depending on the endpoint.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{de, Deserialize, Deserializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    String(String),
    Integer(i64),
    Float(f64),
}

/// `"12"`, `12` or `null` into `Option<String>`
pub fn optional_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<StringOrNumber>::deserialize(deserializer)? {
        Some(StringOrNumber::String(s)) => Some(s),
        Some(StringOrNumber::Integer(n)) => Some(n.to_string()),
        Some(StringOrNumber::Float(n)) => Some(n.to_string()),
        None => None,
    })
}

/// Decimal money values, sent as `"125000.00"` by the aggregate endpoints.
/// `NaN` and infinities are rejected.
pub fn decimal<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = match StringOrNumber::deserialize(deserializer)? {
        StringOrNumber::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| de::Error::custom(format!("invalid decimal amount: {:?}", s)))?,
        StringOrNumber::Integer(n) => n as f64,
        StringOrNumber::Float(n) => n,
    };
    if !value.is_finite() {
        return Err(de::Error::custom(format!("non-finite decimal amount: {}", value)));
    }
    Ok(value)
}

/// Timestamps without an offset, read as UTC
const NAIVE_DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// Parse an RFC 3339 timestamp, a naive `YYYY-MM-DD HH:MM:SS` /
/// `YYYY-MM-DDTHH:MM:SS` timestamp, or a bare `YYYY-MM-DD` date (taken as UTC
/// midnight)
pub fn parse_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Coerce a date string or a millisecond epoch into a UTC timestamp
pub fn coerced_date<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    match StringOrNumber::deserialize(deserializer)? {
        StringOrNumber::String(raw) => {
            parse_date(&raw).ok_or_else(|| de::Error::custom(format!("invalid date: {:?}", raw)))
        }
        StringOrNumber::Integer(ms) => DateTime::from_timestamp_millis(ms)
            .ok_or_else(|| de::Error::custom(format!("epoch out of range: {}", ms))),
        StringOrNumber::Float(ms) => Some(ms)
            .filter(|ms| ms.is_finite())
            .and_then(|ms| DateTime::from_timestamp_millis(ms.trunc() as i64))
            .ok_or_else(|| de::Error::custom(format!("epoch out of range: {}", ms))),
    }
}
