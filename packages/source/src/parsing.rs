//! Field-level parsing of raw provider values.
//!
//! Socrata serializes everything as JSON strings, but republished datasets
//! occasionally switch a column to a number, so every helper accepts both.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use crime_dash_incident_models::UNKNOWN;
use serde_json::Value;

use crate::RawRecord;

/// Parses a Socrata floating timestamp (ISO 8601 with optional fractional
/// seconds), an RFC 3339 timestamp, or a bare `YYYY-MM-DD` date.
///
/// Offsets are discarded rather than converted so that the calendar date
/// stays the one the provider reported.
#[must_use]
pub fn parse_socrata_date(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
        return Some(naive.and_utc());
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_local().and_utc());
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Looks up `key` in `record`, treating an unresolved key as absent.
fn lookup<'a>(record: &'a RawRecord, key: Option<&str>) -> Option<&'a Value> {
    record.get(key?)
}

/// Parses the timestamp held in the `key` field.
#[must_use]
pub fn timestamp_field(record: &RawRecord, key: &str) -> Option<DateTime<Utc>> {
    record.get(key)?.as_str().and_then(parse_socrata_date)
}

/// Parses a coordinate from a string or number field. Non-finite values are
/// rejected.
#[must_use]
pub fn coordinate_field(record: &RawRecord, key: Option<&str>) -> Option<f64> {
    let value = match lookup(record, key)? {
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        Value::Number(n) => n.as_f64()?,
        _ => return None,
    };
    value.is_finite().then_some(value)
}

/// Reads a categorical field as text, substituting [`UNKNOWN`] for missing,
/// null, or blank values.
#[must_use]
pub fn text_field(record: &RawRecord, key: Option<&str>) -> String {
    match lookup(record, key) {
        Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => UNKNOWN.to_string(),
    }
}
