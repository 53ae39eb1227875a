//! Timestamp normalization for values read back from a document store.
//!
//! Stores hand back timestamps in several encodings: native timestamp
//! objects (`{seconds, nanoseconds}`, or `{_seconds, _nanoseconds}` once
//! JSON-serialized), epoch milliseconds, or strings. Every one of them is
//! rewritten to an RFC 3339 string so entities deserialize into
//! `DateTime<Utc>` uniformly.

use crate::store::Fields;
use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use serde_json::Value;

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
];

/// Parses a wire timestamp in any recognized encoding.
///
/// Returns `None` for absent, null, or unrecognized values.
pub fn try_parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Object(map) => {
            let seconds = map
                .get("seconds")
                .or_else(|| map.get("_seconds"))
                .and_then(as_i64)?;
            let nanos = map
                .get("nanoseconds")
                .or_else(|| map.get("_nanoseconds"))
                .or_else(|| map.get("nanos"))
                .and_then(as_i64)
                .unwrap_or(0);
            let nanos = u32::try_from(nanos).ok()?;
            Utc.timestamp_opt(seconds, nanos).single()
        }
        Value::Number(_) => as_i64(value).and_then(DateTime::from_timestamp_millis),
        Value::String(text) => parse_timestamp_str(text.trim()),
        _ => None,
    }
}

fn as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        // Firestore REST encodes int64 as decimal strings
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn parse_timestamp_str(text: &str) -> Option<DateTime<Utc>> {
    if text.is_empty() {
        return None;
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Some(parsed.with_timezone(&Utc));
    }
    if let Ok(parsed) = DateTime::parse_from_rfc2822(text) {
        return Some(parsed.with_timezone(&Utc));
    }
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(naive.and_utc());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
    }
    if let Ok(millis) = text.parse::<i64>() {
        return DateTime::from_timestamp_millis(millis);
    }
    None
}

/// Normalizes a timestamp that must be present, defaulting to `now`.
pub fn normalize_timestamp(value: Option<&Value>, now: DateTime<Utc>) -> DateTime<Utc> {
    value.and_then(try_parse_timestamp).unwrap_or(now)
}

/// Canonical wire encoding for a timestamp.
pub fn to_wire(timestamp: DateTime<Utc>) -> Value {
    Value::String(timestamp.to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// Rewrites timestamp fields of a document in place.
///
/// Required fields are always present afterwards (`now` when absent or
/// unrecognized). Optional fields are rewritten when recognized and removed
/// otherwise.
pub fn normalize_timestamp_fields(
    fields: &mut Fields,
    required: &[&str],
    optional: &[&str],
    now: DateTime<Utc>,
) {
    for name in required {
        let normalized = normalize_timestamp(fields.get(*name), now);
        fields.insert((*name).to_string(), to_wire(normalized));
    }
    for name in optional {
        match fields.get(*name).and_then(try_parse_timestamp) {
            Some(parsed) => {
                fields.insert((*name).to_string(), to_wire(parsed));
            }
            None => {
                fields.remove(*name);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn at(text: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(text)
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn test_parses_native_timestamp_objects() {
        let expected = at("2025-01-15T10:00:00Z");
        let secs = expected.timestamp();
        assert_eq!(
            try_parse_timestamp(&json!({"seconds": secs, "nanoseconds": 0})),
            Some(expected)
        );
        assert_eq!(
            try_parse_timestamp(&json!({"_seconds": secs, "_nanoseconds": 0})),
            Some(expected)
        );
    }

    #[test]
    fn test_parses_epoch_millis_and_strings() {
        let expected = at("2025-01-15T10:00:00Z");
        assert_eq!(
            try_parse_timestamp(&json!(expected.timestamp_millis())),
            Some(expected)
        );
        assert_eq!(
            try_parse_timestamp(&json!("2025-01-15T10:00:00.000Z")),
            Some(expected)
        );
        assert_eq!(
            try_parse_timestamp(&json!("2025-01-15T10:00:00")),
            Some(expected)
        );
        assert_eq!(
            try_parse_timestamp(&json!("2025-01-15")),
            Some(at("2025-01-15T00:00:00Z"))
        );
    }

    #[test]
    fn test_unrecognized_values() {
        assert_eq!(try_parse_timestamp(&json!("not a date")), None);
        assert_eq!(try_parse_timestamp(&json!(true)), None);
        assert_eq!(try_parse_timestamp(&Value::Null), None);
    }

    #[test]
    fn test_normalize_fields_defaults_required_and_drops_optional() {
        let now = at("2025-03-01T08:00:00Z");
        let mut fields = Fields::new();
        fields.insert("createdAt".into(), json!("garbage"));
        fields.insert("dueDate".into(), json!("garbage"));
        fields.insert("completedAt".into(), json!(1_736_935_200_000i64));

        normalize_timestamp_fields(&mut fields, &["createdAt"], &["dueDate", "completedAt"], now);

        assert_eq!(fields["createdAt"], to_wire(now));
        assert!(!fields.contains_key("dueDate"));
        assert_eq!(fields["completedAt"], to_wire(at("2025-01-15T10:00:00Z")));
    }
}
