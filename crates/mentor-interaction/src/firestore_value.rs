//! Conversion between plain JSON field maps and Firestore's typed `Value` encoding.
//!
//! Strings holding RFC 3339 instants are written as `timestampValue` so the
//! server orders them chronologically; they are read back as RFC 3339
//! strings and normalized by the entity layer.

use chrono::{DateTime, SecondsFormat, Utc};
use mentor_core::store::Fields;
use serde_json::{Map, Value, json};

/// Encodes one JSON value.
pub fn encode_value(value: &Value) -> Value {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                json!({ "integerValue": i.to_string() })
            } else if let Some(u) = n.as_u64() {
                json!({ "integerValue": u.to_string() })
            } else {
                json!({ "doubleValue": n.as_f64().unwrap_or_default() })
            }
        }
        Value::String(s) => match DateTime::parse_from_rfc3339(s) {
            Ok(instant) => json!({
                "timestampValue": instant.with_timezone(&Utc).to_rfc3339_opts(SecondsFormat::AutoSi, true)
            }),
            Err(_) => json!({ "stringValue": s }),
        },
        Value::Array(items) => json!({
            "arrayValue": { "values": items.iter().map(encode_value).collect::<Vec<_>>() }
        }),
        Value::Object(map) => json!({ "mapValue": { "fields": encode_fields(map) } }),
    }
}

/// Encodes a document field map.
pub fn encode_fields(fields: &Fields) -> Value {
    Value::Object(
        fields
            .iter()
            .map(|(name, value)| (name.clone(), encode_value(value)))
            .collect(),
    )
}

/// Decodes one typed value. Unknown encodings decode to `null`.
pub fn decode_value(value: &Value) -> Value {
    let Some(object) = value.as_object() else {
        return Value::Null;
    };
    let Some((kind, inner)) = object.iter().next() else {
        return Value::Null;
    };
    match kind.as_str() {
        "nullValue" => Value::Null,
        "booleanValue" => Value::Bool(inner.as_bool().unwrap_or_default()),
        "integerValue" => inner
            .as_str()
            .and_then(|s| s.parse::<i64>().ok())
            .map(Value::from)
            .or_else(|| inner.as_i64().map(Value::from))
            .unwrap_or(Value::Null),
        "doubleValue" => inner.as_f64().map(Value::from).unwrap_or(Value::Null),
        "timestampValue" | "stringValue" | "referenceValue" | "bytesValue" => inner.clone(),
        "geoPointValue" => inner.clone(),
        "arrayValue" => Value::Array(
            inner
                .get("values")
                .and_then(Value::as_array)
                .map(|values| values.iter().map(decode_value).collect())
                .unwrap_or_default(),
        ),
        "mapValue" => Value::Object(
            inner
                .get("fields")
                .and_then(Value::as_object)
                .map(decode_fields)
                .unwrap_or_default(),
        ),
        _ => Value::Null,
    }
}

/// Decodes a document's `fields` object.
pub fn decode_fields(fields: &Map<String, Value>) -> Fields {
    fields
        .iter()
        .map(|(name, value)| (name.clone(), decode_value(value)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalars_encode_by_type() {
        assert_eq!(encode_value(&json!(3)), json!({"integerValue": "3"}));
        assert_eq!(encode_value(&json!(6.5)), json!({"doubleValue": 6.5}));
        assert_eq!(encode_value(&json!(false)), json!({"booleanValue": false}));
        assert_eq!(encode_value(&json!("Read Ch.3")), json!({"stringValue": "Read Ch.3"}));
        assert_eq!(encode_value(&json!("")), json!({"stringValue": ""}));
    }

    #[test]
    fn test_rfc3339_strings_become_timestamps() {
        assert_eq!(
            encode_value(&json!("2025-03-10T09:00:00.000Z")),
            json!({"timestampValue": "2025-03-10T09:00:00Z"})
        );
        assert_eq!(
            encode_value(&json!("2025-03-10T14:30:00+05:30")),
            json!({"timestampValue": "2025-03-10T09:00:00Z"})
        );
        assert_eq!(encode_value(&json!("2025-03-10")), json!({"stringValue": "2025-03-10"}));
    }

    #[test]
    fn test_document_decodes_nested_values() {
        let raw = json!({
            "title": {"stringValue": "Weekly"},
            "count": {"integerValue": "12"},
            "rate": {"doubleValue": 0.75},
            "createdAt": {"timestampValue": "2025-03-10T09:00:00.123456Z"},
            "goals": {"arrayValue": {"values": [{"stringValue": "Sleep"}, {"stringValue": "Revise"}]}},
            "empty": {"arrayValue": {}},
            "meta": {"mapValue": {"fields": {"private": {"booleanValue": true}}}},
            "gone": {"nullValue": null}
        });
        let decoded = decode_fields(raw.as_object().unwrap());
        assert_eq!(
            Value::Object(decoded),
            json!({
                "title": "Weekly",
                "count": 12,
                "rate": 0.75,
                "createdAt": "2025-03-10T09:00:00.123456Z",
                "goals": ["Sleep", "Revise"],
                "empty": [],
                "meta": {"private": true},
                "gone": null
            })
        );
    }
}
