//! Write payload sanitization.
//!
//! Document stores reject explicit absent-value fields, so every write
//! payload has its `null` entries removed first. Falsy values are data.

use crate::store::Fields;
use serde::Serialize;
use serde_json::Value;

/// Removes `null` entries from objects, recursively.
pub fn strip_nulls(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(sanitize_fields(map)),
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .filter(|item| !item.is_null())
                .map(strip_nulls)
                .collect(),
        ),
        other => other,
    }
}

/// Removes `null` entries from a field map, recursively.
pub fn sanitize_fields(fields: Fields) -> Fields {
    fields
        .into_iter()
        .filter(|(_, value)| !value.is_null())
        .map(|(key, value)| (key, strip_nulls(value)))
        .collect()
}

/// Serializes a payload struct into sanitized document fields.
///
/// Fails when the payload does not serialize to a JSON object.
pub fn to_fields<T: Serialize>(payload: &T) -> crate::Result<Fields> {
    match serde_json::to_value(payload)? {
        Value::Object(map) => Ok(sanitize_fields(map)),
        other => Err(crate::MentorError::internal(format!(
            "payload must serialize to an object, got {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_strips_nulls_but_keeps_falsy_values() {
        let value = json!({
            "title": "",
            "isPrivate": false,
            "energy": 0,
            "notes": null,
            "nested": {"a": null, "b": 1},
            "tags": ["x", null]
        });
        let cleaned = strip_nulls(value);
        assert_eq!(
            cleaned,
            json!({
                "title": "",
                "isPrivate": false,
                "energy": 0,
                "nested": {"b": 1},
                "tags": ["x"]
            })
        );
    }

    #[test]
    fn test_to_fields_rejects_non_objects() {
        assert!(to_fields(&42).is_err());
        let fields = to_fields(&json!({"a": 1, "b": null})).unwrap();
        assert_eq!(fields.len(), 1);
    }
}
