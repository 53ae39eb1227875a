//! Extraction of the JSON payload from raw model output.

use regex::Regex;
use serde::de::DeserializeOwned;
use std::sync::LazyLock;

static JSON_FENCE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"```json\s*").expect("valid json fence pattern"));
static ANY_FENCE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"```\s*").expect("valid fence pattern"));
static OUTER_OBJECT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)\{.*\}").expect("valid object pattern"));

/// Strips Markdown code fences and isolates the outermost `{...}` span when
/// the text does not already start with one.
pub fn clean_response(text: &str) -> String {
    let without_json_fence = JSON_FENCE.replace_all(text.trim(), "");
    let cleaned = ANY_FENCE.replace_all(&without_json_fence, "");
    let cleaned = cleaned.trim();

    if cleaned.starts_with('{') {
        return cleaned.to_string();
    }
    OUTER_OBJECT
        .find(cleaned)
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| cleaned.to_string())
}

/// Cleans `text` and deserializes it into `T`.
///
/// Returns `None` when the payload is not valid JSON of the expected shape.
pub fn parse_structured<T: DeserializeOwned>(text: &str) -> Option<T> {
    let cleaned = clean_response(text);
    match serde_json::from_str(&cleaned) {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::warn!("[AiGateway] Unusable model output, using fallback: {}", err);
            None
        }
    }
}
