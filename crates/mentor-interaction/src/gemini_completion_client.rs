//! GeminiCompletionClient - Direct REST implementation of [`TextCompletion`] for Gemini.
//!
//! Calls the `generateContent` endpoint and classifies every failure into a
//! [`CompletionErrorKind`] once, here, so the gateway's retry policy never
//! looks at vendor strings.

use async_trait::async_trait;
use mentor_core::completion::{CompletionError, CompletionErrorKind, TextCompletion};
use mentor_core::config::{AiSettings, SecretConfig};
use reqwest::{Client, StatusCode, header::HeaderValue};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Text completion client that talks to the Gemini HTTP API.
#[derive(Clone)]
pub struct GeminiCompletionClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiCompletionClient {
    /// Creates a client with the provided API key and model.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            model: model.into(),
            base_url: BASE_URL.to_string(),
        }
    }

    /// Builds a client from loaded secrets.
    ///
    /// Returns `None` when the key is missing or still a placeholder. The model
    /// named in `secret.json` wins over the `[ai]` setting.
    pub fn from_secrets(secrets: &SecretConfig, settings: &AiSettings) -> Option<Self> {
        let gemini = secrets.usable_gemini()?;
        let model = gemini
            .model_name
            .clone()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| settings.model.clone());
        Some(Self::new(gemini.api_key.clone(), model))
    }

    /// Points the client at another endpoint root (proxies, local mocks).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn send_request(&self, body: &GenerateContentRequest) -> Result<String, CompletionError> {
        let url = format!(
            "{}/{model}:generateContent?key={api_key}",
            self.base_url,
            model = self.model,
            api_key = self.api_key
        );

        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|err| {
                let kind = if err.is_connect() || err.is_timeout() {
                    CompletionErrorKind::Unavailable
                } else {
                    CompletionErrorKind::Other
                };
                tracing::error!("[AiGateway] Gemini request to {} failed ({:?}): {}", self.model, kind, err);
                CompletionError::new(kind, format!("Gemini API request failed: {err}"))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let retry_after = parse_retry_after(response.headers().get("retry-after"));
            let body_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read Gemini error body".to_string());
            let err = map_http_error(status, &body_text, retry_after);
            tracing::warn!(
                "[AiGateway] Gemini returned {} for {} ({:?}, retryable: {}): {}",
                status,
                self.model,
                err.kind,
                err.is_retryable(),
                err.message
            );
            return Err(err);
        }

        let parsed: GenerateContentResponse = response.json().await.map_err(|err| {
            CompletionError::new(
                CompletionErrorKind::Other,
                format!("Failed to parse Gemini response: {err}"),
            )
        })?;

        extract_text_response(parsed)
    }
}

#[async_trait]
impl TextCompletion for GeminiCompletionClient {
    fn name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        let request = GenerateContentRequest {
            contents: vec![Content {
                role: "user".to_string(),
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
        };
        self.send_request(&request).await
    }
}

#[derive(Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
}

#[derive(Serialize)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct Part {
    text: String,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<ContentResponse>,
}

#[derive(Deserialize)]
struct ContentResponse {
    #[serde(default)]
    parts: Vec<PartResponse>,
}

#[derive(Deserialize)]
struct PartResponse {
    text: Option<String>,
}

#[derive(Deserialize)]
struct ErrorWrapper {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
    status: Option<String>,
}

/// Joins the text parts of the first candidate.
fn extract_text_response(response: GenerateContentResponse) -> Result<String, CompletionError> {
    let text: String = response
        .candidates
        .and_then(|candidates| candidates.into_iter().next())
        .and_then(|candidate| candidate.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect()
        })
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(CompletionError::new(
            CompletionErrorKind::EmptyResponse,
            "Gemini API returned no text in the response candidates",
        ));
    }
    Ok(text)
}

/// Maps an HTTP status plus the vendor status string and message onto the
/// closed completion error set.
pub fn classify_failure(status: u16, vendor_status: &str, message: &str) -> CompletionErrorKind {
    let message = message.to_lowercase();
    if message.contains("overloaded") {
        return CompletionErrorKind::Overloaded;
    }
    if message.contains("quota") {
        return CompletionErrorKind::QuotaExceeded;
    }
    if status == 429 || vendor_status == "RESOURCE_EXHAUSTED" || message.contains("rate limit") {
        return CompletionErrorKind::RateLimited;
    }
    if message.contains("api key not valid") {
        return CompletionErrorKind::Unauthorized;
    }
    match (status, vendor_status) {
        (503, _) | (_, "UNAVAILABLE") => CompletionErrorKind::Unavailable,
        _ if message.contains("service unavailable") => CompletionErrorKind::Unavailable,
        (500 | 502 | 504, _) | (_, "INTERNAL" | "DEADLINE_EXCEEDED") => {
            CompletionErrorKind::Unavailable
        }
        (401 | 403, _) | (_, "UNAUTHENTICATED" | "PERMISSION_DENIED") => {
            CompletionErrorKind::Unauthorized
        }
        (400 | 404, _) | (_, "INVALID_ARGUMENT" | "NOT_FOUND" | "FAILED_PRECONDITION") => {
            CompletionErrorKind::InvalidRequest
        }
        _ => CompletionErrorKind::Other,
    }
}

fn map_http_error(status: StatusCode, body: &str, retry_after: Option<Duration>) -> CompletionError {
    let (vendor_status, message) = serde_json::from_str::<ErrorWrapper>(body)
        .map(|wrapper| {
            let status_text = wrapper.error.status.unwrap_or_default();
            let msg = wrapper.error.message.unwrap_or_else(|| body.to_string());
            (status_text, msg)
        })
        .unwrap_or_else(|_| (String::new(), body.to_string()));

    let kind = classify_failure(status.as_u16(), &vendor_status, &message);
    let message = if vendor_status.is_empty() {
        message
    } else {
        format!("{vendor_status}: {message}")
    };

    let error = CompletionError::new(kind, message).with_status(status.as_u16());
    match retry_after {
        Some(delay) => error.with_retry_after(delay),
        None => error,
    }
}

fn parse_retry_after(header: Option<&HeaderValue>) -> Option<Duration> {
    let value = header?.to_str().ok()?;
    if let Ok(seconds) = value.trim().parse::<u64>() {
        return Some(Duration::from_secs(seconds));
    }

    // HTTP-date form is not used by this API
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use mentor_core::config::GeminiConfig;

    #[test]
    fn test_overloaded_model_is_retryable() {
        let body = r#"{"error":{"code":503,"message":"The model is overloaded. Please try again later.","status":"UNAVAILABLE"}}"#;
        let err = map_http_error(StatusCode::SERVICE_UNAVAILABLE, body, None);
        assert_eq!(err.kind, CompletionErrorKind::Overloaded);
        assert!(err.is_retryable());
        assert_eq!(err.status_code, Some(503));
        assert!(err.message.starts_with("UNAVAILABLE: "));
    }

    #[test]
    fn test_quota_and_rate_limit_are_distinguished() {
        assert_eq!(
            classify_failure(429, "RESOURCE_EXHAUSTED", "You exceeded your current quota"),
            CompletionErrorKind::QuotaExceeded
        );
        assert_eq!(
            classify_failure(429, "RESOURCE_EXHAUSTED", "Too many requests"),
            CompletionErrorKind::RateLimited
        );
    }

    #[test]
    fn test_client_errors_are_not_retryable() {
        let kind = classify_failure(400, "INVALID_ARGUMENT", "API key not valid. Please pass a valid API key.");
        assert_eq!(kind, CompletionErrorKind::Unauthorized);
        assert!(!kind.is_retryable());

        let kind = classify_failure(404, "NOT_FOUND", "models/gemini-x is not found");
        assert_eq!(kind, CompletionErrorKind::InvalidRequest);
        assert_eq!(classify_failure(418, "", "teapot"), CompletionErrorKind::Other);
    }

    #[test]
    fn test_plain_text_error_body() {
        let err = map_http_error(
            StatusCode::BAD_GATEWAY,
            "upstream connect error",
            Some(Duration::from_secs(4)),
        );
        assert_eq!(err.kind, CompletionErrorKind::Unavailable);
        assert_eq!(err.message, "upstream connect error");
        assert_eq!(err.retry_after, Some(Duration::from_secs(4)));
    }

    #[test]
    fn test_parse_retry_after_seconds_only() {
        let header = HeaderValue::from_static("7");
        assert_eq!(parse_retry_after(Some(&header)), Some(Duration::from_secs(7)));
        let header = HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT");
        assert_eq!(parse_retry_after(Some(&header)), None);
        assert_eq!(parse_retry_after(None), None);
    }

    #[test]
    fn test_extract_text_joins_parts_of_first_candidate() {
        let response: GenerateContentResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"{\"a\":"},{"text":"1}"}]}},{"content":{"parts":[{"text":"ignored"}]}}]}"#,
        )
        .unwrap();
        assert_eq!(extract_text_response(response).unwrap(), "{\"a\":1}");

        let empty: GenerateContentResponse = serde_json::from_str(r#"{"candidates":[]}"#).unwrap();
        let err = extract_text_response(empty).unwrap_err();
        assert_eq!(err.kind, CompletionErrorKind::EmptyResponse);
    }

    #[test]
    fn test_from_secrets_skips_placeholders() {
        let settings = AiSettings::default();
        let mut secrets = SecretConfig {
            gemini: Some(GeminiConfig {
                api_key: "your_gemini_api_key_here".into(),
                model_name: None,
            }),
            firebase: None,
        };
        assert!(GeminiCompletionClient::from_secrets(&secrets, &settings).is_none());

        secrets.gemini = Some(GeminiConfig {
            api_key: "AIzaReal".into(),
            model_name: Some("gemini-2.5-flash".into()),
        });
        let client = GeminiCompletionClient::from_secrets(&secrets, &settings).unwrap();
        assert_eq!(client.model(), "gemini-2.5-flash");
        assert_eq!(client.name(), "gemini-2.5-flash");
    }
}
