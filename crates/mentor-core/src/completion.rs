//! Text completion capability.
//!
//! The AI gateway reaches the generative model only through
//! [`TextCompletion`]: prompt text in, raw response text out.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// The closed set of failure classes a completion adapter may report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompletionErrorKind {
    /// The model is overloaded.
    Overloaded,
    /// Too many requests in the current window.
    RateLimited,
    /// The service is temporarily unavailable (5xx, connect/timeout).
    Unavailable,
    /// The account's quota is exhausted.
    QuotaExceeded,
    /// The request was rejected (bad prompt, unsupported model, ...).
    InvalidRequest,
    /// The credential was rejected.
    Unauthorized,
    /// The service answered without any usable text.
    EmptyResponse,
    /// Anything else.
    Other,
}

impl CompletionErrorKind {
    /// Whether a request failing with this kind is worth repeating.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Overloaded | Self::RateLimited | Self::Unavailable | Self::QuotaExceeded
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Overloaded => "overloaded",
            Self::RateLimited => "rate-limited",
            Self::Unavailable => "unavailable",
            Self::QuotaExceeded => "quota-exceeded",
            Self::InvalidRequest => "invalid-request",
            Self::Unauthorized => "unauthorized",
            Self::EmptyResponse => "empty-response",
            Self::Other => "other",
        }
    }
}

/// A classified completion failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Completion error ({}): {message}", .kind.as_str())]
pub struct CompletionError {
    pub kind: CompletionErrorKind,
    pub message: String,
    /// HTTP status, when the failure came from an HTTP response.
    pub status_code: Option<u16>,
    /// Server-provided hint for when to retry.
    pub retry_after: Option<Duration>,
}

impl CompletionError {
    pub fn new(kind: CompletionErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status_code: None,
            retry_after: None,
        }
    }

    pub fn with_status(mut self, status_code: u16) -> Self {
        self.status_code = Some(status_code);
        self
    }

    pub fn with_retry_after(mut self, retry_after: Duration) -> Self {
        self.retry_after = Some(retry_after);
        self
    }

    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}

/// A generative text completion service.
#[async_trait]
pub trait TextCompletion: Send + Sync {
    /// Short model/provider name, for log lines.
    fn name(&self) -> &str;

    /// Generates a completion for `prompt` and returns the raw text.
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError>;
}
