//! Configuration types.
//!
//! `config.toml` carries tunables ([`MentorSettings`]); `secret.json` carries
//! credentials ([`SecretConfig`]). Loading and environment overrides live in
//! the infrastructure crate.

use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-pro";

/// Returns `true` for values that are missing in practice: empty strings and
/// the `your_...` placeholders written by the setup scripts.
pub fn is_placeholder(value: &str) -> bool {
    let trimmed = value.trim();
    trimmed.is_empty() || trimmed.starts_with("your_") || trimmed.starts_with("YOUR_")
}

fn present(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !is_placeholder(v))
}

/// Root of `config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MentorSettings {
    pub ai: AiSettings,
    pub store: StoreSettings,
}

/// AI gateway tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AiSettings {
    /// Model used when `secret.json` does not name one.
    pub model: String,
    /// Freshness window of cached responses.
    pub cache_ttl_secs: u64,
    /// Minimum spacing between two dispatched completion requests.
    pub min_request_spacing_ms: u64,
    /// Total dispatch attempts per request (first try included).
    pub max_attempts: u32,
    /// Backoff before retry `n` is `backoff_base_ms * 2^n`.
    pub backoff_base_ms: u64,
}

impl Default for AiSettings {
    fn default() -> Self {
        Self {
            model: DEFAULT_GEMINI_MODEL.to_string(),
            cache_ttl_secs: 300,
            min_request_spacing_ms: 2_000,
            max_attempts: 3,
            backoff_base_ms: 1_000,
        }
    }
}

impl AiSettings {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn min_request_spacing(&self) -> Duration {
        Duration::from_millis(self.min_request_spacing_ms)
    }

    pub fn backoff_base(&self) -> Duration {
        Duration::from_millis(self.backoff_base_ms)
    }
}

/// Persistence tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    pub mood_limit: usize,
    pub journal_limit: usize,
    /// How long to wait for the auth session to settle.
    pub auth_ready_timeout_secs: u64,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            mood_limit: 7,
            journal_limit: 10,
            auth_ready_timeout_secs: 10,
        }
    }
}

impl StoreSettings {
    pub fn auth_ready_timeout(&self) -> Duration {
        Duration::from_secs(self.auth_ready_timeout_secs)
    }
}

/// Root of `secret.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SecretConfig {
    #[serde(default)]
    pub gemini: Option<GeminiConfig>,
    #[serde(default)]
    pub firebase: Option<FirebaseConfig>,
}

impl SecretConfig {
    /// The Gemini configuration, when its key is usable.
    pub fn usable_gemini(&self) -> Option<&GeminiConfig> {
        self.gemini.as_ref().filter(|g| g.is_configured())
    }

    /// The Firebase configuration, when its credentials are usable.
    pub fn usable_firebase(&self) -> Option<&FirebaseConfig> {
        self.firebase.as_ref().filter(|f| f.is_configured())
    }
}

/// Gemini API configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeminiConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub model_name: Option<String>,
}

impl GeminiConfig {
    pub fn is_configured(&self) -> bool {
        !is_placeholder(&self.api_key)
    }
}

/// Firebase web-app configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FirebaseConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub auth_domain: Option<String>,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub storage_bucket: Option<String>,
    #[serde(default)]
    pub messaging_sender_id: Option<String>,
    #[serde(default)]
    pub app_id: Option<String>,
}

impl FirebaseConfig {
    /// Usable when the API key, auth domain and project id are all real values.
    pub fn is_configured(&self) -> bool {
        present(&self.api_key) && present(&self.auth_domain) && present(&self.project_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholders_are_not_configured() {
        assert!(is_placeholder(""));
        assert!(is_placeholder("your_firebase_api_key_here"));
        assert!(is_placeholder("  your_project_id  "));
        assert!(!is_placeholder("AIzaSyReal"));

        let firebase = FirebaseConfig {
            api_key: Some("your_firebase_api_key_here".into()),
            auth_domain: Some("demo.firebaseapp.com".into()),
            project_id: Some("demo".into()),
            ..Default::default()
        };
        assert!(!firebase.is_configured());

        let firebase = FirebaseConfig {
            api_key: Some("AIzaSyReal".into()),
            ..firebase
        };
        assert!(firebase.is_configured());
    }

    #[test]
    fn test_settings_defaults_from_partial_toml() {
        let settings: MentorSettings = toml::from_str("[ai]\nmax_attempts = 2\n").unwrap();
        assert_eq!(settings.ai.max_attempts, 2);
        assert_eq!(settings.ai.cache_ttl_secs, 300);
        assert_eq!(settings.ai.model, DEFAULT_GEMINI_MODEL);
        assert_eq!(settings.store.mood_limit, 7);
    }
}
