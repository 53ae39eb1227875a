//! Configuration service implementation.
//!
//! Loads [`MentorSettings`] from `config.toml` and [`SecretConfig`] from
//! `secret.json`, then layers environment variables over the secrets.
//! Missing files mean defaults; unreadable ones are logged and ignored.

use crate::paths::MentorPaths;
use mentor_core::config::{FirebaseConfig, GeminiConfig, MentorSettings, SecretConfig};
use mentor_core::{MentorError, Result};
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

/// Environment variables recognized for each secret, in lookup order.
const GEMINI_API_KEY: &[&str] = &["GEMINI_API_KEY", "VITE_GEMINI_API_KEY"];
const FIREBASE_API_KEY: &[&str] = &["FIREBASE_API_KEY", "VITE_FIREBASE_API_KEY"];
const FIREBASE_AUTH_DOMAIN: &[&str] = &["FIREBASE_AUTH_DOMAIN", "VITE_FIREBASE_AUTH_DOMAIN"];
const FIREBASE_PROJECT_ID: &[&str] = &["FIREBASE_PROJECT_ID", "VITE_FIREBASE_PROJECT_ID"];
const FIREBASE_STORAGE_BUCKET: &[&str] =
    &["FIREBASE_STORAGE_BUCKET", "VITE_FIREBASE_STORAGE_BUCKET"];
const FIREBASE_MESSAGING_SENDER_ID: &[&str] = &[
    "FIREBASE_MESSAGING_SENDER_ID",
    "VITE_FIREBASE_MESSAGING_SENDER_ID",
];
const FIREBASE_APP_ID: &[&str] = &["FIREBASE_APP_ID", "VITE_FIREBASE_APP_ID"];

/// Configuration service that loads and caches settings and secrets.
///
/// Both files are read lazily on first access and cached until
/// [`ConfigService::invalidate_cache`] is called.
#[derive(Debug, Clone)]
pub struct ConfigService {
    paths: MentorPaths,
    settings: Arc<RwLock<Option<MentorSettings>>>,
    secrets: Arc<RwLock<Option<SecretConfig>>>,
}

impl ConfigService {
    /// Creates a service over the platform config directory.
    pub fn new() -> Self {
        Self::with_base_dir(None)
    }

    /// Creates a service over `base` (used by tests and portable installs).
    pub fn with_base_dir(base: Option<&Path>) -> Self {
        Self {
            paths: MentorPaths::new(base),
            settings: Arc::new(RwLock::new(None)),
            secrets: Arc::new(RwLock::new(None)),
        }
    }

    pub fn paths(&self) -> &MentorPaths {
        &self.paths
    }

    /// Gets the settings, loading from `config.toml` if not cached.
    pub fn settings(&self) -> MentorSettings {
        {
            let read_lock = self.settings.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(cached) = read_lock.as_ref() {
                return cached.clone();
            }
        }

        let loaded = match self.load_settings() {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!("[Config] Falling back to default settings: {}", e);
                MentorSettings::default()
            }
        };

        let mut write_lock = self.settings.write().unwrap_or_else(PoisonError::into_inner);
        *write_lock = Some(loaded.clone());
        loaded
    }

    /// Gets the secrets (file values overridden by the process environment).
    pub fn secrets(&self) -> SecretConfig {
        {
            let read_lock = self.secrets.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(cached) = read_lock.as_ref() {
                return cached.clone();
            }
        }

        let mut loaded = match self.load_secret_file() {
            Ok(secrets) => secrets,
            Err(e) => {
                tracing::warn!("[Config] Ignoring unreadable secret file: {}", e);
                SecretConfig::default()
            }
        };
        apply_env_overrides(&mut loaded, |name| std::env::var(name).ok());

        let mut write_lock = self.secrets.write().unwrap_or_else(PoisonError::into_inner);
        *write_lock = Some(loaded.clone());
        loaded
    }

    /// Writes `settings` to `config.toml` and refreshes the cache.
    pub fn save_settings(&self, settings: &MentorSettings) -> Result<PathBuf> {
        let path = self.paths.config_file()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, toml::to_string_pretty(settings)?)?;

        let mut write_lock = self.settings.write().unwrap_or_else(PoisonError::into_inner);
        *write_lock = Some(settings.clone());
        tracing::info!("[Config] Saved settings to {}", path.display());
        Ok(path)
    }

    /// Invalidates both caches, forcing a reload on next access.
    pub fn invalidate_cache(&self) {
        *self.settings.write().unwrap_or_else(PoisonError::into_inner) = None;
        *self.secrets.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    fn load_settings(&self) -> Result<MentorSettings> {
        let path = self.paths.config_file()?;
        if !path.exists() {
            return Ok(MentorSettings::default());
        }
        let content = std::fs::read_to_string(&path)?;
        toml::from_str(&content).map_err(|e| {
            MentorError::config(format!("Failed to parse {}: {}", path.display(), e))
        })
    }

    fn load_secret_file(&self) -> Result<SecretConfig> {
        let path = self.paths.secret_file()?;
        if !path.exists() {
            return Ok(SecretConfig::default());
        }
        let content = std::fs::read_to_string(&path)?;
        serde_json::from_str(&content).map_err(|e| {
            MentorError::config(format!("Failed to parse {}: {}", path.display(), e))
        })
    }
}

impl Default for ConfigService {
    fn default() -> Self {
        Self::new()
    }
}

/// Layers environment values over `secrets`.
///
/// `lookup` resolves a variable name; empty values are ignored. The plain
/// name wins over its `VITE_` twin.
pub fn apply_env_overrides<F>(secrets: &mut SecretConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let first = |names: &[&str]| {
        names
            .iter()
            .filter_map(|name| lookup(name))
            .find(|value| !value.trim().is_empty())
    };

    if let Some(api_key) = first(GEMINI_API_KEY) {
        secrets
            .gemini
            .get_or_insert_with(GeminiConfig::default)
            .api_key = api_key;
    }

    let values = [
        first(FIREBASE_API_KEY),
        first(FIREBASE_AUTH_DOMAIN),
        first(FIREBASE_PROJECT_ID),
        first(FIREBASE_STORAGE_BUCKET),
        first(FIREBASE_MESSAGING_SENDER_ID),
        first(FIREBASE_APP_ID),
    ];
    if values.iter().all(Option::is_none) {
        return;
    }

    let firebase = secrets.firebase.get_or_insert_with(FirebaseConfig::default);
    let slots = [
        &mut firebase.api_key,
        &mut firebase.auth_domain,
        &mut firebase.project_id,
        &mut firebase.storage_bucket,
        &mut firebase.messaging_sender_id,
        &mut firebase.app_id,
    ];
    for (slot, value) in slots.into_iter().zip(values) {
        if value.is_some() {
            *slot = value;
        }
    }
}
