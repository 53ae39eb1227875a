//! Wiring of the gateways from configuration.
//!
//! Missing credentials are a mode, not an error: without a usable Gemini key
//! the AI gateway answers with fallbacks, and without usable Firebase
//! credentials persistence runs against the in-memory mirror and email
//! sign-in is unavailable.

use crate::ai::{AiGateway, ResiliencePolicy};
use crate::wellness_usecase::WellnessUseCase;
use anyhow::{Context, Result};
use mentor_core::completion::TextCompletion;
use mentor_core::config::MentorSettings;
use mentor_core::identity::{AuthBackend, AuthState, IdentityProvider};
use mentor_core::store::DocumentStore;
use mentor_infrastructure::{AuthSession, ConfigService, PersistenceGateway};
use mentor_interaction::{FirebaseAuthClient, FirestoreStore, GeminiCompletionClient};
use std::sync::Arc;

/// Fully wired InsideMentor services.
#[derive(Clone)]
pub struct MentorApp {
    pub config: ConfigService,
    pub settings: MentorSettings,
    pub session: Arc<AuthSession>,
    pub persistence: PersistenceGateway,
    pub ai: AiGateway,
    pub wellness: WellnessUseCase,
}

impl MentorApp {
    /// Builds the services from the platform configuration directory.
    pub fn bootstrap() -> Result<Self> {
        Self::from_config(ConfigService::new())
    }

    /// Builds the services from `config`.
    ///
    /// A placeholder `secret.json` is written on first run.
    pub fn from_config(config: ConfigService) -> Result<Self> {
        let secret_path = config
            .paths()
            .ensure_secret_file()
            .context("Failed to prepare the secret file")?;
        tracing::debug!("[Bootstrap] Using secrets at {}", secret_path.display());

        let settings = config.settings();
        let secrets = config.secrets();

        let completion: Option<Arc<dyn TextCompletion>> =
            match GeminiCompletionClient::from_secrets(&secrets, &settings.ai) {
                Some(client) => {
                    tracing::info!("[Bootstrap] AI gateway using model {}", client.model());
                    Some(Arc::new(client))
                }
                None => {
                    tracing::warn!("[Bootstrap] Gemini API key not configured; AI features use fallbacks");
                    None
                }
            };

        let firebase = secrets.usable_firebase().cloned();
        let backend: Option<Arc<dyn AuthBackend>> = firebase
            .as_ref()
            .and_then(FirebaseAuthClient::from_config)
            .map(|client| Arc::new(client) as Arc<dyn AuthBackend>);
        let session = Arc::new(AuthSession::new(backend));

        let remote: Option<Arc<dyn DocumentStore>> = match firebase {
            Some(firebase) => {
                tracing::info!(
                    "[Bootstrap] Remote store enabled for project {}",
                    firebase.project_id.as_deref().unwrap_or_default()
                );
                let identity: Arc<dyn IdentityProvider> = session.clone();
                Some(Arc::new(FirestoreStore::new(firebase).with_identity(identity)))
            }
            None => {
                tracing::warn!("[Bootstrap] Firebase not configured; data stays in the local mirror");
                None
            }
        };

        let persistence = PersistenceGateway::with_settings(
            remote,
            session.clone(),
            settings.store.clone(),
        );
        let ai = AiGateway::new(completion, Arc::new(ResiliencePolicy::new(settings.ai.clone())));
        let wellness = WellnessUseCase::new(persistence.clone(), ai.clone(), session.clone());

        // The REST backend keeps no session between runs.
        session.mark_signed_out();

        Ok(Self {
            config,
            settings,
            session,
            persistence,
            ai,
            wellness,
        })
    }

    /// Waits for the auth session to settle within the configured window.
    pub async fn ready(&self) -> AuthState {
        self.session
            .wait_until_ready(self.settings.store.auth_ready_timeout())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bootstrap_without_credentials_runs_in_fallback_mode() {
        let dir = tempfile::tempdir().unwrap();
        let app = MentorApp::from_config(ConfigService::with_base_dir(Some(dir.path()))).unwrap();

        assert!(dir.path().join("secret.json").exists());
        let status = app.wellness.status();
        assert!(!status.ai_configured);
        assert!(!status.remote_store_available);
        assert!(!status.email_auth_available);
        assert_eq!(app.ready().await, AuthState::SignedOut);
    }

    #[tokio::test]
    async fn test_bootstrap_with_credentials_wires_adapters() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("secret.json"),
            r#"{
                "gemini": {"api_key": "AIzaTestKey", "model_name": "gemini-2.5-flash"},
                "firebase": {"api_key": "AIzaFire", "auth_domain": "demo.firebaseapp.com", "project_id": "demo"}
            }"#,
        )
        .unwrap();
        let app = MentorApp::from_config(ConfigService::with_base_dir(Some(dir.path()))).unwrap();

        let status = app.wellness.status();
        assert!(status.ai_configured);
        assert!(status.remote_store_available);
        assert!(status.email_auth_available);
    }
}
