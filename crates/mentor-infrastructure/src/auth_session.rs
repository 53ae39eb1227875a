//! Auth session: the identity-attribution source for the gateways.
//!
//! Holds the current [`AuthState`] in a watch channel so any number of
//! subscribers observe sign-in and sign-out. Email/password operations are
//! delegated to an optional [`AuthBackend`].

use async_trait::async_trait;
use mentor_core::identity::{AuthBackend, AuthState, AuthUser, IdentityProvider};
use mentor_core::{MentorError, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Default window for the identity provider to report a session.
pub const DEFAULT_READY_TIMEOUT: Duration = Duration::from_secs(10);

pub struct AuthSession {
    backend: Option<Arc<dyn AuthBackend>>,
    state: watch::Sender<AuthState>,
}

impl AuthSession {
    /// Creates a session in the `Initializing` state.
    pub fn new(backend: Option<Arc<dyn AuthBackend>>) -> Self {
        let (state, _) = watch::channel(AuthState::Initializing);
        Self { backend, state }
    }

    /// Whether an email/password backend is wired.
    pub fn has_backend(&self) -> bool {
        self.backend.is_some()
    }

    pub fn state(&self) -> AuthState {
        self.state.borrow().clone()
    }

    pub fn current_user(&self) -> Option<AuthUser> {
        self.state.borrow().user().cloned()
    }

    /// Subscribes to session changes.
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    /// Signs in with email and password.
    ///
    /// Fails with a configuration error when no backend is wired.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser> {
        let backend = self.require_backend()?;
        let user = backend.sign_in(email, password).await.map_err(|e| {
            tracing::warn!("[Auth] Sign-in failed for {}: {}", email, e);
            e
        })?;
        tracing::info!("[Auth] Signed in as {}", user.uid);
        self.state.send_replace(AuthState::SignedIn(user.clone()));
        Ok(user)
    }

    /// Registers a new account and signs it in.
    pub async fn register(&self, email: &str, password: &str) -> Result<AuthUser> {
        let backend = self.require_backend()?;
        let user = backend.register(email, password).await.map_err(|e| {
            tracing::warn!("[Auth] Registration failed for {}: {}", email, e);
            e
        })?;
        tracing::info!("[Auth] Registered {}", user.uid);
        self.state.send_replace(AuthState::SignedIn(user.clone()));
        Ok(user)
    }

    /// Signs out. Without a backend this only clears the local session.
    pub async fn sign_out(&self) -> Result<()> {
        if let Some(backend) = &self.backend {
            backend.sign_out().await?;
        }
        self.state.send_replace(AuthState::SignedOut);
        tracing::info!("[Auth] Signed out");
        Ok(())
    }

    /// Attributes the session to a locally known user (no backend involved).
    pub fn sign_in_local(&self, uid: impl Into<String>) -> AuthUser {
        let user = AuthUser::local(uid);
        tracing::info!("[Auth] Local session for {}", user.uid);
        self.state.send_replace(AuthState::SignedIn(user.clone()));
        user
    }

    /// Records that the provider found no existing session.
    pub fn mark_signed_out(&self) {
        self.state.send_replace(AuthState::SignedOut);
    }

    /// Waits until the session settles, or forces `NotReady` after `timeout`.
    pub async fn wait_until_ready(&self, timeout: Duration) -> AuthState {
        let mut receiver = self.subscribe();
        let settled = tokio::time::timeout(timeout, receiver.wait_for(AuthState::is_settled)).await;
        match settled {
            Ok(Ok(state)) => state.clone(),
            Ok(Err(_)) => self.state(),
            Err(_) => {
                let forced = self.state.send_if_modified(|state| {
                    if matches!(state, AuthState::Initializing) {
                        *state = AuthState::NotReady;
                        true
                    } else {
                        false
                    }
                });
                if forced {
                    tracing::warn!(
                        "[Auth] Identity provider did not respond within {:?}; continuing without a session",
                        timeout
                    );
                }
                self.state()
            }
        }
    }

    fn require_backend(&self) -> Result<&Arc<dyn AuthBackend>> {
        self.backend
            .as_ref()
            .ok_or_else(|| MentorError::config("Email sign-in is not configured"))
    }
}

impl IdentityProvider for AuthSession {
    fn current_user_id(&self) -> Option<String> {
        self.state.borrow().user().map(|user| user.uid.clone())
    }

    fn id_token(&self) -> Option<String> {
        self.state
            .borrow()
            .user()
            .and_then(|user| user.id_token.clone())
    }
}

/// Fixed identity, for wiring without a session (tests, scripts).
#[derive(Debug, Clone, Default)]
pub struct StaticIdentity(Option<String>);

impl StaticIdentity {
    pub fn signed_in(uid: impl Into<String>) -> Self {
        Self(Some(uid.into()))
    }

    pub fn anonymous() -> Self {
        Self(None)
    }
}

impl IdentityProvider for StaticIdentity {
    fn current_user_id(&self) -> Option<String> {
        self.0.clone()
    }
}

/// Backend that accepts a fixed set of accounts; used in tests.
#[derive(Debug, Default)]
pub struct InMemoryAuthBackend {
    accounts: std::sync::Mutex<Vec<(String, String, String)>>,
}

impl InMemoryAuthBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn accounts(&self) -> std::sync::MutexGuard<'_, Vec<(String, String, String)>> {
        self.accounts
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[async_trait]
impl AuthBackend for InMemoryAuthBackend {
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser> {
        self.accounts()
            .iter()
            .find(|(e, p, _)| e == email && p == password)
            .map(|(e, _, uid)| AuthUser {
                uid: uid.clone(),
                email: Some(e.clone()),
                id_token: None,
            })
            .ok_or_else(|| MentorError::auth("Invalid email or password"))
    }

    async fn register(&self, email: &str, password: &str) -> Result<AuthUser> {
        let mut accounts = self.accounts();
        if accounts.iter().any(|(e, _, _)| e == email) {
            return Err(MentorError::auth("EMAIL_EXISTS"));
        }
        let uid = format!("uid-{}", accounts.len() + 1);
        accounts.push((email.to_string(), password.to_string(), uid.clone()));
        Ok(AuthUser {
            uid,
            email: Some(email.to_string()),
            id_token: None,
        })
    }

    async fn sign_out(&self) -> Result<()> {
        Ok(())
    }
}
