//! Identity attribution and email/password session capabilities.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Owner key used for records written without a resolved identity.
pub const ANONYMOUS_OWNER: &str = "";

/// An authenticated account as reported by the identity backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub uid: String,
    pub email: Option<String>,
    /// Bearer token for the remote store, when the backend issues one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
}

impl AuthUser {
    /// A locally attributed user with no backend token.
    pub fn local(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            email: None,
            id_token: None,
        }
    }
}

/// Session state observed by subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    /// The provider has not reported yet.
    Initializing,
    SignedIn(AuthUser),
    SignedOut,
    /// The provider never reported within the readiness window.
    NotReady,
}

impl AuthState {
    pub fn user(&self) -> Option<&AuthUser> {
        match self {
            Self::SignedIn(user) => Some(user),
            _ => None,
        }
    }

    /// Whether the provider has settled (signed in or out).
    pub fn is_settled(&self) -> bool {
        matches!(self, Self::SignedIn(_) | Self::SignedOut)
    }
}

/// Resolves the identity that owns records written right now.
pub trait IdentityProvider: Send + Sync {
    /// The signed-in user's id, if any.
    fn current_user_id(&self) -> Option<String>;

    /// A bearer token for authenticated store requests, if any.
    fn id_token(&self) -> Option<String> {
        None
    }
}

/// Email/password identity backend (remote account service).
#[async_trait]
pub trait AuthBackend: Send + Sync {
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser>;

    async fn register(&self, email: &str, password: &str) -> Result<AuthUser>;

    async fn sign_out(&self) -> Result<()>;
}
