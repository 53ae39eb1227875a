//! FirebaseAuthClient - email/password [`AuthBackend`] over the Identity Toolkit REST API.

use async_trait::async_trait;
use mentor_core::config::FirebaseConfig;
use mentor_core::identity::{AuthBackend, AuthUser};
use mentor_core::{MentorError, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};

const BASE_URL: &str = "https://identitytoolkit.googleapis.com/v1";

#[derive(Clone)]
pub struct FirebaseAuthClient {
    client: Client,
    api_key: String,
    base_url: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PasswordResponse {
    local_id: String,
    email: Option<String>,
    id_token: Option<String>,
}

#[derive(Deserialize)]
struct ErrorWrapper {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

impl FirebaseAuthClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: BASE_URL.to_string(),
        }
    }

    /// Builds a client when the Firebase credentials are usable.
    pub fn from_config(config: &FirebaseConfig) -> Option<Self> {
        if !config.is_configured() {
            return None;
        }
        config.api_key.as_deref().map(Self::new)
    }

    /// Points the client at another endpoint root, e.g. the auth emulator.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    async fn password_call(&self, endpoint: &str, email: &str, password: &str) -> Result<AuthUser> {
        let url = format!("{}/accounts:{}", self.base_url, endpoint);
        let response = self
            .client
            .post(url)
            .query(&[("key", self.api_key.as_str())])
            .json(&PasswordRequest {
                email,
                password,
                return_secure_token: true,
            })
            .send()
            .await
            .map_err(|err| {
                tracing::error!("[Auth] Identity service unreachable: {}", err);
                MentorError::auth(format!("Identity service unreachable: {err}"))
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| MentorError::auth(format!("Failed to read identity response: {err}")))?;

        if !status.is_success() {
            let code = serde_json::from_str::<ErrorWrapper>(&body)
                .ok()
                .and_then(|wrapper| wrapper.error.message)
                .unwrap_or_else(|| format!("HTTP {status}"));
            tracing::warn!("[Auth] {} rejected ({}): {}", endpoint, status, code);
            return Err(MentorError::auth(describe_auth_error(&code)));
        }

        let parsed: PasswordResponse = serde_json::from_str(&body)?;
        Ok(AuthUser {
            uid: parsed.local_id,
            email: parsed.email.or_else(|| Some(email.to_string())),
            id_token: parsed.id_token,
        })
    }
}

/// Turns an Identity Toolkit error code (e.g. `EMAIL_EXISTS`,
/// `WEAK_PASSWORD : Password should be at least 6 characters`) into a
/// user-facing message.
pub fn describe_auth_error(code: &str) -> String {
    let head = code.split(" : ").next().unwrap_or(code).trim();
    match head {
        "EMAIL_EXISTS" => "An account with this email already exists".to_string(),
        "EMAIL_NOT_FOUND" | "INVALID_PASSWORD" | "INVALID_LOGIN_CREDENTIALS" => {
            "Invalid email or password".to_string()
        }
        "USER_DISABLED" => "This account has been disabled".to_string(),
        "INVALID_EMAIL" => "The email address is badly formatted".to_string(),
        "TOO_MANY_ATTEMPTS_TRY_LATER" => "Too many attempts, try again later".to_string(),
        "WEAK_PASSWORD" => "Password should be at least 6 characters".to_string(),
        _ => code.to_string(),
    }
}

#[async_trait]
impl AuthBackend for FirebaseAuthClient {
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser> {
        self.password_call("signInWithPassword", email, password).await
    }

    async fn register(&self, email: &str, password: &str) -> Result<AuthUser> {
        self.password_call("signUp", email, password).await
    }

    /// Tokens are only held by the session, so there is nothing to revoke remotely.
    async fn sign_out(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_auth_error_codes() {
        assert_eq!(describe_auth_error("EMAIL_EXISTS"), "An account with this email already exists");
        assert_eq!(describe_auth_error("INVALID_LOGIN_CREDENTIALS"), "Invalid email or password");
        assert_eq!(
            describe_auth_error("WEAK_PASSWORD : Password should be at least 6 characters"),
            "Password should be at least 6 characters"
        );
        assert_eq!(describe_auth_error("OPERATION_NOT_ALLOWED"), "OPERATION_NOT_ALLOWED");
    }

    #[test]
    fn test_from_config_requires_usable_credentials() {
        let placeholder = FirebaseConfig {
            api_key: Some("your_firebase_api_key_here".into()),
            auth_domain: Some("demo.firebaseapp.com".into()),
            project_id: Some("demo".into()),
            ..Default::default()
        };
        assert!(FirebaseAuthClient::from_config(&placeholder).is_none());

        let real = FirebaseConfig {
            api_key: Some("AIzaReal".into()),
            ..placeholder
        };
        assert!(FirebaseAuthClient::from_config(&real).is_some());
    }

    #[test]
    fn test_password_response_shape() {
        let parsed: PasswordResponse = serde_json::from_str(
            r#"{"kind":"identitytoolkit#VerifyPasswordResponse","localId":"abc","email":"a@b.c","idToken":"tok","registered":true}"#,
        )
        .unwrap();
        assert_eq!(parsed.local_id, "abc");
        assert_eq!(parsed.id_token.as_deref(), Some("tok"));
    }
}
