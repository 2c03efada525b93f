// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Identity provider contract and the Firebase Auth REST client.
//!
//! Handles:
//! - Email/password sign-up and sign-in
//! - Social sign-in from a provider credential (`accounts:signInWithIdp`)
//! - Password reset emails
//! - Display name updates and account deletion

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Named identity failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("invalid credential")]
    InvalidCredential,

    #[error("account disabled")]
    UserDisabled,

    #[error("too many attempts")]
    RateLimited,

    #[error("network failure: {0}")]
    Network(String),

    #[error("email already in use")]
    EmailInUse,

    #[error("weak password")]
    WeakCredential,

    #[error("sign-in popup dismissed")]
    PopupDismissed,

    #[error("{0}")]
    Other(String),
}

impl AuthError {
    /// Map a provider error code.
    ///
    /// Accepts both the REST API codes (`EMAIL_EXISTS`, optionally followed
    /// by ` : detail`) and the client SDK codes (`auth/email-already-in-use`).
    pub fn from_code(code: &str) -> Self {
        let code = code.split(" : ").next().unwrap_or(code).trim();
        match code {
            "INVALID_LOGIN_CREDENTIALS"
            | "INVALID_PASSWORD"
            | "EMAIL_NOT_FOUND"
            | "INVALID_EMAIL"
            | "INVALID_IDP_RESPONSE"
            | "INVALID_ID_TOKEN"
            | "auth/invalid-credential"
            | "auth/wrong-password"
            | "auth/user-not-found"
            | "auth/invalid-email" => AuthError::InvalidCredential,
            "USER_DISABLED" | "auth/user-disabled" => AuthError::UserDisabled,
            "TOO_MANY_ATTEMPTS_TRY_LATER" | "auth/too-many-requests" => AuthError::RateLimited,
            "EMAIL_EXISTS" | "auth/email-already-in-use" => AuthError::EmailInUse,
            "WEAK_PASSWORD" | "auth/weak-password" => AuthError::WeakCredential,
            "auth/popup-closed-by-user" | "auth/cancelled-popup-request" => {
                AuthError::PopupDismissed
            }
            "auth/network-request-failed" => AuthError::Network(code.to_string()),
            other => AuthError::Other(other.to_string()),
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, AuthError::Network(_) | AuthError::RateLimited)
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            AuthError::InvalidCredential => "Invalid email or password.",
            AuthError::UserDisabled => "This account has been disabled.",
            AuthError::RateLimited => "Too many attempts. Please try again later.",
            AuthError::Network(_) => "Network error. Please check your connection.",
            AuthError::EmailInUse => "An account with this email already exists.",
            AuthError::WeakCredential => "Password should be at least 6 characters.",
            AuthError::PopupDismissed => "Sign-in was cancelled.",
            AuthError::Other(_) => "Authentication failed. Please try again.",
        }
    }
}

/// Signed-in identity.
#[derive(Debug, Clone, PartialEq)]
pub struct Identity {
    pub uid: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
    pub email_verified: bool,
    /// `password` or the social provider id
    pub provider_id: String,
    pub id_token: String,
    pub refresh_token: String,
}

/// Credential obtained from a social provider's sign-in popup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderCredential {
    /// e.g. `google.com`
    pub provider_id: String,
    pub id_token: Option<String>,
    pub access_token: Option<String>,
}

impl ProviderCredential {
    pub fn google(id_token: &str) -> Self {
        Self {
            provider_id: "google.com".to_string(),
            id_token: Some(id_token.to_string()),
            access_token: None,
        }
    }
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_up(&self, email: &str, password: &str) -> Result<Identity, AuthError>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, AuthError>;

    async fn sign_in_with_provider(
        &self,
        credential: &ProviderCredential,
    ) -> Result<Identity, AuthError>;

    async fn send_password_reset(&self, email: &str) -> Result<(), AuthError>;

    async fn update_display_name(&self, identity: &Identity, name: &str) -> Result<(), AuthError>;

    async fn delete_account(&self, identity: &Identity) -> Result<(), AuthError>;
}

// ─── REST payloads ───────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthResponse {
    local_id: String,
    email: Option<String>,
    display_name: Option<String>,
    photo_url: Option<String>,
    #[serde(default)]
    email_verified: bool,
    provider_id: Option<String>,
    id_token: String,
    #[serde(default)]
    refresh_token: String,
}

impl AuthResponse {
    fn into_identity(self, default_provider: &str) -> Identity {
        Identity {
            uid: self.local_id,
            email: self.email,
            display_name: self.display_name.filter(|n| !n.is_empty()),
            photo_url: self.photo_url,
            email_verified: self.email_verified,
            provider_id: self
                .provider_id
                .unwrap_or_else(|| default_provider.to_string()),
            id_token: self.id_token,
            refresh_token: self.refresh_token,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct IdpRequest {
    post_body: String,
    request_uri: &'static str,
    return_secure_token: bool,
    return_idp_credential: bool,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

/// Firebase Auth (Identity Toolkit) REST client.
#[derive(Clone)]
pub struct FirebaseAuthClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl FirebaseAuthClient {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    async fn call<B: Serialize + ?Sized>(
        &self,
        method: &str,
        body: &B,
    ) -> Result<reqwest::Response, AuthError> {
        let url = format!("{}/accounts:{}", self.base_url, method);
        let response = self
            .http
            .post(&url)
            .query(&[("key", &self.api_key)])
            .json(body)
            .send()
            .await
            .map_err(|e| AuthError::Network(e.to_string()))?;

        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        match serde_json::from_str::<ErrorEnvelope>(&text) {
            Ok(envelope) => {
                tracing::debug!(method, code = %envelope.error.message, "Identity request rejected");
                Err(AuthError::from_code(&envelope.error.message))
            }
            Err(_) if status.as_u16() == 429 => Err(AuthError::RateLimited),
            Err(_) if status.is_server_error() => {
                Err(AuthError::Network(format!("HTTP {}", status)))
            }
            Err(_) => Err(AuthError::Other(format!("HTTP {}: {}", status, text))),
        }
    }

    async fn call_json<B, T>(&self, method: &str, body: &B) -> Result<T, AuthError>
    where
        B: Serialize + ?Sized,
        T: for<'de> Deserialize<'de>,
    {
        self.call(method, body)
            .await?
            .json()
            .await
            .map_err(|e| AuthError::Other(format!("JSON parse error: {}", e)))
    }
}

#[async_trait]
impl IdentityProvider for FirebaseAuthClient {
    async fn sign_up(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        let body = PasswordRequest {
            email,
            password,
            return_secure_token: true,
        };
        let response: AuthResponse = self.call_json("signUp", &body).await?;
        tracing::info!(uid = %response.local_id, "Account created");
        Ok(response.into_identity("password"))
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        let body = PasswordRequest {
            email,
            password,
            return_secure_token: true,
        };
        let response: AuthResponse = self.call_json("signInWithPassword", &body).await?;
        Ok(response.into_identity("password"))
    }

    /// A credential without any token means the popup was closed.
    async fn sign_in_with_provider(
        &self,
        credential: &ProviderCredential,
    ) -> Result<Identity, AuthError> {
        let mut post_body = format!("providerId={}", urlencoding::encode(&credential.provider_id));
        match (&credential.id_token, &credential.access_token) {
            (None, None) => return Err(AuthError::PopupDismissed),
            (Some(id_token), _) => {
                post_body.push_str(&format!("&id_token={}", urlencoding::encode(id_token)))
            }
            (None, Some(access_token)) => post_body.push_str(&format!(
                "&access_token={}",
                urlencoding::encode(access_token)
            )),
        }

        let body = IdpRequest {
            post_body,
            request_uri: "http://localhost",
            return_secure_token: true,
            return_idp_credential: true,
        };
        let response: AuthResponse = self.call_json("signInWithIdp", &body).await?;
        Ok(response.into_identity(&credential.provider_id))
    }

    async fn send_password_reset(&self, email: &str) -> Result<(), AuthError> {
        let body = serde_json::json!({
            "requestType": "PASSWORD_RESET",
            "email": email,
        });
        self.call("sendOobCode", &body).await?;
        Ok(())
    }

    async fn update_display_name(&self, identity: &Identity, name: &str) -> Result<(), AuthError> {
        let body = serde_json::json!({
            "idToken": identity.id_token,
            "displayName": name,
            "returnSecureToken": false,
        });
        self.call("update", &body).await?;
        Ok(())
    }

    async fn delete_account(&self, identity: &Identity) -> Result<(), AuthError> {
        let body = serde_json::json!({ "idToken": identity.id_token });
        self.call("delete", &body).await?;
        tracing::info!(uid = %identity.uid, "Identity revoked");
        Ok(())
    }
}
