// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session context: the signed-in identity and its profile.
//!
//! Constructed once at startup and handed to whatever needs the current
//! user. Changes are published on a watch channel so feeds that depend on
//! the user can tear themselves down on sign-out.

use crate::db::PinStore;
use crate::error::{AppError, Result};
use crate::models::User;
use crate::services::identity::{Identity, IdentityProvider, ProviderCredential};
use crate::time_utils::now_rfc3339;
use std::sync::Arc;
use tokio::sync::watch;

/// Signed-in user.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionUser {
    pub identity: Identity,
    /// `None` when the profile could not be loaded
    pub profile: Option<User>,
}

impl SessionUser {
    pub fn uid(&self) -> &str {
        &self.identity.uid
    }

    pub fn email(&self) -> Option<&str> {
        self.identity.email.as_deref()
    }

    /// Name recorded as a pin's creator.
    pub fn creator_name(&self) -> String {
        if let Some(profile) = &self.profile {
            return profile.creator_name();
        }
        self.identity
            .display_name
            .clone()
            .or_else(|| self.identity.email.clone())
            .unwrap_or_else(|| "User".to_string())
    }
}

/// Shared session context.
#[derive(Clone)]
pub struct Session {
    provider: Arc<dyn IdentityProvider>,
    store: Arc<dyn PinStore>,
    state: Arc<watch::Sender<Option<SessionUser>>>,
}

impl Session {
    pub fn new(provider: Arc<dyn IdentityProvider>, store: Arc<dyn PinStore>) -> Self {
        let (state, _) = watch::channel(None);
        Self {
            provider,
            store,
            state: Arc::new(state),
        }
    }

    pub fn current(&self) -> Option<SessionUser> {
        self.state.borrow().clone()
    }

    /// Current-identity stream.
    pub fn subscribe(&self) -> watch::Receiver<Option<SessionUser>> {
        self.state.subscribe()
    }

    /// The signed-in user, or `Unauthorized`.
    pub fn require_user(&self) -> Result<SessionUser> {
        self.current().ok_or(AppError::Unauthorized)
    }

    /// Create an email/password account and its profile.
    pub async fn sign_up(&self, email: &str, password: &str, full_name: &str) -> Result<SessionUser> {
        let identity = self.provider.sign_up(email, password).await?;

        let profile = User {
            uid: identity.uid.clone(),
            email: identity.email.clone().or_else(|| Some(email.to_string())),
            full_name: full_name.trim().to_string(),
            photo_url: None,
            created_at: now_rfc3339(),
            verified: false,
            auth_method: "password".to_string(),
        };
        self.store.upsert_user(&profile).await?;

        let user = SessionUser {
            identity,
            profile: Some(profile),
        };
        self.state.send_replace(Some(user.clone()));
        tracing::info!(uid = %user.uid(), "Signed up");
        Ok(user)
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<SessionUser> {
        let identity = self.provider.sign_in(email, password).await?;
        Ok(self.establish(identity).await)
    }

    /// Social sign-in; provisions a profile on first use.
    pub async fn sign_in_with_provider(
        &self,
        credential: &ProviderCredential,
    ) -> Result<SessionUser> {
        let identity = self.provider.sign_in_with_provider(credential).await?;
        Ok(self.establish(identity).await)
    }

    /// Load (or provision) the profile and publish the session.
    async fn establish(&self, identity: Identity) -> SessionUser {
        let profile = match self.load_or_provision(&identity).await {
            Ok(profile) => Some(profile),
            Err(e) => {
                tracing::error!(uid = %identity.uid, error = %e, "Failed to load user profile");
                None
            }
        };

        let user = SessionUser { identity, profile };
        self.state.send_replace(Some(user.clone()));
        tracing::info!(uid = %user.uid(), "Signed in");
        user
    }

    async fn load_or_provision(&self, identity: &Identity) -> Result<User> {
        if let Some(existing) = self.store.get_user(&identity.uid).await? {
            return Ok(existing);
        }

        let profile = User {
            uid: identity.uid.clone(),
            email: identity.email.clone(),
            full_name: identity
                .display_name
                .clone()
                .unwrap_or_else(|| "User".to_string()),
            photo_url: identity.photo_url.clone(),
            created_at: now_rfc3339(),
            verified: identity.email_verified,
            auth_method: identity.provider_id.clone(),
        };
        self.store.upsert_user(&profile).await?;
        tracing::info!(uid = %identity.uid, provider = %identity.provider_id, "Provisioned user profile");
        Ok(profile)
    }

    /// Clear identity and profile.
    pub fn sign_out(&self) {
        if let Some(user) = self.state.send_replace(None) {
            tracing::info!(uid = %user.uid(), "Signed out");
        }
    }

    /// Remove the profile and favorites, then revoke the identity.
    pub async fn delete_account(&self) -> Result<()> {
        let user = self.require_user()?;
        self.store.delete_user_data(user.uid()).await?;
        self.provider.delete_account(&user.identity).await?;
        self.state.send_replace(None);
        tracing::info!(uid = %user.uid(), "Account deleted");
        Ok(())
    }

    pub async fn update_display_name(&self, name: &str) -> Result<SessionUser> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::BadRequest("Name cannot be empty.".to_string()));
        }

        let mut user = self.require_user()?;
        self.provider
            .update_display_name(&user.identity, name)
            .await?;

        user.identity.display_name = Some(name.to_string());
        if let Some(profile) = user.profile.as_mut() {
            profile.full_name = name.to_string();
            self.store.upsert_user(profile).await?;
        }

        self.state.send_replace(Some(user.clone()));
        Ok(user)
    }

    pub async fn send_password_reset(&self, email: &str) -> Result<()> {
        let email = email.trim();
        if email.is_empty() {
            return Err(AppError::BadRequest(
                "Please enter your email address".to_string(),
            ));
        }
        self.provider.send_password_reset(email).await?;
        Ok(())
    }
}
