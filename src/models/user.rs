//! User profile model.

use serde::{Deserialize, Serialize};

/// User profile stored in Firestore at `users/{uid}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Identity provider user id (also used as document ID)
    pub uid: String,
    /// Email address (may be None for some social providers)
    pub email: Option<String>,
    /// Display name
    pub full_name: String,
    /// Profile picture URL
    #[serde(default)]
    pub photo_url: Option<String>,
    /// When the profile was created (RFC 3339)
    pub created_at: String,
    /// Whether the email address is verified
    #[serde(default)]
    pub verified: bool,
    /// "password" or the social provider id (e.g. "google.com")
    pub auth_method: String,
}

impl User {
    /// Name shown as the creator of a pin: display name, falling back to email.
    pub fn creator_name(&self) -> String {
        let name = self.full_name.trim();
        if !name.is_empty() {
            return name.to_string();
        }
        self.email.clone().unwrap_or_else(|| "User".to_string())
    }
}
