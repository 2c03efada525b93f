// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent user-facing messages.

use crate::services::identity::AuthError;

/// Application error type shared by the store and service layers.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthorized,

    #[error("Not allowed: {0}")]
    Forbidden(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Identity provider error: {0}")]
    Auth(#[from] AuthError),

    #[error("Upstream service error: {0}")]
    Upstream(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Whether the failure is worth retrying later (network, timeout, backend hiccup).
    pub fn is_transient(&self) -> bool {
        match self {
            AppError::Upstream(_) | AppError::Database(_) => true,
            AppError::Auth(e) => e.is_transient(),
            _ => false,
        }
    }

    /// Short text for a dismissible notification.
    ///
    /// Backend details are logged, never shown.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Unauthorized => "Please sign in to continue.".to_string(),
            AppError::Forbidden(_) => "You are not allowed to do that.".to_string(),
            AppError::NotFound(_) => "This parking spot no longer exists.".to_string(),
            AppError::BadRequest(msg) => msg.clone(),
            AppError::Auth(e) => e.user_message().to_string(),
            AppError::Upstream(msg) => {
                tracing::warn!(error = %msg, "Upstream error");
                "Network problem. Please try again.".to_string()
            }
            AppError::Database(msg) => {
                tracing::error!(error = %msg, "Database error");
                "Something went wrong saving your change. Please try again.".to_string()
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal error");
                "Something went wrong. Please try again.".to_string()
            }
        }
    }
}

/// Result type alias for store and service operations
pub type Result<T> = std::result::Result<T, AppError>;
