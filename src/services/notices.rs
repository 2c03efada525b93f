// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Dismissible user notifications.

use crate::error::AppError;
use std::time::Duration;
use tokio::sync::broadcast;

/// How long a notice stays up unless dismissed.
pub const AUTO_DISMISS: Duration = Duration::from_millis(4000);

pub const PIN_CREATE_FAILED: &str = "Failed to add pin. Please try again.";

const CHANNEL_CAPACITY: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Error,
    Success,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
    pub auto_dismiss: Duration,
}

/// Notification fan-out. Publishing with no listeners is not an error.
#[derive(Clone)]
pub struct Notices {
    tx: broadcast::Sender<Notice>,
}

impl Default for Notices {
    fn default() -> Self {
        Self::new()
    }
}

impl Notices {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notice> {
        self.tx.subscribe()
    }

    pub fn error(&self, message: impl Into<String>) {
        self.publish(NoticeKind::Error, message.into());
    }

    pub fn success(&self, message: impl Into<String>) {
        self.publish(NoticeKind::Success, message.into());
    }

    /// Show the user-facing text for a failed operation.
    pub fn report(&self, err: &AppError) {
        self.error(err.user_message());
    }

    fn publish(&self, kind: NoticeKind, message: String) {
        tracing::debug!(?kind, %message, "Notice");
        let _ = self.tx.send(Notice {
            kind,
            message,
            auto_dismiss: AUTO_DISMISS,
        });
    }
}
