// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Platform geolocation contract.
//!
//! The host supplies a [`GeolocationPlatform`]: a permission query, a
//! one-shot position request and a streaming watch whose subscription ends
//! when the stream is dropped.

use crate::models::Position;
use async_trait::async_trait;
use futures_util::stream::BoxStream;
use std::time::Duration;

/// Geolocation permission as reported by the permissions API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionState {
    Granted,
    Prompt,
    Denied,
    /// No permissions API, or the query failed
    Unknown,
}

/// Options for a position request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionOptions {
    pub enable_high_accuracy: bool,
    pub timeout: Duration,
    /// Oldest cached fix the platform may return
    pub maximum_age: Duration,
}

/// One position sample from the platform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionFix {
    pub lat: f64,
    pub lng: f64,
    /// Accuracy radius in metres
    pub accuracy: f64,
    /// Unix time in milliseconds
    pub timestamp: i64,
}

impl From<PositionFix> for Position {
    fn from(fix: PositionFix) -> Self {
        Position::gps(fix.lat, fix.lng, Some(fix.accuracy), fix.timestamp)
    }
}

/// Platform geolocation failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum GeolocationError {
    #[error("Location permission denied")]
    PermissionDenied,

    #[error("Location unavailable")]
    PositionUnavailable,

    #[error("Location request timed out")]
    Timeout,

    #[error("Geolocation not supported")]
    Unsupported,
}

impl GeolocationError {
    /// Map a W3C `GeolocationPositionError.code`.
    pub fn from_code(code: u16) -> Self {
        match code {
            1 => GeolocationError::PermissionDenied,
            2 => GeolocationError::PositionUnavailable,
            3 => GeolocationError::Timeout,
            _ => GeolocationError::PositionUnavailable,
        }
    }
}

/// Stream of position samples; dropping it cancels the platform watch.
pub type PositionStream = BoxStream<'static, Result<PositionFix, GeolocationError>>;

#[async_trait]
pub trait GeolocationPlatform: Send + Sync {
    async fn permission_state(&self) -> PermissionState;

    async fn current_position(
        &self,
        options: PositionOptions,
    ) -> Result<PositionFix, GeolocationError>;

    fn watch_position(&self, options: PositionOptions) -> Result<PositionStream, GeolocationError>;
}

/// Platform without any geolocation support.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoGeolocation;

#[async_trait]
impl GeolocationPlatform for NoGeolocation {
    async fn permission_state(&self) -> PermissionState {
        PermissionState::Unknown
    }

    async fn current_position(
        &self,
        _options: PositionOptions,
    ) -> Result<PositionFix, GeolocationError> {
        Err(GeolocationError::Unsupported)
    }

    fn watch_position(&self, _options: PositionOptions) -> Result<PositionStream, GeolocationError> {
        Err(GeolocationError::Unsupported)
    }
}
