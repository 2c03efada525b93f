// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Ephemeral device position (never persisted).

use geo::{Distance, Haversine, Point};
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// How a position was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum LocationMethod {
    Gps,
    Ip,
    Fallback,
}

impl LocationMethod {
    /// Label shown next to the locate button.
    pub fn display_name(self) -> &'static str {
        match self {
            LocationMethod::Gps => "GPS Location",
            LocationMethod::Ip => "IP Location",
            LocationMethod::Fallback => "Default Location",
        }
    }
}

/// A position with its acquisition method.
///
/// Replaced wholesale on every acquisition or tracking update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Position {
    pub lat: f64,
    pub lng: f64,
    pub method: LocationMethod,
    /// Accuracy radius in metres (GPS only)
    pub accuracy: Option<f64>,
    /// IP service that answered (IP only)
    pub source: Option<String>,
    /// Unix time in milliseconds
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub timestamp: i64,
}

impl Position {
    pub fn gps(lat: f64, lng: f64, accuracy: Option<f64>, timestamp: i64) -> Self {
        Self {
            lat,
            lng,
            method: LocationMethod::Gps,
            accuracy,
            source: None,
            timestamp,
        }
    }

    pub fn ip(lat: f64, lng: f64, service: &str) -> Self {
        Self {
            lat,
            lng,
            method: LocationMethod::Ip,
            accuracy: None,
            source: Some(service.to_string()),
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }

    pub fn fallback(lat: f64, lng: f64) -> Self {
        Self {
            lat,
            lng,
            method: LocationMethod::Fallback,
            accuracy: None,
            source: None,
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// Great-circle distance to another position, in metres.
    pub fn distance_to(&self, other: &Position) -> f64 {
        Haversine.distance(
            Point::new(self.lng, self.lat),
            Point::new(other.lng, other.lat),
        )
    }

    /// Coarse accuracy band for display.
    pub fn accuracy_band(&self) -> AccuracyBand {
        AccuracyBand::from_metres(self.accuracy)
    }
}

/// Display band for an accuracy radius.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccuracyBand {
    High,
    Medium,
    Low,
    Unknown,
}

impl AccuracyBand {
    pub fn from_metres(accuracy: Option<f64>) -> Self {
        match accuracy {
            Some(a) if a > 0.0 && a < 10.0 => AccuracyBand::High,
            Some(a) if a > 0.0 && a < 50.0 => AccuracyBand::Medium,
            Some(a) if a > 0.0 => AccuracyBand::Low,
            _ => AccuracyBand::Unknown,
        }
    }
}
