// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Free-parking pin model.

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use std::borrow::Cow;
use validator::{Validate, ValidationError};

/// Maximum length of a pin note, in characters.
pub const MAX_NOTE_CHARS: u64 = 500;

/// A free-parking pin stored at `pins/{id}`.
///
/// Only the two vote counters change after creation, and only through the
/// store's atomic increment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Pin {
    /// Document ID (filled in on read)
    #[serde(alias = "_firestore_id", default, skip_serializing)]
    pub id: Option<String>,
    pub lat: f64,
    pub lng: f64,
    #[serde(default)]
    pub note: String,
    /// Creator display name (falls back to email)
    pub created_by: String,
    pub created_by_email: Option<String>,
    pub created_by_uid: String,
    /// RFC 3339 creation time; feeds order by this, newest first
    pub created_at: String,
    /// Human-readable label from reverse geocoding
    pub place_label: String,
    /// Map directions link
    pub directions_url: String,
    #[serde(default)]
    pub is_free_count: i64,
    #[serde(default)]
    pub is_not_free_count: i64,
}

impl Pin {
    /// Document ID, or an empty string for a pin that was never stored.
    pub fn doc_id(&self) -> &str {
        self.id.as_deref().unwrap_or("")
    }

    /// Total number of active votes on this pin.
    pub fn total_votes(&self) -> i64 {
        self.is_free_count + self.is_not_free_count
    }
}

/// Input for creating a pin from the map-click flow.
#[derive(Debug, Clone, Validate)]
pub struct NewPin {
    #[validate(
        custom(function = "finite_coordinate"),
        range(min = -90.0, max = 90.0, message = "latitude out of range")
    )]
    pub lat: f64,
    #[validate(
        custom(function = "finite_coordinate"),
        range(min = -180.0, max = 180.0, message = "longitude out of range")
    )]
    pub lng: f64,
    #[validate(length(max = 500, message = "note is too long"))]
    pub note: String,
}

/// Range checks let NaN through, so non-finite values are rejected first.
fn finite_coordinate(value: f64) -> Result<(), ValidationError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ValidationError::new("finite")
            .with_message(Cow::Borrowed("coordinate is not a number")))
    }
}

/// Round a coordinate to 5 decimal places (about 1 m).
pub fn round_coordinate(value: f64) -> f64 {
    (value * 100_000.0).round() / 100_000.0
}

/// Directions link for a coordinate.
pub fn directions_url(lat: f64, lng: f64) -> String {
    let destination = format!("{},{}", lat, lng);
    format!(
        "https://www.google.com/maps/dir/?api=1&destination={}",
        urlencoding::encode(&destination)
    )
}

/// Label used when reverse geocoding is unavailable.
pub fn numeric_label(lat: f64, lng: f64) -> String {
    format!("Location {:.4}, {:.4}", lat, lng)
}
