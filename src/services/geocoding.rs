// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Reverse geocoding for human-readable pin labels.

use crate::error::AppError;
use crate::models::pin::numeric_label;
use serde::Deserialize;
use std::time::Duration;

/// Address components returned by a Nominatim reverse lookup.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Address {
    pub road: Option<String>,
    pub pedestrian: Option<String>,
    pub footway: Option<String>,
    pub house_number: Option<String>,
    pub city: Option<String>,
    pub town: Option<String>,
    pub county: Option<String>,
    pub quarter: Option<String>,
    pub neighbourhood: Option<String>,
    pub suburb: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ReverseResponse {
    #[serde(default)]
    address: Address,
}

fn first_of<'a>(candidates: &[&'a Option<String>]) -> Option<&'a str> {
    candidates
        .iter()
        .filter_map(|c| c.as_deref())
        .map(str::trim)
        .find(|s| !s.is_empty())
}

impl Address {
    /// Short label in "street, town" style.
    pub fn display_name(&self) -> String {
        let road = first_of(&[&self.road, &self.pedestrian, &self.footway]);
        let municipality = first_of(&[&self.city, &self.town, &self.county]);
        let neighbourhood = first_of(&[&self.quarter, &self.neighbourhood, &self.suburb]);

        match (road, municipality, neighbourhood) {
            (Some(road), Some(municipality), _) => format!("{}, {}", road, municipality),
            (Some(road), None, Some(neighbourhood)) => format!("{}, {}", road, neighbourhood),
            (Some(road), None, None) => road.to_string(),
            (None, _, Some(neighbourhood)) => format!("Near {}", neighbourhood),
            (None, Some(municipality), None) => format!("Near {}", municipality),
            (None, None, None) => "Free Parking Spot".to_string(),
        }
    }
}

/// Nominatim client.
#[derive(Clone)]
pub struct Geocoder {
    http: reqwest::Client,
    base_url: String,
    user_agent: String,
    timeout: Duration,
}

impl Geocoder {
    pub fn new(base_url: &str, user_agent: &str, timeout: Duration) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            user_agent: user_agent.to_string(),
            timeout,
        }
    }

    /// Fetch the address for a coordinate.
    pub async fn reverse(&self, lat: f64, lng: f64) -> Result<Address, AppError> {
        let url = format!("{}/reverse", self.base_url);
        let response = self
            .http
            .get(&url)
            .query(&[
                ("format", "json".to_string()),
                ("lat", lat.to_string()),
                ("lon", lng.to_string()),
                ("zoom", "18".to_string()),
                ("addressdetails", "1".to_string()),
            ])
            .header(reqwest::header::USER_AGENT, &self.user_agent)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("Geocoding request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::Upstream(format!(
                "Geocoding HTTP {}",
                response.status()
            )));
        }

        let body: ReverseResponse = response
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("Geocoding JSON parse error: {}", e)))?;
        Ok(body.address)
    }

    /// Label for a coordinate; never fails.
    pub async fn place_label(&self, lat: f64, lng: f64) -> String {
        match self.reverse(lat, lng).await {
            Ok(address) => address.display_name(),
            Err(e) => {
                tracing::warn!(error = %e, lat, lng, "Reverse geocoding failed");
                numeric_label(lat, lng)
            }
        }
    }
}
