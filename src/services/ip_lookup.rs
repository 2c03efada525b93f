// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! IP geolocation lookups.
//!
//! Several free services are tried in a fixed order, each with its own
//! timeout. The first parseable latitude/longitude pair wins; every failure
//! (network, status, body, missing coordinates) moves on to the next one.

use crate::error::AppError;
use crate::models::Position;
use serde_json::Value;
use std::time::Duration;

/// One IP geolocation endpoint and where its payload keeps the coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IpService {
    pub name: String,
    pub url: String,
    pub lat_field: String,
    pub lng_field: String,
}

impl IpService {
    pub fn new(name: &str, url: &str, lat_field: &str, lng_field: &str) -> Self {
        Self {
            name: name.to_string(),
            url: url.to_string(),
            lat_field: lat_field.to_string(),
            lng_field: lng_field.to_string(),
        }
    }

    /// Public services in priority order.
    pub fn defaults() -> Vec<IpService> {
        vec![
            IpService::new("ipapi.co", "https://ipapi.co/json/", "latitude", "longitude"),
            IpService::new("ip-api.com", "https://ip-api.com/json/", "lat", "lon"),
            IpService::new(
                "ipgeolocation.io",
                "https://api.ipgeolocation.io/ipgeo?apiKey=free",
                "latitude",
                "longitude",
            ),
            IpService::new("myip.com", "https://api.myip.com", "lat", "lon"),
        ]
    }

    /// Extract the coordinate pair from a response body.
    ///
    /// Values may be numbers or numeric strings. Zero, non-finite and missing
    /// values count as absent.
    pub fn parse(&self, body: &Value) -> Option<(f64, f64)> {
        let lat = coordinate(body.get(&self.lat_field)?)?;
        let lng = coordinate(body.get(&self.lng_field)?)?;
        Some((lat, lng))
    }
}

fn coordinate(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    (n.is_finite() && n != 0.0).then_some(n)
}

/// Sequential IP geolocation client.
#[derive(Clone)]
pub struct IpLocator {
    http: reqwest::Client,
    services: Vec<IpService>,
    timeout: Duration,
}

impl IpLocator {
    pub fn new(timeout: Duration) -> Self {
        Self::with_services(IpService::defaults(), timeout)
    }

    pub fn with_services(services: Vec<IpService>, timeout: Duration) -> Self {
        Self {
            http: reqwest::Client::new(),
            services,
            timeout,
        }
    }

    pub fn services(&self) -> &[IpService] {
        &self.services
    }

    /// Try each service in order; `None` once all of them failed.
    pub async fn locate(&self) -> Option<Position> {
        for service in &self.services {
            match self.query(service).await {
                Ok((lat, lng)) => {
                    tracing::info!(service = %service.name, lat, lng, "IP location resolved");
                    return Some(Position::ip(lat, lng, &service.name));
                }
                Err(e) => {
                    tracing::debug!(service = %service.name, error = %e, "IP location service failed");
                }
            }
        }

        tracing::warn!(
            tried = self.services.len(),
            "All IP location services failed"
        );
        None
    }

    async fn query(&self, service: &IpService) -> Result<(f64, f64), AppError> {
        let response = self
            .http
            .get(&service.url)
            .header(reqwest::header::ACCEPT, "application/json")
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("{}: {}", service.name, e)))?;

        if !response.status().is_success() {
            return Err(AppError::Upstream(format!(
                "{}: HTTP {}",
                service.name,
                response.status()
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("{}: JSON parse error: {}", service.name, e)))?;

        service
            .parse(&body)
            .ok_or_else(|| AppError::Upstream(format!("{}: no coordinates", service.name)))
    }
}
