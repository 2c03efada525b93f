// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Location acquisition with layered fallback.
//!
//! Strictly sequential, each step only after the previous one failed:
//! 1. Permission query (when available). `denied` skips GPS entirely.
//! 2. High-accuracy GPS fix.
//! 3. One low-accuracy retry with a longer timeout and older cache.
//! 4. IP geolocation services, in order.
//! 5. Give up with a typed error; [`LocationStrategy::locate`] substitutes
//!    the configured fallback coordinate.

use crate::config::{Config, LocationOverrides, LocationSettings};
use crate::models::Position;
use crate::services::device::{self, DeviceCapabilities, LocationStrategyHints, RuntimeEnvironment};
use crate::services::geolocation::{
    GeolocationError, GeolocationPlatform, PermissionState, PositionFix, PositionOptions,
};
use crate::services::ip_lookup::IpLocator;
use std::sync::Arc;

/// Why no position could be acquired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum LocationError {
    /// Location access is blocked; the user needs enable-location guidance.
    #[error("Location permission denied")]
    PermissionDenied,

    /// GPS and every IP service failed for transient reasons.
    #[error("Unable to determine location")]
    Undeterminable,
}

/// Result of a successful acquisition.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationReport {
    pub position: Position,
    /// Permission was denied along the way; show guidance even though a
    /// position was found.
    pub permission_denied: bool,
}

/// Location acquisition service.
#[derive(Clone)]
pub struct LocationStrategy {
    platform: Arc<dyn GeolocationPlatform>,
    environment: Arc<dyn RuntimeEnvironment>,
    overrides: LocationOverrides,
    ip: IpLocator,
    fallback_lat: f64,
    fallback_lng: f64,
}

impl LocationStrategy {
    pub fn new(
        platform: Arc<dyn GeolocationPlatform>,
        environment: Arc<dyn RuntimeEnvironment>,
        config: &Config,
    ) -> Self {
        let settings = config.location_settings(&device::detect(environment.as_ref()));
        Self {
            platform,
            environment,
            overrides: config.location.clone(),
            ip: IpLocator::new(settings.ip_lookup_timeout),
            fallback_lat: config.fallback_lat,
            fallback_lng: config.fallback_lng,
        }
    }

    /// Replace the IP geolocation client.
    pub fn with_ip_locator(mut self, ip: IpLocator) -> Self {
        self.ip = ip;
        self
    }

    pub fn platform(&self) -> Arc<dyn GeolocationPlatform> {
        self.platform.clone()
    }

    /// Capabilities as of now.
    pub fn capabilities(&self) -> DeviceCapabilities {
        device::detect(self.environment.as_ref())
    }

    pub fn user_agent(&self) -> String {
        self.environment.user_agent()
    }

    pub fn settings(&self) -> LocationSettings {
        LocationSettings::for_device(&self.capabilities()).with_overrides(&self.overrides)
    }

    pub fn hints(&self) -> LocationStrategyHints {
        LocationStrategyHints::for_device(&self.capabilities())
    }

    pub fn fallback_position(&self) -> Position {
        Position::fallback(self.fallback_lat, self.fallback_lng)
    }

    /// Run the fallback chain without substituting the static coordinate.
    pub async fn acquire(&self) -> Result<LocationReport, LocationError> {
        let caps = self.capabilities();
        let settings = LocationSettings::for_device(&caps).with_overrides(&self.overrides);

        let mut permission_denied = false;
        if caps.supports_permissions_api
            && self.platform.permission_state().await == PermissionState::Denied
        {
            tracing::info!("Location permission denied, skipping GPS");
            permission_denied = true;
        }

        if !permission_denied && caps.supports_geolocation {
            match self.gps_fix(&settings).await {
                Ok(fix) => {
                    return Ok(LocationReport {
                        position: fix.into(),
                        permission_denied: false,
                    })
                }
                Err(GeolocationError::PermissionDenied) => permission_denied = true,
                Err(_) => {}
            }
        }

        if let Some(position) = self.ip.locate().await {
            return Ok(LocationReport {
                position,
                permission_denied,
            });
        }

        if permission_denied {
            Err(LocationError::PermissionDenied)
        } else {
            Err(LocationError::Undeterminable)
        }
    }

    /// Acquire a position, falling back to the static coordinate.
    pub async fn locate(&self) -> LocationReport {
        match self.acquire().await {
            Ok(report) => report,
            Err(e) => {
                tracing::warn!(error = %e, "Using fallback location");
                LocationReport {
                    position: self.fallback_position(),
                    permission_denied: e == LocationError::PermissionDenied,
                }
            }
        }
    }

    /// High-accuracy attempt, then one relaxed retry unless permission was refused.
    async fn gps_fix(&self, settings: &LocationSettings) -> Result<PositionFix, GeolocationError> {
        let precise = PositionOptions {
            enable_high_accuracy: true,
            timeout: settings.gps_timeout,
            maximum_age: settings.gps_max_age,
        };
        match self.request(precise).await {
            Ok(fix) => return Ok(fix),
            Err(GeolocationError::PermissionDenied) => {
                return Err(GeolocationError::PermissionDenied)
            }
            Err(e) => tracing::debug!(error = %e, "High-accuracy fix failed, retrying"),
        }

        let relaxed = PositionOptions {
            enable_high_accuracy: false,
            timeout: settings.retry_timeout,
            maximum_age: settings.retry_max_age,
        };
        self.request(relaxed).await.inspect_err(|e| {
            tracing::debug!(error = %e, "Low-accuracy fix failed");
        })
    }

    async fn request(&self, options: PositionOptions) -> Result<PositionFix, GeolocationError> {
        tokio::time::timeout(options.timeout, self.platform.current_position(options))
            .await
            .unwrap_or(Err(GeolocationError::Timeout))
    }
}
