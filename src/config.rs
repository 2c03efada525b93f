//! Application configuration loaded from environment variables.
//!
//! Location timing values are tunable: [`LocationSettings::for_device`] picks
//! platform defaults and any `*_MS` variable set in the environment overrides
//! them.

use crate::services::device::DeviceCapabilities;
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Limassol, Cyprus.
pub const DEFAULT_FALLBACK_LAT: f64 = 34.67503960521671;
pub const DEFAULT_FALLBACK_LNG: f64 = 33.043841190472115;

const DEFAULT_NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org";
const DEFAULT_IDENTITY_URL: &str = "https://identitytoolkit.googleapis.com/v1";
const DEFAULT_GEOCODER_TIMEOUT: Duration = Duration::from_secs(5);

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Firebase / GCP project ID
    pub firebase_project_id: String,
    /// Web API key for the Identity Toolkit REST API
    pub firebase_api_key: String,
    /// Email allowed to delete any pin
    pub admin_email: Option<String>,
    /// Coordinate used when no location can be determined
    pub fallback_lat: f64,
    pub fallback_lng: f64,
    /// Reverse geocoding base URL
    pub nominatim_url: String,
    pub geocoder_user_agent: String,
    /// Upper bound on one reverse lookup before the numeric label is used
    pub geocoder_timeout: Duration,
    /// Identity Toolkit base URL
    pub identity_url: String,
    /// Use the in-memory store instead of Firestore
    pub offline: bool,
    pub location: LocationOverrides,
}

/// Location timing values set explicitly in the environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocationOverrides {
    pub gps_timeout: Option<Duration>,
    pub gps_max_age: Option<Duration>,
    pub retry_timeout: Option<Duration>,
    pub retry_max_age: Option<Duration>,
    pub ip_lookup_timeout: Option<Duration>,
    pub tracking_settle: Option<Duration>,
}

/// Timeouts and cache ages used by location acquisition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocationSettings {
    /// High-accuracy attempt
    pub gps_timeout: Duration,
    pub gps_max_age: Duration,
    /// Low-accuracy retry
    pub retry_timeout: Duration,
    pub retry_max_age: Duration,
    /// Per IP service
    pub ip_lookup_timeout: Duration,
    /// Delay between a GPS first fix and starting the tracker
    pub tracking_settle: Duration,
}

impl LocationSettings {
    /// Platform defaults: iOS gets a shorter timeout and fresher cache.
    pub fn for_device(caps: &DeviceCapabilities) -> Self {
        let (timeout_ms, max_age_ms) = if caps.is_ios {
            (10_000, 30_000)
        } else {
            (15_000, 60_000)
        };

        Self {
            gps_timeout: Duration::from_millis(timeout_ms),
            gps_max_age: Duration::from_millis(max_age_ms),
            retry_timeout: Duration::from_millis(timeout_ms * 2),
            retry_max_age: Duration::from_secs(300),
            ip_lookup_timeout: Duration::from_secs(5),
            tracking_settle: Duration::from_secs(2),
        }
    }

    pub fn with_overrides(self, overrides: &LocationOverrides) -> Self {
        Self {
            gps_timeout: overrides.gps_timeout.unwrap_or(self.gps_timeout),
            gps_max_age: overrides.gps_max_age.unwrap_or(self.gps_max_age),
            retry_timeout: overrides.retry_timeout.unwrap_or(self.retry_timeout),
            retry_max_age: overrides.retry_max_age.unwrap_or(self.retry_max_age),
            ip_lookup_timeout: overrides
                .ip_lookup_timeout
                .unwrap_or(self.ip_lookup_timeout),
            tracking_settle: overrides.tracking_settle.unwrap_or(self.tracking_settle),
        }
    }

    /// Worst-case time spent on the two GPS attempts.
    pub fn gps_budget(&self) -> Duration {
        self.gps_timeout + self.retry_timeout
    }
}

impl Config {
    /// Load configuration from environment variables (and `.env` if present).
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Ok(Self {
            firebase_project_id: env::var("FIREBASE_PROJECT_ID")
                .unwrap_or_else(|_| "parknfree".to_string()),
            firebase_api_key: env::var("FIREBASE_API_KEY")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("FIREBASE_API_KEY"))?,
            admin_email: env::var("ADMIN_EMAIL")
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty()),
            fallback_lat: parse_var("FALLBACK_LAT")?.unwrap_or(DEFAULT_FALLBACK_LAT),
            fallback_lng: parse_var("FALLBACK_LNG")?.unwrap_or(DEFAULT_FALLBACK_LNG),
            nominatim_url: env::var("NOMINATIM_URL")
                .unwrap_or_else(|_| DEFAULT_NOMINATIM_URL.to_string()),
            geocoder_user_agent: env::var("GEOCODER_USER_AGENT")
                .unwrap_or_else(|_| "parknfree/1.0".to_string()),
            geocoder_timeout: parse_millis("GEOCODER_TIMEOUT_MS")?
                .unwrap_or(DEFAULT_GEOCODER_TIMEOUT),
            identity_url: env::var("IDENTITY_URL")
                .unwrap_or_else(|_| DEFAULT_IDENTITY_URL.to_string()),
            offline: parse_var::<bool>("PARKNFREE_OFFLINE")?.unwrap_or(false),
            location: LocationOverrides {
                gps_timeout: parse_millis("GPS_TIMEOUT_MS")?,
                gps_max_age: parse_millis("GPS_MAX_AGE_MS")?,
                retry_timeout: parse_millis("GPS_RETRY_TIMEOUT_MS")?,
                retry_max_age: parse_millis("GPS_RETRY_MAX_AGE_MS")?,
                ip_lookup_timeout: parse_millis("IP_LOOKUP_TIMEOUT_MS")?,
                tracking_settle: parse_millis("TRACKING_SETTLE_MS")?,
            },
        })
    }

    /// Default config for testing only.
    pub fn test_default() -> Self {
        Self {
            firebase_project_id: "test-project".to_string(),
            firebase_api_key: "test-api-key".to_string(),
            admin_email: Some("admin@example.com".to_string()),
            fallback_lat: DEFAULT_FALLBACK_LAT,
            fallback_lng: DEFAULT_FALLBACK_LNG,
            nominatim_url: "http://127.0.0.1:9".to_string(),
            geocoder_user_agent: "parknfree-test/1.0".to_string(),
            geocoder_timeout: DEFAULT_GEOCODER_TIMEOUT,
            identity_url: "http://127.0.0.1:9".to_string(),
            offline: true,
            location: LocationOverrides::default(),
        }
    }

    /// Location timings for a device, with environment overrides applied.
    pub fn location_settings(&self, caps: &DeviceCapabilities) -> LocationSettings {
        LocationSettings::for_device(caps).with_overrides(&self.location)
    }
}

fn parse_var<T: FromStr>(name: &'static str) -> Result<Option<T>, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid(name, raw)),
        Err(_) => Ok(None),
    }
}

fn parse_millis(name: &'static str) -> Result<Option<Duration>, ConfigError> {
    Ok(parse_var::<u64>(name)?.map(Duration::from_millis))
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1:?}")]
    Invalid(&'static str, String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_env() {
        // Set required env vars for test
        env::set_var("FIREBASE_API_KEY", "test_key");
        env::set_var("GPS_TIMEOUT_MS", "8000");

        let config = Config::from_env().expect("Config should load");

        assert_eq!(config.firebase_api_key, "test_key");
        assert_eq!(config.location.gps_timeout, Some(Duration::from_secs(8)));
        assert_eq!(config.fallback_lat, DEFAULT_FALLBACK_LAT);

        env::remove_var("GPS_TIMEOUT_MS");
    }

    #[test]
    fn test_invalid_number_is_rejected() {
        env::set_var("PARKNFREE_TEST_BAD_MS", "soon");
        let err = parse_millis("PARKNFREE_TEST_BAD_MS").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid("PARKNFREE_TEST_BAD_MS", _)));
        env::remove_var("PARKNFREE_TEST_BAD_MS");
    }

    #[test]
    fn test_device_defaults() {
        let ios = DeviceCapabilities {
            is_ios: true,
            ..Default::default()
        };
        let settings = LocationSettings::for_device(&ios);
        assert_eq!(settings.gps_timeout, Duration::from_secs(10));
        assert_eq!(settings.gps_max_age, Duration::from_secs(30));
        assert_eq!(settings.retry_timeout, Duration::from_secs(20));
        assert_eq!(settings.retry_max_age, Duration::from_secs(300));

        let other = LocationSettings::for_device(&DeviceCapabilities::default());
        assert_eq!(other.gps_timeout, Duration::from_secs(15));
        assert_eq!(other.gps_max_age, Duration::from_secs(60));
        assert_eq!(other.ip_lookup_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_overrides_replace_only_set_values() {
        let overrides = LocationOverrides {
            tracking_settle: Some(Duration::ZERO),
            ..Default::default()
        };
        let settings =
            LocationSettings::for_device(&DeviceCapabilities::default()).with_overrides(&overrides);
        assert_eq!(settings.tracking_settle, Duration::ZERO);
        assert_eq!(settings.gps_timeout, Duration::from_secs(15));
    }
}
