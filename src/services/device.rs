// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Device capability detection and location guidance.
//!
//! Everything here is a pure function of what the runtime environment
//! reports at the moment of the call. Nothing is cached, so a change such as
//! installing the app to the home screen shows up on the next call.

use serde::Serialize;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// What the host environment reports about itself.
pub trait RuntimeEnvironment: Send + Sync {
    fn user_agent(&self) -> String;

    /// Display mode is `standalone` (installed app).
    fn standalone_display(&self) -> bool;

    /// Legacy iOS home-screen flag.
    fn navigator_standalone(&self) -> bool {
        false
    }

    fn has_geolocation(&self) -> bool;

    fn has_permissions_api(&self) -> bool;
}

/// Fixed environment description.
///
/// Used by the headless binary and tests; a host shell supplies its own
/// [`RuntimeEnvironment`] that reads live values.
#[derive(Debug, Clone, Default)]
pub struct StaticEnvironment {
    pub user_agent: String,
    pub standalone_display: bool,
    pub navigator_standalone: bool,
    pub geolocation: bool,
    pub permissions_api: bool,
}

impl RuntimeEnvironment for StaticEnvironment {
    fn user_agent(&self) -> String {
        self.user_agent.clone()
    }

    fn standalone_display(&self) -> bool {
        self.standalone_display
    }

    fn navigator_standalone(&self) -> bool {
        self.navigator_standalone
    }

    fn has_geolocation(&self) -> bool {
        self.geolocation
    }

    fn has_permissions_api(&self) -> bool {
        self.permissions_api
    }
}

/// Platform classification and available location APIs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct DeviceCapabilities {
    #[serde(rename = "isIOS")]
    pub is_ios: bool,
    pub is_android: bool,
    pub is_safari: bool,
    pub is_chrome: bool,
    pub is_firefox: bool,
    #[serde(rename = "isPWA")]
    pub is_pwa: bool,
    pub supports_geolocation: bool,
    pub supports_permissions_api: bool,
}

/// Classify the environment. Missing APIs report `false`.
pub fn detect(env: &dyn RuntimeEnvironment) -> DeviceCapabilities {
    let ua = env.user_agent();
    let has = |needle: &str| ua.contains(needle);

    DeviceCapabilities {
        is_ios: has("iPad") || has("iPhone") || has("iPod"),
        is_android: has("Android"),
        is_safari: has("Safari") && !has("Chrome"),
        is_chrome: has("Chrome") && !has("Edge"),
        is_firefox: has("Firefox"),
        is_pwa: env.standalone_display() || env.navigator_standalone(),
        supports_geolocation: env.has_geolocation(),
        supports_permissions_api: env.has_permissions_api(),
    }
}

/// Browser name for iOS settings instructions.
///
/// iOS browsers all identify as Safari, so the app-specific token is checked first.
pub fn browser_name(user_agent: &str) -> &'static str {
    let ua = user_agent.to_ascii_lowercase();
    let ios_tokens = [
        ("crios", "Chrome"),
        ("fxios", "Firefox"),
        ("edgios", "Edge"),
        ("opios", "Opera"),
    ];
    for (token, name) in ios_tokens {
        if ua.contains(token) {
            return name;
        }
    }
    if ua.contains("safari") {
        return "Safari";
    }
    "the Browser you are using"
}

/// Device-specific steps for re-enabling location access.
pub fn permission_guidance(caps: &DeviceCapabilities, user_agent: &str) -> Vec<String> {
    if caps.is_ios {
        let app = if caps.is_pwa {
            "this app".to_string()
        } else {
            format!("'{}'", browser_name(user_agent))
        };
        return vec![
            "Go to Settings → Privacy & Security → Location Services".to_string(),
            format!("Find {} and set it to 'While Using App'", app),
            "Return here and tap 'Try Again' below".to_string(),
        ];
    }

    if caps.is_android {
        return vec![
            "Tap 'Allow' when prompted for location access".to_string(),
            "If not prompted, go to Settings → Apps → Browser → Permissions".to_string(),
            "Enable Location permission and tap 'Try Again'".to_string(),
        ];
    }

    vec![
        "Click 'Allow' when your browser asks for location access".to_string(),
        "If blocked, click the location icon in your address bar".to_string(),
        "Set location permission to 'Allow' and try again".to_string(),
    ]
}

/// How location should be requested on this device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocationStrategyHints {
    /// iOS Safari outside an installed app only prompts after a user gesture
    pub requires_user_interaction: bool,
    pub can_auto_request: bool,
    pub recommended_timeout_ms: u64,
    pub recommended_max_age_ms: u64,
}

impl LocationStrategyHints {
    pub fn for_device(caps: &DeviceCapabilities) -> Self {
        Self {
            requires_user_interaction: caps.is_ios && caps.is_safari && !caps.is_pwa,
            can_auto_request: !caps.is_ios || caps.is_pwa,
            recommended_timeout_ms: if caps.is_ios { 10_000 } else { 15_000 },
            recommended_max_age_ms: if caps.is_ios { 30_000 } else { 60_000 },
        }
    }
}
