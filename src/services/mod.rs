// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - client logic over the store and platform collaborators.

pub mod device;
pub mod favorites;
pub mod feed;
pub mod geocoding;
pub mod geolocation;
pub mod identity;
pub mod ip_lookup;
pub mod location;
pub mod map_session;
pub mod notices;
pub mod pin_panel;
pub mod pins;
pub mod session;
pub mod tracker;
pub mod votes;

pub use device::{DeviceCapabilities, LocationStrategyHints, RuntimeEnvironment, StaticEnvironment};
pub use favorites::FavoriteService;
pub use feed::{annotate_markers, LiveFeed, Marker, MarkerBoard};
pub use geocoding::Geocoder;
pub use geolocation::{GeolocationError, GeolocationPlatform, NoGeolocation};
pub use identity::{AuthError, FirebaseAuthClient, IdentityProvider};
pub use ip_lookup::{IpLocator, IpService};
pub use location::{LocationError, LocationReport, LocationStrategy};
pub use map_session::{MapSession, MapView};
pub use notices::Notices;
pub use pin_panel::PinPanel;
pub use pins::PinService;
pub use session::{Session, SessionUser};
pub use tracker::PositionTracker;
pub use votes::VoteService;
