// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Park for free: community map of free parking spots.
//!
//! This crate provides the client core: location acquisition with layered
//! fallback, position tracking, pins with consistent vote counters,
//! favorites and real-time feeds over Firestore.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod time_utils;

use config::Config;
use db::PinStore;
use error::Result;
use models::{Favorite, Pin};
use services::{
    FavoriteService, Geocoder, GeolocationPlatform, IdentityProvider, LiveFeed, LocationStrategy,
    MapSession, Notices, PinPanel, PinService, RuntimeEnvironment, Session, VoteService,
};
use std::sync::Arc;

/// Application context, built once at startup and passed down.
pub struct AppContext {
    pub config: Config,
    pub store: Arc<dyn PinStore>,
    pub session: Session,
    pub notices: Notices,
    pub pins: PinService,
    pub votes: VoteService,
    pub favorites: FavoriteService,
}

impl AppContext {
    pub fn new(
        config: Config,
        store: Arc<dyn PinStore>,
        identity: Arc<dyn IdentityProvider>,
    ) -> Self {
        let notices = Notices::new();
        let session = Session::new(identity, store.clone());
        let geocoder = Geocoder::new(
            &config.nominatim_url,
            &config.geocoder_user_agent,
            config.geocoder_timeout,
        );

        let pins = PinService::new(
            store.clone(),
            session.clone(),
            geocoder,
            notices.clone(),
            config.admin_email.clone(),
        );
        let votes = VoteService::new(store.clone(), session.clone(), notices.clone());
        let favorites = FavoriteService::new(store.clone(), session.clone(), notices.clone());

        Self {
            config,
            store,
            session,
            notices,
            pins,
            votes,
            favorites,
        }
    }

    pub fn location_strategy(
        &self,
        platform: Arc<dyn GeolocationPlatform>,
        environment: Arc<dyn RuntimeEnvironment>,
    ) -> LocationStrategy {
        LocationStrategy::new(platform, environment, &self.config)
    }

    pub fn map_session(
        &self,
        platform: Arc<dyn GeolocationPlatform>,
        environment: Arc<dyn RuntimeEnvironment>,
    ) -> MapSession {
        MapSession::new(self.location_strategy(platform, environment))
    }

    pub fn pins_feed(&self) -> LiveFeed<Pin> {
        LiveFeed::pins(self.store.clone())
    }

    /// Favorites feed of the signed-in user, if any. It closes by itself
    /// on sign-out.
    pub fn favorites_feed(&self) -> Option<LiveFeed<Favorite>> {
        LiveFeed::favorites_for_session(self.store.clone(), &self.session)
    }

    pub async fn open_pin(&self, pin_id: &str) -> Result<PinPanel> {
        PinPanel::open(pin_id, self.votes.clone(), self.favorites.clone()).await
    }
}
