// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Park-for-free headless client
//!
//! Resolves a location without platform geolocation (IP lookup, then the
//! fallback coordinate), follows the live pin feed and, when credentials are
//! configured, the user's favorites. Runs until Ctrl-C.

use parknfree::{
    config::Config,
    db::{FirestoreDb, MemoryStore, PinStore},
    services::{FirebaseAuthClient, NoGeolocation, StaticEnvironment},
    AppContext,
};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging
    init_logging();

    // Load configuration from environment
    let config = Config::from_env().expect("Failed to load configuration");
    tracing::info!(
        project = %config.firebase_project_id,
        offline = config.offline,
        "Starting parknfree"
    );

    let store: Arc<dyn PinStore> = if config.offline {
        tracing::info!("Using in-memory store");
        Arc::new(MemoryStore::new())
    } else {
        Arc::new(
            FirestoreDb::new(&config.firebase_project_id)
                .await
                .expect("Failed to connect to Firestore"),
        )
    };

    let identity = Arc::new(FirebaseAuthClient::new(
        &config.identity_url,
        &config.firebase_api_key,
    ));
    let app = AppContext::new(config, store, identity);

    let mut notices = app.notices.subscribe();
    tokio::spawn(async move {
        loop {
            match notices.recv().await {
                Ok(notice) => tracing::warn!(kind = ?notice.kind, message = %notice.message, "Notice"),
                Err(RecvError::Lagged(skipped)) => tracing::debug!(skipped, "Notices skipped"),
                Err(RecvError::Closed) => break,
            }
        }
    });

    if let (Ok(email), Ok(password)) = (
        std::env::var("PARKNFREE_EMAIL"),
        std::env::var("PARKNFREE_PASSWORD"),
    ) {
        if let Err(e) = app.session.sign_in(&email, &password).await {
            tracing::warn!(error = %e, message = %e.user_message(), "Sign-in failed, continuing signed out");
        }
    }

    let environment = Arc::new(StaticEnvironment {
        user_agent: format!("parknfree/{}", env!("CARGO_PKG_VERSION")),
        ..Default::default()
    });
    let map = app.map_session(Arc::new(NoGeolocation), environment);
    let report = map.mount().await;
    tracing::info!(
        method = report.position.method.display_name(),
        source = ?report.position.source,
        lat = report.position.lat,
        lng = report.position.lng,
        "Map centered"
    );

    let pins = app.pins_feed();
    pins.on_update(|pins| {
        tracing::info!(
            count = pins.len(),
            newest = ?pins.first().map(|p| p.place_label.as_str()),
            "Pins updated"
        );
    });
    pins.on_error(|e| tracing::error!(error = %e, "Pin feed ended"));
    pins.start().await?;

    let favorites = app.favorites_feed();
    if let Some(feed) = &favorites {
        feed.on_update(|favorites| tracing::info!(count = favorites.len(), "Favorites updated"));
        feed.on_error(|e| tracing::error!(error = %e, "Favorites feed ended"));
        feed.start().await?;
    }

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down");

    if let Some(feed) = &favorites {
        feed.stop();
    }
    pins.stop();
    map.unmount();
    app.session.sign_out();
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("parknfree=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
