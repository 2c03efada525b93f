// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Map lifecycle: first fix, tracking and "locate me".
//!
//! The viewport center only moves on the first fix and on explicit
//! `locate_me()` calls. Tracking updates move the position marker alone.

use crate::models::{LocationMethod, Position};
use crate::services::device::permission_guidance;
use crate::services::geolocation::PositionOptions;
use crate::services::location::{LocationReport, LocationStrategy};
use crate::services::tracker::PositionTracker;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// What the map shows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MapView {
    /// Viewport center
    pub center: Option<Position>,
    /// User position marker
    pub marker: Option<Position>,
    pub show_permission_guidance: bool,
    /// An acquisition is in flight
    pub locating: bool,
}

pub struct MapSession {
    strategy: LocationStrategy,
    tracker: Arc<PositionTracker>,
    view: Arc<watch::Sender<MapView>>,
    tracking_requested: AtomicBool,
    follow: Mutex<Option<JoinHandle<()>>>,
}

impl MapSession {
    pub fn new(strategy: LocationStrategy) -> Self {
        let settings = strategy.settings();
        let tracker = PositionTracker::new(
            strategy.platform(),
            PositionOptions {
                enable_high_accuracy: true,
                timeout: settings.gps_timeout,
                maximum_age: Duration::ZERO,
            },
        );
        let (view, _) = watch::channel(MapView::default());

        Self {
            strategy,
            tracker: Arc::new(tracker),
            view: Arc::new(view),
            tracking_requested: AtomicBool::new(false),
            follow: Mutex::new(None),
        }
    }

    fn follow(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.follow
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn view(&self) -> MapView {
        self.view.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<MapView> {
        self.view.subscribe()
    }

    pub fn tracker(&self) -> &PositionTracker {
        &self.tracker
    }

    /// Initial acquisition. Starts tracking once, after the settle delay,
    /// when the first fix came from GPS.
    pub async fn mount(&self) -> LocationReport {
        let report = self.acquire().await;

        if report.position.method == LocationMethod::Gps
            && !self.tracking_requested.swap(true, Ordering::SeqCst)
        {
            self.schedule_tracking(self.strategy.settings().tracking_settle);
        }
        report
    }

    /// User-initiated relocation; always recenters.
    pub async fn locate_me(&self) -> LocationReport {
        self.acquire().await
    }

    async fn acquire(&self) -> LocationReport {
        self.view.send_modify(|view| view.locating = true);

        let report = self.strategy.locate().await;
        tracing::info!(
            method = ?report.position.method,
            lat = report.position.lat,
            lng = report.position.lng,
            permission_denied = report.permission_denied,
            "Location acquired"
        );

        self.view.send_modify(|view| {
            view.center = Some(report.position.clone());
            view.marker = Some(report.position.clone());
            view.show_permission_guidance = report.permission_denied;
            view.locating = false;
        });
        report
    }

    fn schedule_tracking(&self, settle: Duration) {
        let tracker = self.tracker.clone();
        let view = self.view.clone();

        let task = tokio::spawn(async move {
            tokio::time::sleep(settle).await;
            // Subscribe first so the earliest sample is not missed.
            let mut positions = tracker.subscribe();
            if let Err(e) = tracker.start() {
                tracing::warn!(error = %e, "Could not start position tracking");
                return;
            }

            while positions.changed().await.is_ok() {
                let latest = positions.borrow_and_update().clone();
                if let Some(position) = latest {
                    view.send_modify(|v| v.marker = Some(position));
                }
            }
        });

        if let Some(previous) = self.follow().replace(task) {
            previous.abort();
        }
    }

    pub fn dismiss_guidance(&self) {
        self.view
            .send_modify(|view| view.show_permission_guidance = false);
    }

    /// Enable-location steps for this device.
    pub fn guidance_steps(&self) -> Vec<String> {
        permission_guidance(&self.strategy.capabilities(), &self.strategy.user_agent())
    }

    /// Stop tracking and release the platform subscription.
    pub fn unmount(&self) {
        if let Some(task) = self.follow().take() {
            task.abort();
        }
        self.tracker.stop();
    }
}

impl Drop for MapSession {
    fn drop(&mut self) {
        self.unmount();
    }
}
