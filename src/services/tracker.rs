// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Continuous position tracking.
//!
//! Tracking only moves the position marker. Recentering the view belongs to
//! the first fix and explicit "locate me" requests.

use crate::models::Position;
use crate::services::geolocation::{GeolocationError, GeolocationPlatform, PositionOptions};
use futures_util::StreamExt;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Holds at most one platform watch subscription.
pub struct PositionTracker {
    platform: Arc<dyn GeolocationPlatform>,
    options: PositionOptions,
    position_tx: Arc<watch::Sender<Option<Position>>>,
    subscription: Mutex<Option<JoinHandle<()>>>,
}

impl PositionTracker {
    pub fn new(platform: Arc<dyn GeolocationPlatform>, options: PositionOptions) -> Self {
        let (position_tx, _) = watch::channel(None);
        Self {
            platform,
            options,
            position_tx: Arc::new(position_tx),
            subscription: Mutex::new(None),
        }
    }

    fn subscription(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.subscription
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Start tracking. Returns `Ok(false)` when a subscription is already held.
    pub fn start(&self) -> Result<bool, GeolocationError> {
        let mut subscription = self.subscription();
        if subscription.as_ref().is_some_and(|task| !task.is_finished()) {
            return Ok(false);
        }

        let mut samples = self.platform.watch_position(self.options)?;
        let tx = self.position_tx.clone();

        *subscription = Some(tokio::spawn(async move {
            while let Some(sample) = samples.next().await {
                match sample {
                    Ok(fix) => {
                        tx.send_replace(Some(fix.into()));
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Position watch error");
                    }
                }
            }
            tracing::debug!("Position watch ended");
        }));

        tracing::info!("Position tracking started");
        Ok(true)
    }

    /// Release the subscription. Safe to call when not tracking.
    pub fn stop(&self) {
        if let Some(task) = self.subscription().take() {
            task.abort();
            tracing::info!("Position tracking stopped");
        }
    }

    pub fn is_tracking(&self) -> bool {
        self.subscription()
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    /// Latest tracked position.
    pub fn latest(&self) -> Option<Position> {
        self.position_tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Position>> {
        self.position_tx.subscribe()
    }
}

impl Drop for PositionTracker {
    fn drop(&mut self) {
        self.stop();
    }
}
