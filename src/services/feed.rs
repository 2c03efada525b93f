// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Real-time pin and favorite feeds.
//!
//! A [`LiveFeed`] owns one store subscription. Handlers get every full
//! snapshot; the subscription is released by `stop()`, on drop, or when a
//! per-user feed's user signs out.

use crate::db::{PinStore, SnapshotStream};
use crate::error::{AppError, Result};
use crate::models::{Favorite, Pin};
use crate::services::session::{Session, SessionUser};
use futures_util::future::BoxFuture;
use futures_util::{FutureExt, StreamExt};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use tokio::sync::watch;
use tokio::task::JoinHandle;

type Source<T> = Arc<dyn Fn() -> BoxFuture<'static, Result<SnapshotStream<T>>> + Send + Sync>;
type UpdateHandler<T> = Arc<dyn Fn(&[T]) + Send + Sync>;
type ErrorHandler = Arc<dyn Fn(&AppError) + Send + Sync>;
/// Resolves when the feed must close on its own.
type Until = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

struct Handlers<T> {
    update: Vec<UpdateHandler<T>>,
    error: Vec<ErrorHandler>,
}

fn read_handlers<T>(handlers: &RwLock<Handlers<T>>) -> std::sync::RwLockReadGuard<'_, Handlers<T>> {
    handlers
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Subscription handle for one live query.
pub struct LiveFeed<T> {
    name: &'static str,
    source: Source<T>,
    until: Option<Until>,
    handlers: Arc<RwLock<Handlers<T>>>,
    latest: Arc<watch::Sender<Option<Vec<T>>>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl LiveFeed<Pin> {
    /// All pins, newest first.
    pub fn pins(store: Arc<dyn PinStore>) -> Self {
        Self::new(
            "pins",
            Arc::new(move || {
                let store = store.clone();
                async move { store.watch_pins().await }.boxed()
            }),
        )
    }
}

impl LiveFeed<Favorite> {
    /// One user's favorite set.
    pub fn favorites(store: Arc<dyn PinStore>, uid: &str) -> Self {
        let uid = uid.to_string();
        Self::new(
            "favorites",
            Arc::new(move || {
                let store = store.clone();
                let uid = uid.clone();
                async move { store.watch_favorites(&uid).await }.boxed()
            }),
        )
    }

    /// The signed-in user's favorite set. The feed closes and forgets its
    /// snapshot once that user signs out or another user signs in.
    pub fn favorites_for_session(store: Arc<dyn PinStore>, session: &Session) -> Option<Self> {
        let uid = session.current()?.uid().to_string();
        let mut feed = Self::favorites(store, &uid);

        let changes = session.subscribe();
        feed.until = Some(Arc::new(move || {
            let mut changes = changes.clone();
            let uid = uid.clone();
            async move {
                // A dropped session counts as a sign-out.
                let _ = changes
                    .wait_for(|user| user.as_ref().map(SessionUser::uid) != Some(uid.as_str()))
                    .await;
            }
            .boxed()
        }));
        Some(feed)
    }
}

impl<T: Clone + Send + Sync + 'static> LiveFeed<T> {
    fn new(name: &'static str, source: Source<T>) -> Self {
        let (latest, _) = watch::channel(None);
        Self {
            name,
            source,
            until: None,
            handlers: Arc::new(RwLock::new(Handlers {
                update: Vec::new(),
                error: Vec::new(),
            })),
            latest: Arc::new(latest),
            task: Mutex::new(None),
        }
    }

    fn task(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.task.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register a snapshot handler.
    pub fn on_update(&self, handler: impl Fn(&[T]) + Send + Sync + 'static) {
        self.handlers
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .update
            .push(Arc::new(handler));
    }

    /// Register a handler for the error that ends the subscription.
    pub fn on_error(&self, handler: impl Fn(&AppError) + Send + Sync + 'static) {
        self.handlers
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .error
            .push(Arc::new(handler));
    }

    /// Open the subscription. A no-op while one is running.
    pub async fn start(&self) -> Result<()> {
        if self.is_running() {
            return Ok(());
        }

        let mut snapshots = (self.source)().await?;
        let name = self.name;
        let handlers = self.handlers.clone();
        let latest = self.latest.clone();

        let mut ended = match &self.until {
            Some(until) => until(),
            None => futures_util::future::pending().boxed(),
        };

        let task = tokio::spawn(async move {
            loop {
                let item = tokio::select! {
                    item = snapshots.next() => item,
                    _ = &mut ended => {
                        tracing::info!(feed = name, "Live feed owner changed, closing");
                        latest.send_replace(None);
                        return;
                    }
                };
                match item {
                    Some(Ok(snapshot)) => {
                        tracing::debug!(feed = name, count = snapshot.len(), "Snapshot");
                        // Handlers run outside the lock.
                        let update = read_handlers(&handlers).update.clone();
                        for handler in &update {
                            handler(&snapshot);
                        }
                        latest.send_replace(Some(snapshot));
                    }
                    Some(Err(e)) => {
                        tracing::error!(feed = name, error = %e, "Live feed failed");
                        let error = read_handlers(&handlers).error.clone();
                        for handler in &error {
                            handler(&e);
                        }
                        return;
                    }
                    None => return,
                }
            }
        });

        let mut slot = self.task();
        if let Some(previous) = slot.replace(task) {
            previous.abort();
        }
        tracing::info!(feed = self.name, "Live feed started");
        Ok(())
    }

    /// Release the subscription. Safe to call when not running.
    pub fn stop(&self) {
        if let Some(task) = self.task().take() {
            task.abort();
            tracing::info!(feed = self.name, "Live feed stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.task().as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Most recent snapshot, if any arrived.
    pub fn snapshot(&self) -> Option<Vec<T>> {
        self.latest.borrow().clone()
    }

    /// Snapshot notifications for async consumers.
    pub fn subscribe(&self) -> watch::Receiver<Option<Vec<T>>> {
        self.latest.subscribe()
    }
}

impl<T> Drop for LiveFeed<T> {
    fn drop(&mut self) {
        let task = self
            .task
            .get_mut()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(task) = task.take() {
            task.abort();
        }
    }
}

/// A pin as drawn on the map.
#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub pin: Pin,
    pub is_favorite: bool,
}

/// Mark the user's favorites among the pins.
///
/// Favorites are only marked for a signed-in user.
pub fn annotate_markers(pins: &[Pin], favorites: &[Favorite], signed_in: bool) -> Vec<Marker> {
    let favorite_ids: HashSet<&str> = if signed_in {
        favorites.iter().map(|f| f.pin_id.as_str()).collect()
    } else {
        HashSet::new()
    };

    pins.iter()
        .map(|pin| Marker {
            is_favorite: favorite_ids.contains(pin.doc_id()),
            pin: pin.clone(),
        })
        .collect()
}

/// Latest pins and favorites, merged in whichever order they arrive.
#[derive(Debug, Clone, Default)]
pub struct MarkerBoard {
    pins: Vec<Pin>,
    favorites: Vec<Favorite>,
    signed_in: bool,
}

impl MarkerBoard {
    pub fn set_pins(&mut self, pins: &[Pin]) {
        self.pins = pins.to_vec();
    }

    pub fn set_favorites(&mut self, favorites: &[Favorite]) {
        self.favorites = favorites.to_vec();
    }

    /// Track sign-in; signing out drops the favorite set.
    pub fn set_signed_in(&mut self, signed_in: bool) {
        self.signed_in = signed_in;
        if !signed_in {
            self.favorites.clear();
        }
    }

    pub fn markers(&self) -> Vec<Marker> {
        annotate_markers(&self.pins, &self.favorites, self.signed_in)
    }
}
