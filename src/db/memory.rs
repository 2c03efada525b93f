//! In-process document store.
//!
//! Used when running offline and by the test suite. Each pin's vote records
//! live next to the pin, so a vote transition runs entirely under the pin's
//! exclusive map entry and concurrent voters cannot interleave.

use crate::db::{sort_newest_first, PinStore, SnapshotStream};
use crate::error::{AppError, Result};
use crate::models::{Favorite, Pin, User, VoteKind, VoteRecord, VoteState};
use crate::models::vote::RecordChange;
use crate::time_utils::now_rfc3339;
use async_trait::async_trait;
use dashmap::DashMap;
use futures_util::StreamExt;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

struct PinEntry {
    pin: Pin,
    votes: HashMap<String, VoteRecord>,
}

struct Inner {
    users: DashMap<String, User>,
    pins: DashMap<String, PinEntry>,
    favorites: DashMap<String, BTreeMap<String, Favorite>>,
    pins_tx: watch::Sender<Vec<Pin>>,
    favorites_tx: DashMap<String, watch::Sender<Vec<Favorite>>>,
    next_id: AtomicU64,
    reject_writes: AtomicBool,
}

/// In-memory [`PinStore`].
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        let (pins_tx, _) = watch::channel(Vec::new());
        Self {
            inner: Arc::new(Inner {
                users: DashMap::new(),
                pins: DashMap::new(),
                favorites: DashMap::new(),
                pins_tx,
                favorites_tx: DashMap::new(),
                next_id: AtomicU64::new(1),
                reject_writes: AtomicBool::new(false),
            }),
        }
    }

    /// Make every subsequent write fail with a database error (fault injection).
    pub fn reject_writes(&self, reject: bool) {
        self.inner.reject_writes.store(reject, Ordering::SeqCst);
    }

    /// Number of vote records currently stored for a pin.
    pub fn vote_count(&self, pin_id: &str) -> usize {
        self.inner
            .pins
            .get(pin_id)
            .map(|entry| entry.votes.len())
            .unwrap_or(0)
    }

    fn check_writable(&self) -> Result<()> {
        if self.inner.reject_writes.load(Ordering::SeqCst) {
            return Err(AppError::Database("write rejected".to_string()));
        }
        Ok(())
    }

    fn publish_pins(&self) {
        // Collect before sending so no shard lock is held across the send.
        let mut pins: Vec<Pin> = self
            .inner
            .pins
            .iter()
            .map(|entry| entry.pin.clone())
            .collect();
        sort_newest_first(&mut pins);
        self.inner.pins_tx.send_replace(pins);
    }

    fn publish_favorites(&self, uid: &str) {
        let favorites: Vec<Favorite> = self
            .inner
            .favorites
            .get(uid)
            .map(|set| set.values().cloned().collect())
            .unwrap_or_default();
        self.favorites_sender(uid).send_replace(favorites);
    }

    fn favorites_sender(&self, uid: &str) -> watch::Sender<Vec<Favorite>> {
        self.inner
            .favorites_tx
            .entry(uid.to_string())
            .or_insert_with(|| watch::channel(Vec::new()).0)
            .clone()
    }
}

/// Turn a watch receiver into a snapshot stream that starts with the current value.
fn snapshot_stream<T>(mut rx: watch::Receiver<Vec<T>>) -> SnapshotStream<T>
where
    T: Clone + Send + Sync + 'static,
{
    rx.mark_changed();
    futures_util::stream::unfold(rx, |mut rx| async move {
        rx.changed().await.ok()?;
        let snapshot = rx.borrow_and_update().clone();
        Some((Ok(snapshot), rx))
    })
    .boxed()
}

#[async_trait]
impl PinStore for MemoryStore {
    async fn get_user(&self, uid: &str) -> Result<Option<User>> {
        Ok(self.inner.users.get(uid).map(|u| u.clone()))
    }

    async fn upsert_user(&self, user: &User) -> Result<()> {
        self.check_writable()?;
        self.inner.users.insert(user.uid.clone(), user.clone());
        Ok(())
    }

    async fn delete_user_data(&self, uid: &str) -> Result<()> {
        self.check_writable()?;
        self.inner.favorites.remove(uid);
        self.publish_favorites(uid);
        self.inner.users.remove(uid);
        Ok(())
    }

    async fn create_pin(&self, pin: &Pin) -> Result<Pin> {
        self.check_writable()?;
        let n = self.inner.next_id.fetch_add(1, Ordering::SeqCst);
        let id = format!("pin-{:06}", n);

        let mut stored = pin.clone();
        stored.id = Some(id.clone());
        self.inner.pins.insert(
            id,
            PinEntry {
                pin: stored.clone(),
                votes: HashMap::new(),
            },
        );
        self.publish_pins();
        Ok(stored)
    }

    async fn get_pin(&self, pin_id: &str) -> Result<Option<Pin>> {
        Ok(self.inner.pins.get(pin_id).map(|entry| entry.pin.clone()))
    }

    async fn delete_pin(&self, pin_id: &str) -> Result<()> {
        self.check_writable()?;
        self.inner.pins.remove(pin_id);
        self.publish_pins();
        Ok(())
    }

    async fn watch_pins(&self) -> Result<SnapshotStream<Pin>> {
        Ok(snapshot_stream(self.inner.pins_tx.subscribe()))
    }

    async fn get_vote(&self, pin_id: &str, uid: &str) -> Result<Option<VoteRecord>> {
        Ok(self
            .inner
            .pins
            .get(pin_id)
            .and_then(|entry| entry.votes.get(uid).cloned()))
    }

    async fn cast_vote(&self, pin_id: &str, uid: &str, kind: VoteKind) -> Result<VoteState> {
        self.check_writable()?;

        let transition = {
            let mut entry = self
                .inner
                .pins
                .get_mut(pin_id)
                .ok_or_else(|| AppError::NotFound(format!("Pin {}", pin_id)))?;

            let transition = VoteState::from_record(entry.votes.get(uid)).cast(kind);

            match transition.record {
                RecordChange::Put(kind) => {
                    entry.votes.insert(
                        uid.to_string(),
                        VoteRecord {
                            vote: kind,
                            voted_at: now_rfc3339(),
                        },
                    );
                }
                RecordChange::Delete => {
                    entry.votes.remove(uid);
                }
            }
            entry.pin.is_free_count += transition.deltas.is_free;
            entry.pin.is_not_free_count += transition.deltas.is_not_free;
            transition
        };

        self.publish_pins();
        Ok(transition.to)
    }

    async fn get_favorite(&self, uid: &str, pin_id: &str) -> Result<Option<Favorite>> {
        Ok(self
            .inner
            .favorites
            .get(uid)
            .and_then(|set| set.get(pin_id).cloned()))
    }

    async fn set_favorite(&self, uid: &str, favorite: &Favorite) -> Result<()> {
        self.check_writable()?;
        self.inner
            .favorites
            .entry(uid.to_string())
            .or_default()
            .insert(favorite.pin_id.clone(), favorite.clone());
        self.publish_favorites(uid);
        Ok(())
    }

    async fn delete_favorite(&self, uid: &str, pin_id: &str) -> Result<()> {
        self.check_writable()?;
        if let Some(mut set) = self.inner.favorites.get_mut(uid) {
            set.remove(pin_id);
        }
        self.publish_favorites(uid);
        Ok(())
    }

    async fn watch_favorites(&self, uid: &str) -> Result<SnapshotStream<Favorite>> {
        let sender = self.favorites_sender(uid);
        // Seed the channel with the stored set before the first subscriber reads it.
        let current: Vec<Favorite> = self
            .inner
            .favorites
            .get(uid)
            .map(|set| set.values().cloned().collect())
            .unwrap_or_default();
        sender.send_replace(current);
        Ok(snapshot_stream(sender.subscribe()))
    }
}
