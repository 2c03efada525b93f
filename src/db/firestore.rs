// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Users (profile storage)
//! - Pins (free-parking spots, newest first)
//! - Votes (`pins/{pin}/votes/{uid}`, one per user, counters kept in sync)
//! - Favorites (`users/{uid}/favorites/{pin}` join records)
//! - Live snapshots of pins and favorites via Firestore listeners

use crate::db::{collections, sort_newest_first, PinStore, SnapshotStream};
use crate::error::{AppError, Result};
use crate::models::vote::RecordChange;
use crate::models::{Favorite, Pin, User, VoteKind, VoteRecord, VoteState, VoteTransition};
use crate::time_utils::now_rfc3339;
use async_trait::async_trait;
use firestore::{
    FirestoreConsistencySelector, FirestoreListenEvent, FirestoreListener,
    FirestoreListenerTarget, FirestoreMemListenStateStorage, ParentPathBuilder,
};
use gcloud_sdk::google::firestore::v1::target_change::TargetChangeType;
use futures_util::StreamExt;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex, Notify};

// Firestore limits batch/transaction writes to 500 operations.
// We use a safe limit of 400 to allow headroom.
const BATCH_SIZE: usize = 400;
/// Snapshots buffered between the listener and a slow consumer.
const SNAPSHOT_BUFFER: usize = 16;
const SNAPSHOT_SETTLE: Duration = Duration::from_millis(100);
const LISTEN_TARGET_ID: u32 = 1;
/// Transaction attempts per vote before giving up
const VOTE_ATTEMPTS: u32 = 4;

type Listener = FirestoreListener<firestore::FirestoreDb, FirestoreMemListenStateStorage>;

/// Only the document ID of a stored document.
#[derive(Deserialize)]
struct DocId {
    #[serde(alias = "_firestore_id")]
    id: Option<String>,
}

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a disconnected client (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    fn parent_path(&self, collection: &str, doc_id: &str) -> Result<ParentPathBuilder> {
        self.get_client()?
            .parent_path(collection, doc_id)
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // ─── Helper Methods ────────────────────────────────────────────

    /// List the document IDs of a subcollection.
    async fn child_ids(&self, parent: &ParentPathBuilder, collection: &str) -> Result<Vec<String>> {
        let docs: Vec<DocId> = self
            .get_client()?
            .fluent()
            .select()
            .from(collection)
            .parent(parent)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(docs.into_iter().filter_map(|d| d.id).collect())
    }

    /// Batch delete subcollection documents using transactions.
    async fn batch_delete_children(
        &self,
        parent: &ParentPathBuilder,
        collection: &str,
        doc_ids: &[String],
    ) -> Result<()> {
        let client = self.get_client()?;

        for chunk in doc_ids.chunks(BATCH_SIZE) {
            let mut transaction = client
                .begin_transaction()
                .await
                .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

            for doc_id in chunk {
                client
                    .fluent()
                    .delete()
                    .from(collection)
                    .document_id(doc_id)
                    .parent(parent)
                    .add_to_transaction(&mut transaction)
                    .map_err(|e| {
                        AppError::Database(format!(
                            "Failed to add deletion to transaction for {}: {}",
                            collection, e
                        ))
                    })?;
            }

            transaction.commit().await.map_err(|e| {
                AppError::Database(format!("Failed to commit batch deletion: {}", e))
            })?;
        }

        Ok(())
    }

    /// Start a listener on one target and expose it as a snapshot stream.
    ///
    /// The listener is shut down once the stream is dropped.
    async fn listen<T, F>(&self, add_target: F, order: fn(&mut [T])) -> Result<SnapshotStream<T>>
    where
        T: DeserializeOwned + Clone + Send + Sync + 'static,
        F: FnOnce(&firestore::FirestoreDb, &mut Listener) -> firestore::FirestoreResult<()>,
    {
        let client = self.get_client()?;

        let mut listener = client
            .create_listener(FirestoreMemListenStateStorage::new())
            .await
            .map_err(|e| AppError::Database(format!("Failed to create listener: {}", e)))?;

        add_target(client, &mut listener)
            .map_err(|e| AppError::Database(format!("Failed to add listen target: {}", e)))?;

        let (tx, rx) = mpsc::channel::<Result<Vec<T>>>(SNAPSHOT_BUFFER);
        let state = Arc::new(Mutex::new(SnapshotAssembler::new(order)));
        let pending = Arc::new(Notify::new());

        let callback_state = state.clone();
        let callback_pending = pending.clone();
        listener
            .start(move |event| {
                let state = callback_state.clone();
                let pending = callback_pending.clone();
                async move {
                    if state.lock().await.apply(event) {
                        pending.notify_one();
                    }
                    Ok::<(), Box<dyn std::error::Error + Send + Sync>>(())
                }
            })
            .await
            .map_err(|e| AppError::Database(format!("Failed to start listener: {}", e)))?;

        tokio::spawn(async move {
            publish_snapshots(state, pending, tx).await;
            if let Err(e) = listener.shutdown().await {
                tracing::warn!(error = %e, "Failed to shut down Firestore listener");
            }
            tracing::debug!("Firestore listener stopped");
        });

        Ok(futures_util::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|item| (item, rx))
        })
        .boxed())
    }
}

/// Send a snapshot after each burst of listen events, until the consumer
/// drops the stream.
async fn publish_snapshots<T: Clone>(
    state: Arc<Mutex<SnapshotAssembler<T>>>,
    pending: Arc<Notify>,
    tx: mpsc::Sender<Result<Vec<T>>>,
) {
    loop {
        tokio::select! {
            _ = pending.notified() => {}
            _ = tx.closed() => return,
        }
        // Changes arriving within the settle window share one snapshot.
        tokio::time::sleep(SNAPSHOT_SETTLE).await;

        let snapshot = state.lock().await.take_snapshot();
        if let Some(snapshot) = snapshot {
            if tx.send(Ok(snapshot)).await.is_err() {
                return;
            }
        }
    }
}

/// Folds listen events into full snapshots.
///
/// Target changes that carry a resume token never reach the callback, so
/// document events are what mark the view as changed. The initial target
/// add also does, so an empty collection still yields a first snapshot.
struct SnapshotAssembler<T> {
    docs: HashMap<String, T>,
    dirty: bool,
    order: fn(&mut [T]),
}

impl<T: Clone> SnapshotAssembler<T> {
    fn new(order: fn(&mut [T])) -> Self {
        Self {
            docs: HashMap::new(),
            dirty: false,
            order,
        }
    }

    /// Apply one event. Returns true when a snapshot should be published.
    fn apply(&mut self, event: FirestoreListenEvent) -> bool
    where
        T: DeserializeOwned,
    {
        match event {
            FirestoreListenEvent::DocumentChange(change) => {
                let Some(doc) = change.document else {
                    return false;
                };
                if change.removed_target_ids.contains(&(LISTEN_TARGET_ID as i32)) {
                    return self.remove(&doc.name);
                }
                match firestore::FirestoreDb::deserialize_doc_to::<T>(&doc) {
                    Ok(obj) => {
                        self.docs.insert(doc.name, obj);
                        self.dirty = true;
                        true
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, document = %doc.name, "Skipping undecodable document");
                        self.remove(&doc.name)
                    }
                }
            }
            FirestoreListenEvent::DocumentDelete(delete) => self.remove(&delete.document),
            FirestoreListenEvent::DocumentRemove(remove) => self.remove(&remove.document),
            FirestoreListenEvent::TargetChange(change) => match change.target_change_type() {
                TargetChangeType::Add => {
                    self.dirty = true;
                    true
                }
                TargetChangeType::Reset => {
                    // The server resends the full result set after a reset.
                    self.docs.clear();
                    self.dirty = true;
                    true
                }
                TargetChangeType::Remove => {
                    tracing::warn!(cause = ?change.cause, "Listen target removed by server");
                    false
                }
                TargetChangeType::NoChange | TargetChangeType::Current => false,
            },
            _ => false,
        }
    }

    fn remove(&mut self, name: &str) -> bool {
        let removed = self.docs.remove(name).is_some();
        self.dirty |= removed;
        removed
    }

    /// The current ordered view, if it changed since the last one taken.
    fn take_snapshot(&mut self) -> Option<Vec<T>> {
        if !self.dirty {
            return None;
        }
        self.dirty = false;
        let mut snapshot: Vec<T> = self.docs.values().cloned().collect();
        (self.order)(&mut snapshot);
        Some(snapshot)
    }
}

fn sort_favorites(favorites: &mut [Favorite]) {
    favorites.sort_by(|a, b| a.pin_id.cmp(&b.pin_id));
}

/// How a single vote transaction attempt failed.
#[derive(Debug)]
enum VoteAttemptError {
    /// The commit lost to a concurrent write; a fresh transaction may succeed.
    Contended(AppError),
    Failed(AppError),
}

impl VoteAttemptError {
    fn commit(e: firestore::errors::FirestoreError) -> Self {
        let retryable = matches!(
            &e,
            firestore::errors::FirestoreError::DatabaseError(db) if db.retry_possible
        );
        let err = AppError::Database(format!("Transaction commit failed: {}", e));
        if retryable {
            Self::Contended(err)
        } else {
            Self::Failed(err)
        }
    }

    fn should_retry(&self, attempt: u32) -> bool {
        matches!(self, Self::Contended(_)) && attempt < VOTE_ATTEMPTS
    }

    fn into_inner(self) -> AppError {
        match self {
            Self::Contended(e) | Self::Failed(e) => e,
        }
    }
}

impl FirestoreDb {
    /// One transactional attempt at casting a vote.
    ///
    /// Every failure before the commit rolls the transaction back.
    async fn try_cast_vote(
        &self,
        pin_id: &str,
        uid: &str,
        kind: VoteKind,
    ) -> std::result::Result<VoteState, VoteAttemptError> {
        let client = self.get_client().map_err(VoteAttemptError::Failed)?;
        let parent = self
            .parent_path(collections::PINS, pin_id)
            .map_err(VoteAttemptError::Failed)?;

        let mut transaction = client.begin_transaction().await.map_err(|e| {
            VoteAttemptError::Failed(AppError::Database(format!(
                "Failed to begin transaction: {}",
                e
            )))
        })?;

        let staged = stage_vote(client, &mut transaction, &parent, pin_id, uid, kind).await;
        let transition = match staged {
            Ok(transition) => transition,
            Err(e) => {
                if let Err(rollback) = transaction.rollback().await {
                    tracing::warn!(pin_id, uid, error = %rollback, "Vote transaction rollback failed");
                }
                return Err(VoteAttemptError::Failed(e));
            }
        };

        transaction.commit().await.map_err(VoteAttemptError::commit)?;

        tracing::info!(
            pin_id,
            uid,
            from = ?transition.from,
            to = ?transition.to,
            "Vote committed"
        );

        Ok(transition.to)
    }
}

/// Read the pin and the user's vote inside `transaction`, then add the vote
/// record change and counter increments to it.
async fn stage_vote(
    client: &firestore::FirestoreDb,
    transaction: &mut firestore::FirestoreTransaction<'_>,
    parent: &ParentPathBuilder,
    pin_id: &str,
    uid: &str,
    kind: VoteKind,
) -> Result<VoteTransition> {
    let tx_client = client.clone_with_consistency_selector(
        FirestoreConsistencySelector::Transaction(transaction.transaction_id().clone()),
    );

    // 1. Read pin and current vote within the transaction
    let pin: Option<Pin> = tx_client
        .fluent()
        .select()
        .by_id_in(collections::PINS)
        .obj()
        .one(pin_id)
        .await
        .map_err(|e| AppError::Database(format!("Failed to read pin in transaction: {}", e)))?;

    if pin.is_none() {
        return Err(AppError::NotFound(format!("Pin {}", pin_id)));
    }

    let existing: Option<VoteRecord> = tx_client
        .fluent()
        .select()
        .by_id_in(collections::VOTES)
        .parent(parent)
        .obj()
        .one(uid)
        .await
        .map_err(|e| AppError::Database(format!("Failed to read vote in transaction: {}", e)))?;

    // 2. Decide the transition
    let transition = VoteState::from_record(existing.as_ref()).cast(kind);

    // 3. Vote record write or delete
    match transition.record {
        RecordChange::Put(kind) => {
            let record = VoteRecord {
                vote: kind,
                voted_at: now_rfc3339(),
            };
            client
                .fluent()
                .update()
                .in_col(collections::VOTES)
                .document_id(uid)
                .parent(parent)
                .object(&record)
                .add_to_transaction(transaction)
                .map_err(|e| {
                    AppError::Database(format!("Failed to add vote to transaction: {}", e))
                })?;
        }
        RecordChange::Delete => {
            client
                .fluent()
                .delete()
                .from(collections::VOTES)
                .document_id(uid)
                .parent(parent)
                .add_to_transaction(transaction)
                .map_err(|e| {
                    AppError::Database(format!(
                        "Failed to add vote deletion to transaction: {}",
                        e
                    ))
                })?;
        }
    }

    // 4. Counter increments in the same commit
    let deltas = transition.deltas.fields();
    client
        .fluent()
        .update()
        .in_col(collections::PINS)
        .document_id(pin_id)
        .transforms(|t| {
            t.fields(
                deltas
                    .iter()
                    .map(|(field, delta)| t.field(*field).increment(*delta)),
            )
        })
        .only_transform()
        .add_to_transaction(transaction)
        .map_err(|e| AppError::Database(format!("Failed to add counters to transaction: {}", e)))?;

    Ok(transition)
}

#[async_trait]
impl PinStore for FirestoreDb {
    // ─── User Operations ─────────────────────────────────────────

    async fn get_user(&self, uid: &str) -> Result<Option<User>> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(uid)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn upsert_user(&self, user: &User) -> Result<()> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::USERS)
            .document_id(&user.uid)
            .object(user)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Delete the user's favorites, then the profile document.
    async fn delete_user_data(&self, uid: &str) -> Result<()> {
        let parent = self.parent_path(collections::USERS, uid)?;
        let favorite_ids = self.child_ids(&parent, collections::FAVORITES).await?;
        self.batch_delete_children(&parent, collections::FAVORITES, &favorite_ids)
            .await?;
        tracing::debug!(uid, count = favorite_ids.len(), "Deleted favorites");

        self.get_client()?
            .fluent()
            .delete()
            .from(collections::USERS)
            .document_id(uid)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        tracing::info!(uid, "User data deletion complete");
        Ok(())
    }

    // ─── Pin Operations ──────────────────────────────────────────

    async fn create_pin(&self, pin: &Pin) -> Result<Pin> {
        let created: Pin = self
            .get_client()?
            .fluent()
            .insert()
            .into(collections::PINS)
            .generate_document_id()
            .object(pin)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        if created.id.is_none() {
            return Err(AppError::Database(
                "Created pin came back without a document ID".to_string(),
            ));
        }
        Ok(created)
    }

    async fn get_pin(&self, pin_id: &str) -> Result<Option<Pin>> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::PINS)
            .obj()
            .one(pin_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete the pin's vote records, then the pin.
    async fn delete_pin(&self, pin_id: &str) -> Result<()> {
        let parent = self.parent_path(collections::PINS, pin_id)?;
        let voter_ids = self.child_ids(&parent, collections::VOTES).await?;
        self.batch_delete_children(&parent, collections::VOTES, &voter_ids)
            .await?;

        self.get_client()?
            .fluent()
            .delete()
            .from(collections::PINS)
            .document_id(pin_id)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        tracing::info!(pin_id, votes = voter_ids.len(), "Pin deleted");
        Ok(())
    }

    async fn watch_pins(&self) -> Result<SnapshotStream<Pin>> {
        self.listen(
            |client, listener| {
                client
                    .fluent()
                    .select()
                    .from(collections::PINS)
                    .listen()
                    .add_target(FirestoreListenerTarget::new(LISTEN_TARGET_ID), listener)
            },
            sort_newest_first,
        )
        .await
    }

    // ─── Vote Operations ─────────────────────────────────────────

    async fn get_vote(&self, pin_id: &str, uid: &str) -> Result<Option<VoteRecord>> {
        let parent = self.parent_path(collections::PINS, pin_id)?;
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::VOTES)
            .parent(&parent)
            .obj()
            .one(uid)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Atomically cast a vote.
    ///
    /// The existing vote is read inside the transaction so a concurrent change
    /// by the same user aborts the commit. Counters change by server-side
    /// increment transforms, so votes by different users commute. Only a
    /// commit lost to contention is retried, a few times.
    async fn cast_vote(&self, pin_id: &str, uid: &str, kind: VoteKind) -> Result<VoteState> {
        let mut attempt = 1;
        loop {
            match self.try_cast_vote(pin_id, uid, kind).await {
                Ok(state) => return Ok(state),
                Err(e) if e.should_retry(attempt) => {
                    let e = e.into_inner();
                    tracing::warn!(pin_id, uid, attempt, error = %e, "Vote commit contended, retrying");
                    tokio::time::sleep(Duration::from_millis(50 * attempt as u64)).await;
                    attempt += 1;
                }
                Err(e) => return Err(e.into_inner()),
            }
        }
    }

    // ─── Favorite Operations ─────────────────────────────────────

    async fn get_favorite(&self, uid: &str, pin_id: &str) -> Result<Option<Favorite>> {
        let parent = self.parent_path(collections::USERS, uid)?;
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::FAVORITES)
            .parent(&parent)
            .obj()
            .one(pin_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn set_favorite(&self, uid: &str, favorite: &Favorite) -> Result<()> {
        let parent = self.parent_path(collections::USERS, uid)?;
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::FAVORITES)
            .document_id(&favorite.pin_id)
            .parent(&parent)
            .object(favorite)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    async fn delete_favorite(&self, uid: &str, pin_id: &str) -> Result<()> {
        let parent = self.parent_path(collections::USERS, uid)?;
        self.get_client()?
            .fluent()
            .delete()
            .from(collections::FAVORITES)
            .document_id(pin_id)
            .parent(&parent)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    async fn watch_favorites(&self, uid: &str) -> Result<SnapshotStream<Favorite>> {
        let parent = self.parent_path(collections::USERS, uid)?;
        self.listen(
            move |client, listener| {
                client
                    .fluent()
                    .select()
                    .from(collections::FAVORITES)
                    .parent(&parent)
                    .listen()
                    .add_target(FirestoreListenerTarget::new(LISTEN_TARGET_ID), listener)
            },
            sort_favorites,
        )
        .await
    }
}
