//! Database layer (document store).
//!
//! [`PinStore`] is the document-store contract the services are written
//! against. [`FirestoreDb`] is the production backend; [`MemoryStore`] keeps
//! everything in process for offline mode and tests.

pub mod firestore;
pub mod memory;

pub use self::firestore::FirestoreDb;
pub use self::memory::MemoryStore;

use crate::error::Result;
use crate::models::{Favorite, Pin, User, VoteKind, VoteRecord, VoteState};
use async_trait::async_trait;
use futures_util::stream::BoxStream;

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    pub const PINS: &str = "pins";
    /// Subcollection of a pin, keyed by voter uid
    pub const VOTES: &str = "votes";
    /// Subcollection of a user, keyed by pin id
    pub const FAVORITES: &str = "favorites";
}

/// Live query results: one full snapshot per change, then an error ends it.
pub type SnapshotStream<T> = BoxStream<'static, Result<Vec<T>>>;

/// Document-store operations used by the services.
#[async_trait]
pub trait PinStore: Send + Sync {
    // ─── Users ───────────────────────────────────────────────────

    async fn get_user(&self, uid: &str) -> Result<Option<User>>;

    async fn upsert_user(&self, user: &User) -> Result<()>;

    /// Remove the profile and everything owned by it (favorites).
    async fn delete_user_data(&self, uid: &str) -> Result<()>;

    // ─── Pins ────────────────────────────────────────────────────

    /// Store a new pin under a generated ID and return it with the ID set.
    async fn create_pin(&self, pin: &Pin) -> Result<Pin>;

    async fn get_pin(&self, pin_id: &str) -> Result<Option<Pin>>;

    /// Delete a pin together with its vote records.
    async fn delete_pin(&self, pin_id: &str) -> Result<()>;

    /// Live pins, newest first by creation time.
    async fn watch_pins(&self) -> Result<SnapshotStream<Pin>>;

    // ─── Votes ───────────────────────────────────────────────────

    async fn get_vote(&self, pin_id: &str, uid: &str) -> Result<Option<VoteRecord>>;

    /// Cast `kind` for `uid` on a pin and return the resulting state.
    ///
    /// Reading the existing vote, writing or deleting the vote record and
    /// incrementing the counters happen as one atomic unit.
    async fn cast_vote(&self, pin_id: &str, uid: &str, kind: VoteKind) -> Result<VoteState>;

    // ─── Favorites ───────────────────────────────────────────────

    async fn get_favorite(&self, uid: &str, pin_id: &str) -> Result<Option<Favorite>>;

    async fn set_favorite(&self, uid: &str, favorite: &Favorite) -> Result<()>;

    async fn delete_favorite(&self, uid: &str, pin_id: &str) -> Result<()>;

    /// Live favorite set of one user.
    async fn watch_favorites(&self, uid: &str) -> Result<SnapshotStream<Favorite>>;
}

/// Order pins newest first; ties broken by ID so snapshots are stable.
pub(crate) fn sort_newest_first(pins: &mut [Pin]) {
    pins.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| a.doc_id().cmp(b.doc_id()))
    });
}
