// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore integration tests.
//!
//! These tests require the Firestore emulator to be running.
//! Run with: FIRESTORE_EMULATOR_HOST=localhost:8080 cargo test --test firestore_integration
//!
//! The emulator provides a clean state for each test run.

use futures_util::StreamExt;
use parknfree::db::PinStore;
use parknfree::models::{Favorite, User, VoteKind, VoteState};
use parknfree::time_utils::now_rfc3339;
use std::sync::Arc;
use std::time::Duration;

mod common;
use common::{seed_pin, test_db};

/// Generate a unique user ID for test isolation.
fn unique_uid(prefix: &str) -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    format!("{}-{}", prefix, nanos)
}

fn test_user(uid: &str) -> User {
    User {
        uid: uid.to_string(),
        email: Some(format!("{}@example.com", uid)),
        full_name: "Test User".to_string(),
        photo_url: None,
        created_at: now_rfc3339(),
        verified: false,
        auth_method: "password".to_string(),
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// USER TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_user_profile_roundtrip() {
    require_emulator!();

    let db = test_db().await;
    let uid = unique_uid("user");

    assert!(db.get_user(&uid).await.unwrap().is_none());

    let mut user = test_user(&uid);
    db.upsert_user(&user).await.unwrap();
    assert_eq!(db.get_user(&uid).await.unwrap(), Some(user.clone()));

    user.full_name = "Renamed".to_string();
    db.upsert_user(&user).await.unwrap();
    let fetched = db.get_user(&uid).await.unwrap().unwrap();
    assert_eq!(fetched.full_name, "Renamed");

    println!("✓ User profile stored and updated: uid={}", uid);
}

#[tokio::test]
async fn test_delete_user_data_removes_favorites() {
    require_emulator!();

    let db = test_db().await;
    let uid = unique_uid("leaver");
    db.upsert_user(&test_user(&uid)).await.unwrap();

    let pin = seed_pin(&db, &uid).await;
    let favorite = Favorite {
        pin_id: pin.doc_id().to_string(),
        created_at: now_rfc3339(),
    };
    db.set_favorite(&uid, &favorite).await.unwrap();

    db.delete_user_data(&uid).await.unwrap();

    assert!(db.get_user(&uid).await.unwrap().is_none());
    assert!(db.get_favorite(&uid, pin.doc_id()).await.unwrap().is_none());
    assert!(db.get_pin(pin.doc_id()).await.unwrap().is_some());

    println!("✓ User data deleted, pin kept: uid={}", uid);
}

// ═══════════════════════════════════════════════════════════════════════════
// PIN TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_pin_create_get_delete() {
    require_emulator!();

    let db = test_db().await;
    let uid = unique_uid("creator");

    let pin = seed_pin(&db, &uid).await;
    assert!(!pin.doc_id().is_empty());

    let fetched = db.get_pin(pin.doc_id()).await.unwrap().unwrap();
    assert_eq!(fetched, pin);

    db.cast_vote(pin.doc_id(), &unique_uid("voter"), VoteKind::Confirmed)
        .await
        .unwrap();
    db.delete_pin(pin.doc_id()).await.unwrap();

    assert!(db.get_pin(pin.doc_id()).await.unwrap().is_none());
    println!("✓ Pin created and deleted with votes: id={}", pin.doc_id());
}

#[tokio::test]
async fn test_watch_pins_sees_new_pin() {
    require_emulator!();

    let db = test_db().await;
    let mut stream = db.watch_pins().await.unwrap();

    // Initial snapshot
    let _ = tokio::time::timeout(Duration::from_secs(5), stream.next())
        .await
        .expect("initial snapshot");

    let pin = seed_pin(&db, &unique_uid("watched")).await;

    let seen = tokio::time::timeout(Duration::from_secs(10), async {
        while let Some(snapshot) = stream.next().await {
            let snapshot = snapshot.unwrap();
            if snapshot.iter().any(|p| p.id == pin.id) {
                return snapshot;
            }
        }
        panic!("stream ended");
    })
    .await
    .expect("snapshot with new pin");

    let created_at: Vec<&str> = seen.iter().map(|p| p.created_at.as_str()).collect();
    let mut sorted = created_at.clone();
    sorted.sort_by(|a, b| b.cmp(a));
    assert_eq!(created_at, sorted, "pins must be newest first");

    println!("✓ Live pin snapshot delivered: {} pins", seen.len());
}

// ═══════════════════════════════════════════════════════════════════════════
// VOTE TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_vote_transitions() {
    require_emulator!();

    let db = test_db().await;
    let pin = seed_pin(&db, &unique_uid("creator")).await;
    let id = pin.doc_id();
    let voter = unique_uid("voter");

    assert_eq!(
        db.cast_vote(id, &voter, VoteKind::Confirmed).await.unwrap(),
        VoteState::ConfirmedFree
    );
    assert_eq!(
        db.cast_vote(id, &voter, VoteKind::Denied).await.unwrap(),
        VoteState::DeniedFree
    );
    let switched = db.get_pin(id).await.unwrap().unwrap();
    assert_eq!((switched.is_free_count, switched.is_not_free_count), (0, 1));
    assert_eq!(
        db.get_vote(id, &voter).await.unwrap().unwrap().vote,
        VoteKind::Denied
    );

    assert_eq!(
        db.cast_vote(id, &voter, VoteKind::Denied).await.unwrap(),
        VoteState::NoVote
    );
    let cleared = db.get_pin(id).await.unwrap().unwrap();
    assert_eq!((cleared.is_free_count, cleared.is_not_free_count), (0, 0));
    assert!(db.get_vote(id, &voter).await.unwrap().is_none());

    println!("✓ Vote transitions applied atomically: pin={}", id);
}

#[tokio::test]
async fn test_concurrent_votes_are_not_lost() {
    require_emulator!();

    let db = Arc::new(test_db().await);
    let pin = seed_pin(db.as_ref(), &unique_uid("creator")).await;
    let id = pin.doc_id().to_string();

    let mut handles = Vec::new();
    for i in 0..8 {
        let db = db.clone();
        let id = id.clone();
        let voter = unique_uid(&format!("voter{}", i));
        handles.push(tokio::spawn(async move {
            db.cast_vote(&id, &voter, VoteKind::Confirmed).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let pin = db.get_pin(&id).await.unwrap().unwrap();
    assert_eq!(pin.is_free_count, 8);
    assert_eq!(pin.is_not_free_count, 0);

    println!("✓ Concurrent votes counted: pin={}", id);
}

#[tokio::test]
async fn test_vote_on_missing_pin() {
    require_emulator!();

    let db = test_db().await;
    let err = db
        .cast_vote(&unique_uid("missing"), "voter", VoteKind::Confirmed)
        .await
        .unwrap_err();
    assert!(matches!(err, parknfree::error::AppError::NotFound(_)));
}

// ═══════════════════════════════════════════════════════════════════════════
// FAVORITE TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_favorite_toggle_and_watch() {
    require_emulator!();

    let db = test_db().await;
    let uid = unique_uid("fan");
    let pin = seed_pin(&db, &unique_uid("creator")).await;

    let mut stream = db.watch_favorites(&uid).await.unwrap();
    let initial = tokio::time::timeout(Duration::from_secs(5), stream.next())
        .await
        .expect("initial snapshot")
        .unwrap()
        .unwrap();
    assert!(initial.is_empty());

    let favorite = Favorite {
        pin_id: pin.doc_id().to_string(),
        created_at: now_rfc3339(),
    };
    db.set_favorite(&uid, &favorite).await.unwrap();
    assert_eq!(
        db.get_favorite(&uid, pin.doc_id()).await.unwrap(),
        Some(favorite.clone())
    );

    let snapshot = tokio::time::timeout(Duration::from_secs(10), stream.next())
        .await
        .expect("favorite snapshot")
        .unwrap()
        .unwrap();
    assert_eq!(snapshot, vec![favorite]);

    db.delete_favorite(&uid, pin.doc_id()).await.unwrap();
    assert!(db.get_favorite(&uid, pin.doc_id()).await.unwrap().is_none());

    println!("✓ Favorite toggled and observed: uid={}", uid);
}
