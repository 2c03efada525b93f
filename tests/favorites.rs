// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Favorite toggling.

use parknfree::db::PinStore;
use parknfree::error::AppError;

mod common;
use common::{seed_pin, sign_up, test_app};

#[tokio::test]
async fn test_favorite_then_unfavorite_leaves_nothing() {
    let t = test_app();
    let pin = seed_pin(&t.store, "creator").await;
    let uid = sign_up(&t.app, "fan@example.com", "Fan").await;

    let mut panel = t.app.open_pin(pin.doc_id()).await.unwrap();
    assert!(!panel.is_favorite());

    assert!(panel.toggle_favorite().await.unwrap());
    let stored = t.store.get_favorite(&uid, pin.doc_id()).await.unwrap();
    assert_eq!(stored.unwrap().pin_id, pin.doc_id());
    assert!(t.app.favorites.is_favorite(pin.doc_id()).await.unwrap());

    assert!(!panel.toggle_favorite().await.unwrap());
    assert!(t
        .store
        .get_favorite(&uid, pin.doc_id())
        .await
        .unwrap()
        .is_none());
    assert!(!t.app.favorites.is_favorite(pin.doc_id()).await.unwrap());
}

#[tokio::test]
async fn test_signed_out_toggle_is_unauthorized() {
    let t = test_app();
    let pin = seed_pin(&t.store, "creator").await;

    assert!(!t.app.favorites.is_favorite(pin.doc_id()).await.unwrap());
    let err = t
        .app
        .favorites
        .toggle(pin.doc_id(), false)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Unauthorized));
}

#[tokio::test]
async fn test_failed_write_keeps_local_state() {
    let t = test_app();
    let pin = seed_pin(&t.store, "creator").await;
    sign_up(&t.app, "fan@example.com", "Fan").await;
    let mut notices = t.app.notices.subscribe();

    let mut panel = t.app.open_pin(pin.doc_id()).await.unwrap();
    t.store.reject_writes(true);

    assert!(panel.toggle_favorite().await.is_err());
    assert!(!panel.is_favorite());

    let notice = notices.recv().await.unwrap();
    assert_eq!(
        notice.message,
        "Something went wrong saving your change. Please try again."
    );
}

#[tokio::test]
async fn test_favorites_are_per_user() {
    let t = test_app();
    let pin = seed_pin(&t.store, "creator").await;

    let first = sign_up(&t.app, "first@example.com", "First").await;
    t.app.favorites.toggle(pin.doc_id(), false).await.unwrap();
    t.app.session.sign_out();

    let second = sign_up(&t.app, "second@example.com", "Second").await;
    assert!(!t.app.favorites.is_favorite(pin.doc_id()).await.unwrap());

    assert!(t.store.get_favorite(&first, pin.doc_id()).await.unwrap().is_some());
    assert!(t.store.get_favorite(&second, pin.doc_id()).await.unwrap().is_none());
}
