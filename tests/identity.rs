// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firebase Auth REST client against a mock endpoint.

use parknfree::services::identity::{
    AuthError, FirebaseAuthClient, Identity, IdentityProvider, ProviderCredential,
};
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const API_KEY: &str = "test-api-key";

fn error_body(message: &str) -> serde_json::Value {
    serde_json::json!({
        "error": { "code": 400, "message": message, "errors": [] }
    })
}

fn identity(uid: &str) -> Identity {
    Identity {
        uid: uid.to_string(),
        email: Some("driver@example.com".to_string()),
        display_name: None,
        photo_url: None,
        email_verified: false,
        provider_id: "password".to_string(),
        id_token: "id-token-1".to_string(),
        refresh_token: String::new(),
    }
}

#[tokio::test]
async fn test_sign_in_parses_identity() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/accounts:signInWithPassword"))
        .and(query_param("key", API_KEY))
        .and(body_partial_json(serde_json::json!({
            "email": "driver@example.com",
            "password": "correct-horse",
            "returnSecureToken": true
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "kind": "identitytoolkit#VerifyPasswordResponse",
            "localId": "uid-42",
            "email": "driver@example.com",
            "displayName": "",
            "idToken": "id-token-1",
            "refreshToken": "refresh-1",
            "expiresIn": "3600",
            "registered": true
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = FirebaseAuthClient::new(&server.uri(), API_KEY);
    let identity = client
        .sign_in("driver@example.com", "correct-horse")
        .await
        .unwrap();

    assert_eq!(identity.uid, "uid-42");
    assert_eq!(identity.email.as_deref(), Some("driver@example.com"));
    // Empty display names are treated as unset.
    assert_eq!(identity.display_name, None);
    assert_eq!(identity.provider_id, "password");
    assert_eq!(identity.id_token, "id-token-1");
    assert_eq!(identity.refresh_token, "refresh-1");
}

#[tokio::test]
async fn test_error_codes_are_mapped() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/accounts:signUp"))
        .respond_with(ResponseTemplate::new(400).set_body_json(error_body("EMAIL_EXISTS")))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/accounts:signInWithPassword"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(error_body("INVALID_LOGIN_CREDENTIALS")),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/accounts:sendOobCode"))
        .respond_with(ResponseTemplate::new(400).set_body_json(error_body(
            "TOO_MANY_ATTEMPTS_TRY_LATER : Access to this account has been temporarily disabled",
        )))
        .mount(&server)
        .await;

    let client = FirebaseAuthClient::new(&server.uri(), API_KEY);

    assert_eq!(
        client.sign_up("taken@example.com", "secret1").await.unwrap_err(),
        AuthError::EmailInUse
    );
    assert_eq!(
        client.sign_in("taken@example.com", "wrong").await.unwrap_err(),
        AuthError::InvalidCredential
    );
    let err = client
        .send_password_reset("taken@example.com")
        .await
        .unwrap_err();
    assert_eq!(err, AuthError::RateLimited);
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_unparseable_server_error_is_network() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
        .mount(&server)
        .await;

    let client = FirebaseAuthClient::new(&server.uri(), API_KEY);
    let err = client.sign_in("a@example.com", "secret1").await.unwrap_err();
    assert!(matches!(err, AuthError::Network(_)));
}

#[tokio::test]
async fn test_provider_sign_in_posts_id_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/accounts:signInWithIdp"))
        .and(query_param("key", API_KEY))
        .and(body_partial_json(serde_json::json!({
            "postBody": "providerId=google.com&id_token=google-jwt",
            "returnSecureToken": true
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "providerId": "google.com",
            "localId": "g-7",
            "email": "social@gmail.com",
            "emailVerified": true,
            "displayName": "Social Sam",
            "photoUrl": "https://example.com/p.png",
            "idToken": "id-token-g",
            "refreshToken": "refresh-g"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = FirebaseAuthClient::new(&server.uri(), API_KEY);
    let identity = client
        .sign_in_with_provider(&ProviderCredential::google("google-jwt"))
        .await
        .unwrap();

    assert_eq!(identity.uid, "g-7");
    assert_eq!(identity.provider_id, "google.com");
    assert!(identity.email_verified);
    assert_eq!(identity.display_name.as_deref(), Some("Social Sam"));
}

#[tokio::test]
async fn test_dismissed_popup_makes_no_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = FirebaseAuthClient::new(&server.uri(), API_KEY);
    let credential = ProviderCredential {
        provider_id: "google.com".to_string(),
        id_token: None,
        access_token: None,
    };
    assert_eq!(
        client.sign_in_with_provider(&credential).await.unwrap_err(),
        AuthError::PopupDismissed
    );
}

#[tokio::test]
async fn test_profile_updates_send_id_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/accounts:update"))
        .and(body_partial_json(serde_json::json!({
            "idToken": "id-token-1",
            "displayName": "New Name"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/accounts:delete"))
        .and(body_partial_json(serde_json::json!({ "idToken": "id-token-1" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let client = FirebaseAuthClient::new(&server.uri(), API_KEY);
    let user = identity("uid-42");
    client.update_display_name(&user, "New Name").await.unwrap();
    client.delete_account(&user).await.unwrap();
}
