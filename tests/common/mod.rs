// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use async_trait::async_trait;
use futures_util::StreamExt;
use parknfree::config::Config;
use parknfree::db::{FirestoreDb, MemoryStore, PinStore};
use parknfree::models::Pin;
use parknfree::services::geolocation::{
    GeolocationError, GeolocationPlatform, PermissionState, PositionFix, PositionOptions,
    PositionStream,
};
use parknfree::services::identity::{AuthError, Identity, IdentityProvider, ProviderCredential};
use parknfree::services::StaticEnvironment;
use parknfree::time_utils::now_rfc3339;
use parknfree::AppContext;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Poll until `condition` holds, failing after a second.
#[allow(dead_code)]
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached in time");
}

// ─── Geolocation ─────────────────────────────────────────────────

/// Scripted outcome of one `current_position` call.
#[allow(dead_code)]
pub enum GpsStep {
    Fix(PositionFix),
    Fail(GeolocationError),
    /// Never answers
    Hang,
}

#[allow(dead_code)]
pub fn fix(lat: f64, lng: f64, accuracy: f64) -> PositionFix {
    PositionFix {
        lat,
        lng,
        accuracy,
        timestamp: 1_700_000_000_000,
    }
}

struct WatchGuard(Arc<AtomicUsize>);

impl Drop for WatchGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

type SampleSender = mpsc::UnboundedSender<Result<PositionFix, GeolocationError>>;

/// Geolocation platform driven by the test.
#[allow(dead_code)]
pub struct FakePlatform {
    permission: Mutex<PermissionState>,
    steps: Mutex<VecDeque<GpsStep>>,
    requests: Mutex<Vec<PositionOptions>>,
    watch_calls: AtomicUsize,
    active_watches: Arc<AtomicUsize>,
    watch_tx: Mutex<Option<SampleSender>>,
}

#[allow(dead_code)]
impl FakePlatform {
    pub fn new(permission: PermissionState, steps: Vec<GpsStep>) -> Arc<Self> {
        Arc::new(Self {
            permission: Mutex::new(permission),
            steps: Mutex::new(steps.into()),
            requests: Mutex::new(Vec::new()),
            watch_calls: AtomicUsize::new(0),
            active_watches: Arc::new(AtomicUsize::new(0)),
            watch_tx: Mutex::new(None),
        })
    }

    pub fn set_permission(&self, permission: PermissionState) {
        *self.permission.lock().unwrap() = permission;
    }

    pub fn push_step(&self, step: GpsStep) {
        self.steps.lock().unwrap().push_back(step);
    }

    /// Options of every `current_position` call, in order.
    pub fn requests(&self) -> Vec<PositionOptions> {
        self.requests.lock().unwrap().clone()
    }

    pub fn current_calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn watch_calls(&self) -> usize {
        self.watch_calls.load(Ordering::SeqCst)
    }

    pub fn active_watches(&self) -> usize {
        self.active_watches.load(Ordering::SeqCst)
    }

    /// Deliver a sample to the active watch.
    pub fn push_sample(&self, sample: Result<PositionFix, GeolocationError>) {
        if let Some(tx) = self.watch_tx.lock().unwrap().as_ref() {
            let _ = tx.send(sample);
        }
    }
}

#[async_trait]
impl GeolocationPlatform for FakePlatform {
    async fn permission_state(&self) -> PermissionState {
        *self.permission.lock().unwrap()
    }

    async fn current_position(
        &self,
        options: PositionOptions,
    ) -> Result<PositionFix, GeolocationError> {
        self.requests.lock().unwrap().push(options);
        let step = self.steps.lock().unwrap().pop_front();
        match step {
            Some(GpsStep::Fix(fix)) => Ok(fix),
            Some(GpsStep::Fail(e)) => Err(e),
            Some(GpsStep::Hang) => std::future::pending().await,
            None => Err(GeolocationError::PositionUnavailable),
        }
    }

    fn watch_position(&self, _options: PositionOptions) -> Result<PositionStream, GeolocationError> {
        self.watch_calls.fetch_add(1, Ordering::SeqCst);
        self.active_watches.fetch_add(1, Ordering::SeqCst);

        let (tx, rx) = mpsc::unbounded_channel();
        *self.watch_tx.lock().unwrap() = Some(tx);
        let guard = WatchGuard(self.active_watches.clone());

        Ok(futures_util::stream::unfold((rx, guard), |(mut rx, guard)| async move {
            rx.recv().await.map(|sample| (sample, (rx, guard)))
        })
        .boxed())
    }
}

/// Browser environment with geolocation and the permissions API.
#[allow(dead_code)]
pub fn desktop_env() -> Arc<StaticEnvironment> {
    Arc::new(StaticEnvironment {
        user_agent: "Mozilla/5.0 (X11; Linux x86_64; rv:125.0) Gecko/20100101 Firefox/125.0"
            .to_string(),
        standalone_display: false,
        navigator_standalone: false,
        geolocation: true,
        permissions_api: true,
    })
}

// ─── Identity ────────────────────────────────────────────────────

struct Account {
    uid: String,
    password: String,
    display_name: Option<String>,
}

/// In-memory identity provider.
#[derive(Default)]
pub struct FakeIdentity {
    accounts: Mutex<HashMap<String, Account>>,
    deleted: Mutex<Vec<String>>,
    next_uid: AtomicUsize,
}

#[allow(dead_code)]
impl FakeIdentity {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }

    fn identity(uid: &str, email: &str, display_name: Option<String>, provider: &str) -> Identity {
        Identity {
            uid: uid.to_string(),
            email: Some(email.to_string()),
            display_name,
            photo_url: None,
            email_verified: provider != "password",
            provider_id: provider.to_string(),
            id_token: format!("token-{}", uid),
            refresh_token: String::new(),
        }
    }
}

#[async_trait]
impl IdentityProvider for FakeIdentity {
    async fn sign_up(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        if password.len() < 6 {
            return Err(AuthError::WeakCredential);
        }
        let mut accounts = self.accounts.lock().unwrap();
        if accounts.contains_key(email) {
            return Err(AuthError::EmailInUse);
        }
        let uid = format!("uid-{}", self.next_uid.fetch_add(1, Ordering::SeqCst) + 1);
        accounts.insert(
            email.to_string(),
            Account {
                uid: uid.clone(),
                password: password.to_string(),
                display_name: None,
            },
        );
        Ok(Self::identity(&uid, email, None, "password"))
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        let accounts = self.accounts.lock().unwrap();
        match accounts.get(email) {
            Some(account) if account.password == password => Ok(Self::identity(
                &account.uid,
                email,
                account.display_name.clone(),
                "password",
            )),
            _ => Err(AuthError::InvalidCredential),
        }
    }

    async fn sign_in_with_provider(
        &self,
        credential: &ProviderCredential,
    ) -> Result<Identity, AuthError> {
        let token = credential
            .id_token
            .as_deref()
            .ok_or(AuthError::PopupDismissed)?;
        // The token names the social account in these tests.
        let email = format!("{}@gmail.com", token);
        Ok(Self::identity(
            &format!("google-{}", token),
            &email,
            Some(format!("Google {}", token)),
            &credential.provider_id,
        ))
    }

    async fn send_password_reset(&self, email: &str) -> Result<(), AuthError> {
        if self.accounts.lock().unwrap().contains_key(email) {
            Ok(())
        } else {
            Err(AuthError::InvalidCredential)
        }
    }

    async fn update_display_name(&self, identity: &Identity, name: &str) -> Result<(), AuthError> {
        let mut accounts = self.accounts.lock().unwrap();
        if let Some(account) = accounts.values_mut().find(|a| a.uid == identity.uid) {
            account.display_name = Some(name.to_string());
        }
        Ok(())
    }

    async fn delete_account(&self, identity: &Identity) -> Result<(), AuthError> {
        self.accounts
            .lock()
            .unwrap()
            .retain(|_, account| account.uid != identity.uid);
        self.deleted.lock().unwrap().push(identity.uid.clone());
        Ok(())
    }
}

// ─── Application ─────────────────────────────────────────────────

/// App over an in-memory store and fake identity provider.
#[allow(dead_code)]
pub struct TestApp {
    pub app: AppContext,
    pub store: MemoryStore,
    pub identity: Arc<FakeIdentity>,
}

#[allow(dead_code)]
pub fn test_app_with_config(config: Config) -> TestApp {
    let store = MemoryStore::new();
    let identity = FakeIdentity::new();
    let app = AppContext::new(config, Arc::new(store.clone()), identity.clone());
    TestApp {
        app,
        store,
        identity,
    }
}

#[allow(dead_code)]
pub fn test_app() -> TestApp {
    test_app_with_config(Config::test_default())
}

/// Sign up and stay signed in.
#[allow(dead_code)]
pub async fn sign_up(app: &AppContext, email: &str, name: &str) -> String {
    app.session
        .sign_up(email, "correct-horse", name)
        .await
        .expect("sign up")
        .uid()
        .to_string()
}

/// Store a pin directly, bypassing geocoding.
#[allow(dead_code)]
pub async fn seed_pin(store: &dyn PinStore, creator_uid: &str) -> Pin {
    let pin = Pin {
        id: None,
        lat: 34.675,
        lng: 33.0438,
        note: String::new(),
        created_by: "Seeder".to_string(),
        created_by_email: Some(format!("{}@example.com", creator_uid)),
        created_by_uid: creator_uid.to_string(),
        created_at: now_rfc3339(),
        place_label: "Seeded spot".to_string(),
        directions_url: String::new(),
        is_free_count: 0,
        is_not_free_count: 0,
    };
    store.create_pin(&pin).await.expect("seed pin")
}
