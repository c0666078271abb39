// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use asian_tiles::config::Config;
use asian_tiles::db::FirestoreDb;
use asian_tiles::error::AppError;
use asian_tiles::models::{
    AuthEvent, AuthUser, NewWishlistItem, ProductRef, Role, WishlistItem,
};
use asian_tiles::routes::create_router;
use asian_tiles::services::{
    FirebaseAuthClient, IdTokenVerifier, IdentityHub, SyncState, WishlistStore, WishlistSync,
};
use asian_tiles::AppState;
use async_trait::async_trait;
use jsonwebtoken::{encode, Algorithm, DecodingKey, EncodingKey, Header};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::{mpsc, watch, Semaphore};

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

/// Create a mock database connection (offline).
#[allow(dead_code)]
pub fn test_db_offline() -> FirestoreDb {
    FirestoreDb::new_mock()
}

// ─── ID Tokens ───────────────────────────────────────────────

pub const TEST_KID: &str = "test-kid";
const PRIVATE_KEY: &[u8] = include_bytes!("../fixtures/id_token_test_key.pem");
const PUBLIC_KEY: &[u8] = include_bytes!("../fixtures/id_token_test_key.pub.pem");

#[derive(Serialize)]
pub struct Claims {
    pub iss: String,
    pub aud: String,
    pub sub: String,
    pub iat: usize,
    pub exp: usize,
    pub email: Option<String>,
}

#[allow(dead_code)]
pub fn now_secs() -> usize {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs() as usize
}

#[allow(dead_code)]
pub fn valid_claims(config: &Config, uid: &str) -> Claims {
    Claims {
        iss: config.id_token_issuer(),
        aud: config.firebase_project_id.clone(),
        sub: uid.to_string(),
        iat: now_secs(),
        exp: now_secs() + 3600,
        email: Some(format!("{uid}@example.com")),
    }
}

#[allow(dead_code)]
pub fn sign(claims: &Claims, kid: &str) -> String {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(kid.to_string());
    encode(
        &header,
        claims,
        &EncodingKey::from_rsa_pem(PRIVATE_KEY).unwrap(),
    )
    .unwrap()
}

/// Verifier that trusts the fixture key under [`TEST_KID`].
#[allow(dead_code)]
pub fn test_verifier(config: &Config) -> IdTokenVerifier {
    IdTokenVerifier::new_with_static_key(
        config,
        TEST_KID,
        DecodingKey::from_rsa_pem(PUBLIC_KEY).unwrap(),
    )
    .unwrap()
}

/// A valid ID token for `uid` under the test config.
#[allow(dead_code)]
pub fn id_token(uid: &str) -> String {
    sign(&valid_claims(&Config::test_default(), uid), TEST_KID)
}

// ─── Controllable Store ──────────────────────────────────────

/// Holds store calls until released by the test.
pub struct Gate {
    held: AtomicBool,
    permits: Semaphore,
}

impl Default for Gate {
    fn default() -> Self {
        Self {
            held: AtomicBool::new(false),
            permits: Semaphore::new(0),
        }
    }
}

#[allow(dead_code)]
impl Gate {
    /// Make subsequent calls wait for [`Gate::release`].
    pub fn hold(&self) {
        self.held.store(true, Ordering::SeqCst);
    }

    /// Let `n` waiting (or future) calls through.
    pub fn release(&self, n: usize) {
        self.permits.add_permits(n);
    }

    async fn pass(&self) {
        if self.held.load(Ordering::SeqCst) {
            self.permits
                .acquire()
                .await
                .expect("gate semaphore closed")
                .forget();
        }
    }
}

/// In-memory [`WishlistStore`] that pushes snapshots like Firestore does.
#[derive(Default)]
pub struct MockStore {
    roles: Mutex<HashMap<String, Role>>,
    records: Mutex<Vec<WishlistItem>>,
    subscribers: Mutex<Vec<(String, mpsc::Sender<Vec<WishlistItem>>)>>,
    next_id: AtomicUsize,

    pub fail_role_lookup: AtomicBool,
    pub fail_create: AtomicBool,
    pub fail_delete: AtomicBool,

    pub role_gate: Gate,
    pub create_gate: Gate,
    /// Holds a create's result after its record has been written and pushed.
    pub create_reply_gate: Gate,
    pub delete_gate: Gate,

    pub role_calls: AtomicUsize,
    pub create_calls: AtomicUsize,
    pub delete_calls: AtomicUsize,
    pub subscribe_calls: AtomicUsize,
}

#[allow(dead_code)]
impl MockStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_role(&self, uid: &str, role: Role) {
        self.roles.lock().unwrap().insert(uid.to_string(), role);
    }

    pub fn fail(&self, flag: &AtomicBool) {
        flag.store(true, Ordering::SeqCst);
    }

    /// Current records owned by `uid`.
    pub fn records_for(&self, uid: &str) -> Vec<WishlistItem> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.user_id == uid)
            .cloned()
            .collect()
    }

    /// Write a record as another client would.
    pub fn insert_external(&self, uid: &str, product: &ProductRef) -> String {
        let id = self.allocate_id();
        let item = WishlistItem::for_product(id.clone(), uid, product);
        self.records.lock().unwrap().push(item);
        self.broadcast(uid);
        id
    }

    /// Delete a record as another client would.
    pub fn delete_external(&self, item_id: &str) {
        let removed = {
            let mut records = self.records.lock().unwrap();
            let uid = records
                .iter()
                .find(|r| r.id == item_id)
                .map(|r| r.user_id.clone());
            records.retain(|r| r.id != item_id);
            uid
        };
        if let Some(uid) = removed {
            self.broadcast(&uid);
        }
    }

    /// Subscriptions whose receiver is still alive.
    pub fn active_subscriptions(&self) -> usize {
        self.subscribers
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, tx)| !tx.is_closed())
            .count()
    }

    pub fn calls(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }

    fn allocate_id(&self) -> String {
        format!("doc-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1)
    }

    fn broadcast(&self, uid: &str) {
        let snapshot = self.records_for(uid);
        let subscribers = self.subscribers.lock().unwrap();
        for (owner, tx) in subscribers.iter() {
            if owner == uid {
                let _ = tx.try_send(snapshot.clone());
            }
        }
    }
}

#[async_trait]
impl WishlistStore for MockStore {
    async fn lookup_role(&self, uid: &str) -> Result<Option<Role>, AppError> {
        self.role_calls.fetch_add(1, Ordering::SeqCst);
        self.role_gate.pass().await;
        if self.fail_role_lookup.load(Ordering::SeqCst) {
            return Err(AppError::Database("role lookup unavailable".to_string()));
        }
        Ok(self.roles.lock().unwrap().get(uid).copied())
    }

    fn subscribe_wishlist(&self, uid: &str) -> mpsc::Receiver<Vec<WishlistItem>> {
        self.subscribe_calls.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = mpsc::channel(64);
        let _ = tx.try_send(self.records_for(uid));
        self.subscribers
            .lock()
            .unwrap()
            .push((uid.to_string(), tx));
        rx
    }

    async fn create_wishlist_item(&self, item: &NewWishlistItem) -> Result<String, AppError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        self.create_gate.pass().await;
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(AppError::Database("permission denied".to_string()));
        }

        let id = self.allocate_id();
        self.records.lock().unwrap().push(WishlistItem {
            id: id.clone(),
            product_id: item.product_id.clone(),
            user_id: item.user_id.clone(),
            name: item.name.clone(),
            price: item.price,
            image: item.image.clone(),
            category: item.category.clone(),
        });
        self.broadcast(&item.user_id);
        self.create_reply_gate.pass().await;
        Ok(id)
    }

    async fn delete_wishlist_item(&self, item_id: &str) -> Result<(), AppError> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        self.delete_gate.pass().await;
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(AppError::Database("network unavailable".to_string()));
        }
        self.delete_external(item_id);
        Ok(())
    }
}

// ─── Synchronizer Helpers ────────────────────────────────────

/// A synchronizer driven by a scripted identity stream.
#[allow(dead_code)]
pub struct TestSync {
    pub sync: WishlistSync,
    pub store: Arc<MockStore>,
    pub auth: watch::Sender<Option<AuthEvent>>,
}

#[allow(dead_code)]
impl TestSync {
    pub fn new() -> Self {
        let store = MockStore::new();
        let (auth, auth_rx) = watch::channel(None);
        let sync = WishlistSync::spawn(store.clone(), auth_rx);
        Self { sync, store, auth }
    }

    pub fn sign_in(&self, uid: &str) {
        self.auth.send_replace(Some(AuthEvent::SignedIn(user(uid))));
    }

    pub fn sign_out(&self) {
        self.auth.send_replace(Some(AuthEvent::SignedOut));
    }

    /// Sign in and wait for the session to be authenticated.
    pub async fn authenticated(uid: &str, role: Role) -> Self {
        let harness = Self::new();
        harness.store.set_role(uid, role);
        harness.sign_in(uid);
        wait_for(&harness.sync, |s| s.is_authenticated()).await;
        harness
    }
}

#[allow(dead_code)]
pub fn user(uid: &str) -> AuthUser {
    AuthUser {
        uid: uid.to_string(),
        email: Some(format!("{uid}@example.com")),
    }
}

#[allow(dead_code)]
pub fn product(id: &str) -> ProductRef {
    ProductRef {
        id: id.to_string(),
        name: format!("Product {id}"),
        price: 450.0,
        image: format!("https://img.example.com/{id}.jpg"),
        category: "Pavers".to_string(),
    }
}

/// Wait (bounded) until the synchronizer state satisfies `predicate`.
#[allow(dead_code)]
pub async fn wait_for(
    sync: &WishlistSync,
    mut predicate: impl FnMut(&SyncState) -> bool,
) -> SyncState {
    let mut rx = sync.subscribe();
    let result = tokio::time::timeout(Duration::from_secs(2), async {
        rx.wait_for(|state| predicate(state))
            .await
            .map(|state| state.clone())
    })
    .await;

    match result {
        Ok(Ok(state)) => state,
        Ok(Err(_)) => panic!("synchronizer stopped"),
        Err(_) => panic!("timed out waiting for state; last = {:?}", sync.state()),
    }
}

/// Give spawned store tasks a chance to run.
#[allow(dead_code)]
pub async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
    tokio::time::sleep(Duration::from_millis(20)).await;
}

// ─── HTTP Helpers ────────────────────────────────────────────

/// A test app with offline Firestore and a scripted identity stream.
#[allow(dead_code)]
pub struct TestApp {
    pub router: axum::Router,
    pub state: Arc<AppState>,
    pub store: Arc<MockStore>,
    pub auth: watch::Sender<Option<AuthEvent>>,
}

#[allow(dead_code)]
pub fn create_test_app() -> TestApp {
    let config = Config::test_default();
    let db = test_db_offline();
    let identity = IdentityHub::new(
        FirebaseAuthClient::with_base_url(config.firebase_api_key.clone(), "http://127.0.0.1:9"),
        Arc::new(test_verifier(&config)),
        db.clone(),
    );

    let store = MockStore::new();
    let (auth, auth_rx) = watch::channel(None);
    let wishlist = WishlistSync::spawn(store.clone(), auth_rx);

    let state = Arc::new(AppState {
        config,
        db,
        identity,
        wishlist,
    });

    TestApp {
        router: create_router(state.clone()),
        state,
        store,
        auth,
    }
}
