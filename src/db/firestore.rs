// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Users (role documents)
//! - Wishlist items (CRUD and live subscriptions)
//! - Catalog content (products, projects, collections, downloads, testimonials)
//! - Visitor submissions (contact form, download requests)

use crate::db::collections;
use crate::error::AppError;
use crate::models::{
    Collection, ContactSubmission, Download, DownloadRequest, NewWishlistItem, Product, Project,
    Role, Testimonial, UserProfile, WishlistItem,
};
use crate::services::wishlist_sync::WishlistStore;
use async_trait::async_trait;
use firestore::{FirestoreListenerTarget, FirestoreMemListenStateStorage};
use tokio::sync::mpsc;

/// Snapshots buffered per wishlist subscription before the listener waits.
const SNAPSHOT_BUFFER: usize = 8;
const TESTIMONIAL_LIMIT: u32 = 4;
const WISHLIST_TARGET: FirestoreListenerTarget = FirestoreListenerTarget::new(1);

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // The emulator accepts any bearer token, so skip credential discovery.
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
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
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

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    // ─── User Operations ─────────────────────────────────────────

    /// Get the profile document for a Firebase uid.
    pub async fn get_user_profile(&self, uid: &str) -> Result<Option<UserProfile>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(uid)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create or update a profile document.
    pub async fn upsert_user_profile(&self, profile: &UserProfile) -> Result<(), AppError> {
        let _: UserProfile = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::USERS)
            .document_id(&profile.uid)
            .object(profile)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    // ─── Wishlist Operations ─────────────────────────────────────

    /// Get all wishlist records owned by `uid`.
    pub async fn get_wishlist(&self, uid: &str) -> Result<Vec<WishlistItem>, AppError> {
        query_wishlist(self.get_client()?, uid).await
    }

    /// Open a live wishlist subscription for `uid`.
    ///
    /// Sends the current records, then a fresh full snapshot after every
    /// change reported by the Firestore listener. The listener is shut down
    /// once the returned receiver is dropped.
    pub fn watch_wishlist(&self, uid: &str) -> mpsc::Receiver<Vec<WishlistItem>> {
        let (tx, rx) = mpsc::channel(SNAPSHOT_BUFFER);

        let client = match self.get_client() {
            Ok(client) => client.clone(),
            Err(e) => {
                tracing::warn!(uid, error = %e, "Wishlist subscription unavailable");
                return rx;
            }
        };

        let uid = uid.to_string();
        tokio::spawn(async move {
            if let Err(e) = run_wishlist_listener(client, &uid, tx).await {
                tracing::error!(uid = %uid, error = %e, "Wishlist listener failed");
            }
        });

        rx
    }

    // ─── Catalog Operations ──────────────────────────────────────

    /// Get all products ordered by name.
    pub async fn list_products(&self) -> Result<Vec<Product>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::PRODUCTS)
            .order_by([("name", firestore::FirestoreQueryDirection::Ascending)])
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get a product by document id.
    pub async fn get_product(&self, product_id: &str) -> Result<Option<Product>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::PRODUCTS)
            .obj()
            .one(product_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get all projects, most recent year first.
    pub async fn list_projects(&self) -> Result<Vec<Project>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::PROJECTS)
            .order_by([("year", firestore::FirestoreQueryDirection::Descending)])
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get all product collections ordered by name.
    pub async fn list_collections(&self) -> Result<Vec<Collection>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::COLLECTIONS)
            .order_by([("name", firestore::FirestoreQueryDirection::Ascending)])
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get all downloads (unordered; ordering would need a composite index).
    pub async fn list_downloads(&self) -> Result<Vec<Download>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::DOWNLOADS)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    pub async fn list_testimonials(&self) -> Result<Vec<Testimonial>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::TESTIMONIALS)
            .limit(TESTIMONIAL_LIMIT)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // ─── Submissions ─────────────────────────────────────────────

    /// Store a contact form submission. Returns the new document id.
    pub async fn add_contact_submission(
        &self,
        submission: &ContactSubmission,
    ) -> Result<String, AppError> {
        let doc_id = uuid::Uuid::new_v4().to_string();
        let _: ContactSubmission = self
            .get_client()?
            .fluent()
            .insert()
            .into(collections::CONTACT_SUBMISSIONS)
            .document_id(&doc_id)
            .object(submission)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(doc_id)
    }

    /// Store a download-by-email request. Returns the new document id.
    pub async fn add_download_request(&self, request: &DownloadRequest) -> Result<String, AppError> {
        let doc_id = uuid::Uuid::new_v4().to_string();
        let _: DownloadRequest = self
            .get_client()?
            .fluent()
            .insert()
            .into(collections::DOWNLOAD_SUBMISSIONS)
            .document_id(&doc_id)
            .object(request)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(doc_id)
    }

    // ─── Admin Operations ────────────────────────────────────────

    /// Delete a content document. Deleting a missing document succeeds.
    pub async fn delete_document(&self, collection: &str, doc_id: &str) -> Result<(), AppError> {
        self.get_client()?
            .fluent()
            .delete()
            .from(collection)
            .document_id(doc_id)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        tracing::info!(collection, doc_id, "Deleted document");
        Ok(())
    }
}

#[async_trait]
impl WishlistStore for FirestoreDb {
    async fn lookup_role(&self, uid: &str) -> Result<Option<Role>, AppError> {
        let profile = self.get_user_profile(uid).await?;
        Ok(profile.map(|p| Role::from_document_field(p.role.as_deref())))
    }

    fn subscribe_wishlist(&self, uid: &str) -> mpsc::Receiver<Vec<WishlistItem>> {
        self.watch_wishlist(uid)
    }

    async fn create_wishlist_item(&self, item: &NewWishlistItem) -> Result<String, AppError> {
        let doc_id = uuid::Uuid::new_v4().to_string();
        let _: NewWishlistItem = self
            .get_client()?
            .fluent()
            .insert()
            .into(collections::WISHLIST_ITEMS)
            .document_id(&doc_id)
            .object(item)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(doc_id)
    }

    async fn delete_wishlist_item(&self, item_id: &str) -> Result<(), AppError> {
        self.get_client()?
            .fluent()
            .delete()
            .from(collections::WISHLIST_ITEMS)
            .document_id(item_id)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }
}

async fn query_wishlist(
    client: &firestore::FirestoreDb,
    uid: &str,
) -> Result<Vec<WishlistItem>, AppError> {
    let uid = uid.to_string();
    client
        .fluent()
        .select()
        .from(collections::WISHLIST_ITEMS)
        .filter(move |q| q.field("userId").eq(uid.clone()))
        .obj()
        .query()
        .await
        .map_err(|e| AppError::Database(e.to_string()))
}

/// Drive one wishlist subscription until `tx` is closed.
async fn run_wishlist_listener(
    client: firestore::FirestoreDb,
    uid: &str,
    tx: mpsc::Sender<Vec<WishlistItem>>,
) -> Result<(), AppError> {
    let initial = query_wishlist(&client, uid).await?;
    if tx.send(initial).await.is_err() {
        return Ok(());
    }

    // Listen events only signal "something changed"; snapshots are re-queried.
    let (changed_tx, mut changed_rx) = mpsc::channel::<()>(1);

    let mut listener = client
        .create_listener(FirestoreMemListenStateStorage::new())
        .await
        .map_err(|e| AppError::Database(format!("Failed to create listener: {}", e)))?;

    let filter_uid = uid.to_string();
    client
        .fluent()
        .select()
        .from(collections::WISHLIST_ITEMS)
        .filter(move |q| q.field("userId").eq(filter_uid.clone()))
        .listen()
        .add_target(WISHLIST_TARGET, &mut listener)
        .map_err(|e| AppError::Database(format!("Failed to add listen target: {}", e)))?;

    listener
        .start(move |_event| {
            let changed_tx = changed_tx.clone();
            async move {
                // A full buffer already has a refresh queued.
                let _ = changed_tx.try_send(());
                Ok(())
            }
        })
        .await
        .map_err(|e| AppError::Database(format!("Failed to start listener: {}", e)))?;

    tracing::debug!(uid, "Wishlist listener started");

    loop {
        tokio::select! {
            _ = tx.closed() => break,
            changed = changed_rx.recv() => {
                if changed.is_none() {
                    break;
                }
                match query_wishlist(&client, uid).await {
                    Ok(items) => {
                        if tx.send(items).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::warn!(uid, error = %e, "Wishlist refresh failed");
                    }
                }
            }
        }
    }

    listener
        .shutdown()
        .await
        .map_err(|e| AppError::Database(format!("Failed to stop listener: {}", e)))?;

    tracing::debug!(uid, "Wishlist listener stopped");
    Ok(())
}
