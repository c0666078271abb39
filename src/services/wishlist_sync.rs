// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session & wishlist state synchronizer.
//!
//! A single task owns the session, its wishlist, and the live wishlist
//! subscription. It reacts to:
//! - auth-state changes from the identity stream
//! - role lookups and store writes completing on spawned tasks
//! - snapshots pushed by the wishlist subscription
//! - add/remove commands from [`WishlistSync`] handles
//!
//! Every auth event starts a new epoch. Async work is tagged with the epoch it
//! was issued under and its result is dropped if the epoch has moved on.

use crate::error::AppError;
use crate::models::{
    AuthEvent, EntryState, NewWishlistItem, Phase, ProductRef, Role, Session, Wishlist,
    WishlistEntry, WishlistItem,
};
use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

const COMMAND_BUFFER: usize = 64;

/// Document store operations the synchronizer depends on.
#[async_trait]
pub trait WishlistStore: Send + Sync + 'static {
    /// Read the role from `users/{uid}`. `None` when the document is missing.
    async fn lookup_role(&self, uid: &str) -> Result<Option<Role>, AppError>;

    /// Open a live subscription to the user's wishlist records.
    ///
    /// Every message is a full snapshot. Dropping the receiver cancels the
    /// subscription.
    fn subscribe_wishlist(&self, uid: &str) -> mpsc::Receiver<Vec<WishlistItem>>;

    /// Create a record and return its assigned id.
    async fn create_wishlist_item(&self, item: &NewWishlistItem) -> Result<String, AppError>;

    /// Delete a record. Deleting a missing record succeeds.
    async fn delete_wishlist_item(&self, item_id: &str) -> Result<(), AppError>;
}

/// Observable synchronizer state.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SyncState {
    pub phase: Phase,
    pub session: Option<Session>,
    pub wishlist: Vec<WishlistEntry>,
    /// True until the first auth result has been fully resolved.
    pub loading: bool,
}

impl SyncState {
    fn initial() -> Self {
        Self {
            phase: Phase::Initializing,
            session: None,
            wishlist: Vec::new(),
            loading: true,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.phase == Phase::Authenticated
    }

    pub fn role(&self) -> Option<Role> {
        self.session.as_ref().map(|session| session.role)
    }

    pub fn contains_product(&self, product_id: &str) -> bool {
        self.wishlist
            .iter()
            .any(|entry| entry.item.product_id == product_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyncError {
    #[error("You must be logged in to change the wishlist")]
    Unauthenticated,

    #[error("Wishlist update failed: {0}")]
    Mutation(String),

    #[error("Wishlist synchronizer has stopped")]
    Stopped,
}

impl From<SyncError> for AppError {
    fn from(err: SyncError) -> Self {
        match err {
            SyncError::Unauthenticated => AppError::Unauthenticated,
            SyncError::Mutation(msg) => AppError::Mutation(msg),
            SyncError::Stopped => AppError::Internal(anyhow::anyhow!(err)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddOutcome {
    /// The store confirmed the record.
    Added { item_id: String },
    /// The product was already on the wishlist; nothing was written.
    AlreadyPresent,
    /// The session changed before the store answered.
    Discarded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoveOutcome {
    Removed,
    NotPresent,
    /// The session changed before the store answered.
    Discarded,
}

type AddReply = oneshot::Sender<Result<AddOutcome, SyncError>>;
type RemoveReply = oneshot::Sender<Result<RemoveOutcome, SyncError>>;

enum Command {
    Add {
        product: ProductRef,
        reply: AddReply,
    },
    Remove {
        product_id: String,
        reply: RemoveReply,
    },
}

enum Event {
    RoleResolved {
        epoch: u64,
        result: Result<Option<Role>, AppError>,
    },
    Created {
        epoch: u64,
        placeholder_id: String,
        result: Result<String, AppError>,
    },
    Deleted {
        epoch: u64,
        op_id: u64,
        result: Result<(), AppError>,
    },
}

struct PendingAdd {
    item: WishlistItem,
    reply: AddReply,
    /// Set when the placeholder was removed before the create settled.
    cancelled_by: Option<RemoveReply>,
}

struct PendingDelete {
    item: WishlistItem,
    reply: RemoveReply,
}

/// Handle to the synchronizer task. Cheap to clone.
#[derive(Clone)]
pub struct WishlistSync {
    commands: mpsc::Sender<Command>,
    state: watch::Receiver<SyncState>,
}

impl WishlistSync {
    /// Spawn the synchronizer on the current tokio runtime.
    ///
    /// `auth` carries `None` until the identity provider reports its first
    /// result. The task stops once every handle has been dropped.
    pub fn spawn(store: Arc<dyn WishlistStore>, auth: watch::Receiver<Option<AuthEvent>>) -> Self {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(SyncState::initial());

        let actor = Synchronizer {
            store,
            auth,
            auth_open: true,
            commands: command_rx,
            events: event_rx,
            event_tx,
            state_tx,
            phase: Phase::Initializing,
            session: None,
            wishlist: Wishlist::new(),
            loading: true,
            epoch: 0,
            next_op: 0,
            subscription: None,
            pending_adds: HashMap::new(),
            pending_deletes: HashMap::new(),
        };
        tokio::spawn(actor.run());

        Self {
            commands: command_tx,
            state: state_rx,
        }
    }

    /// Current state.
    pub fn state(&self) -> SyncState {
        self.state.borrow().clone()
    }

    /// Receiver notified on every state change.
    pub fn subscribe(&self) -> watch::Receiver<SyncState> {
        self.state.clone()
    }

    /// Save `product` to the wishlist.
    ///
    /// The entry is visible as `Pending` before this resolves; it resolves
    /// once the store has confirmed or the entry has been rolled back.
    pub async fn add_to_wishlist(&self, product: ProductRef) -> Result<AddOutcome, SyncError> {
        if !self.state.borrow().is_authenticated() {
            return Err(SyncError::Unauthenticated);
        }

        let (reply, rx) = oneshot::channel();
        self.commands
            .send(Command::Add { product, reply })
            .await
            .map_err(|_| SyncError::Stopped)?;
        rx.await.map_err(|_| SyncError::Stopped)?
    }

    /// Remove the wishlist entry for `product_id`.
    pub async fn remove_from_wishlist(
        &self,
        product_id: &str,
    ) -> Result<RemoveOutcome, SyncError> {
        if !self.state.borrow().is_authenticated() {
            return Err(SyncError::Unauthenticated);
        }

        let (reply, rx) = oneshot::channel();
        self.commands
            .send(Command::Remove {
                product_id: product_id.to_string(),
                reply,
            })
            .await
            .map_err(|_| SyncError::Stopped)?;
        rx.await.map_err(|_| SyncError::Stopped)?
    }
}

struct Synchronizer {
    store: Arc<dyn WishlistStore>,
    auth: watch::Receiver<Option<AuthEvent>>,
    auth_open: bool,
    commands: mpsc::Receiver<Command>,
    events: mpsc::UnboundedReceiver<Event>,
    event_tx: mpsc::UnboundedSender<Event>,
    state_tx: watch::Sender<SyncState>,

    phase: Phase,
    session: Option<Session>,
    wishlist: Wishlist,
    loading: bool,
    epoch: u64,
    next_op: u64,
    subscription: Option<mpsc::Receiver<Vec<WishlistItem>>>,
    pending_adds: HashMap<String, PendingAdd>,
    pending_deletes: HashMap<u64, PendingDelete>,
}

impl Synchronizer {
    async fn run(mut self) {
        let initial = self.auth.borrow_and_update().clone();
        if let Some(event) = initial {
            self.on_auth_event(event);
        }

        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(command) => self.on_command(command),
                    None => break,
                },
                Some(event) = self.events.recv() => self.on_event(event),
                changed = self.auth.changed(), if self.auth_open => match changed {
                    Ok(()) => {
                        let event = self.auth.borrow_and_update().clone();
                        if let Some(event) = event {
                            self.on_auth_event(event);
                        }
                    }
                    Err(_) => {
                        tracing::warn!("Identity stream closed");
                        self.auth_open = false;
                    }
                },
                snapshot = next_snapshot(&mut self.subscription), if self.subscription.is_some() => {
                    match snapshot {
                        Some(items) => self.on_snapshot(items),
                        None => {
                            tracing::warn!(epoch = self.epoch, "Wishlist subscription ended");
                            self.subscription = None;
                        }
                    }
                }
            }
        }

        tracing::debug!("Wishlist synchronizer stopped");
    }

    // ─── Auth Stream ─────────────────────────────────────────────

    fn on_auth_event(&mut self, event: AuthEvent) {
        self.epoch += 1;

        // Cancel before clearing so the old subscription cannot refill state.
        self.subscription = None;
        self.wishlist.clear();
        self.discard_waiters();

        match event {
            AuthEvent::SignedOut => {
                tracing::info!(epoch = self.epoch, "Signed out");
                self.session = None;
                self.phase = Phase::Anonymous;
                self.loading = false;
            }
            AuthEvent::SignedIn(user) => {
                tracing::info!(epoch = self.epoch, uid = %user.uid, "Signed in, resolving role");
                let uid = user.uid.clone();
                self.session = Some(Session::pending(user));
                self.phase = Phase::Authenticating;

                let store = self.store.clone();
                let events = self.event_tx.clone();
                let epoch = self.epoch;
                tokio::spawn(async move {
                    let result = store.lookup_role(&uid).await;
                    let _ = events.send(Event::RoleResolved { epoch, result });
                });
            }
        }

        self.publish();
    }

    fn on_role_resolved(&mut self, result: Result<Option<Role>, AppError>) {
        if self.phase != Phase::Authenticating {
            return;
        }
        let Some(session) = self.session.as_mut() else {
            return;
        };

        session.role = match result {
            Ok(Some(role)) => role,
            Ok(None) => {
                tracing::info!(uid = %session.uid, "No user document, using default role");
                Role::User
            }
            Err(e) => {
                tracing::warn!(uid = %session.uid, error = %e, "Role lookup failed, using default role");
                Role::User
            }
        };

        tracing::info!(uid = %session.uid, role = ?session.role, "Session authenticated");
        self.subscription = Some(self.store.subscribe_wishlist(&session.uid));
        self.phase = Phase::Authenticated;
        self.loading = false;
        self.publish();
    }

    fn on_snapshot(&mut self, items: Vec<WishlistItem>) {
        tracing::debug!(epoch = self.epoch, count = items.len(), "Wishlist snapshot");
        self.wishlist.apply_snapshot(items);
        self.publish();
    }

    // ─── Commands ────────────────────────────────────────────────

    fn on_command(&mut self, command: Command) {
        match command {
            Command::Add { product, reply } => self.add(product, reply),
            Command::Remove { product_id, reply } => self.remove(&product_id, reply),
        }
    }

    fn add(&mut self, product: ProductRef, reply: AddReply) {
        let Some(uid) = self.authenticated_uid() else {
            let _ = reply.send(Err(SyncError::Unauthenticated));
            return;
        };

        if self.wishlist.contains_product(&product.id) {
            let _ = reply.send(Ok(AddOutcome::AlreadyPresent));
            return;
        }

        self.next_op += 1;
        let placeholder_id = format!("temp-{}", self.next_op);
        let item = WishlistItem::for_product(placeholder_id.clone(), &uid, &product);
        let new_item = item.to_new();

        self.wishlist.insert_pending(item.clone());
        self.pending_adds.insert(
            placeholder_id.clone(),
            PendingAdd {
                item,
                reply,
                cancelled_by: None,
            },
        );
        self.publish();

        let store = self.store.clone();
        let events = self.event_tx.clone();
        let epoch = self.epoch;
        tokio::spawn(async move {
            let result = store.create_wishlist_item(&new_item).await;
            let _ = events.send(Event::Created {
                epoch,
                placeholder_id,
                result,
            });
        });
    }

    fn remove(&mut self, product_id: &str, reply: RemoveReply) {
        if self.authenticated_uid().is_none() {
            let _ = reply.send(Err(SyncError::Unauthenticated));
            return;
        }

        let Some(entry) = self.wishlist.take_for_removal(product_id) else {
            let _ = reply.send(Ok(RemoveOutcome::NotPresent));
            return;
        };

        if entry.state == EntryState::Pending {
            // The record does not exist yet; delete it once the create lands.
            match self.pending_adds.get_mut(&entry.item.id) {
                Some(pending) => {
                    pending.cancelled_by = Some(reply);
                    self.wishlist.cancel_pending(product_id);
                }
                None => {
                    let _ = reply.send(Ok(RemoveOutcome::Removed));
                }
            }
        } else {
            self.spawn_delete(entry.item, reply);
        }

        self.publish();
    }

    fn spawn_delete(&mut self, item: WishlistItem, reply: RemoveReply) {
        self.next_op += 1;
        let op_id = self.next_op;
        let item_id = item.id.clone();
        self.pending_deletes
            .insert(op_id, PendingDelete { item, reply });

        let store = self.store.clone();
        let events = self.event_tx.clone();
        let epoch = self.epoch;
        tokio::spawn(async move {
            let result = store.delete_wishlist_item(&item_id).await;
            let _ = events.send(Event::Deleted {
                epoch,
                op_id,
                result,
            });
        });
    }

    // ─── Completions ─────────────────────────────────────────────

    fn on_event(&mut self, event: Event) {
        let epoch = match &event {
            Event::RoleResolved { epoch, .. }
            | Event::Created { epoch, .. }
            | Event::Deleted { epoch, .. } => *epoch,
        };
        if epoch != self.epoch {
            tracing::debug!(
                issued = epoch,
                current = self.epoch,
                "Discarding stale completion"
            );
            return;
        }

        match event {
            Event::RoleResolved { result, .. } => self.on_role_resolved(result),
            Event::Created {
                placeholder_id,
                result,
                ..
            } => self.on_created(&placeholder_id, result),
            Event::Deleted { op_id, result, .. } => self.on_deleted(op_id, result),
        }
    }

    fn on_created(&mut self, placeholder_id: &str, result: Result<String, AppError>) {
        let Some(pending) = self.pending_adds.remove(placeholder_id) else {
            return;
        };
        let PendingAdd {
            mut item,
            reply,
            cancelled_by,
        } = pending;

        match (result, cancelled_by) {
            (Ok(store_id), None) => {
                self.wishlist.confirm(placeholder_id, &store_id);
                tracing::info!(product_id = %item.product_id, item_id = %store_id, "Wishlist item added");
                let _ = reply.send(Ok(AddOutcome::Added { item_id: store_id }));
            }
            (Ok(store_id), Some(remove_reply)) => {
                tracing::info!(
                    product_id = %item.product_id,
                    item_id = %store_id,
                    "Wishlist item removed while pending, deleting"
                );
                item.id = store_id.clone();
                self.wishlist.hide(item.clone());
                self.wishlist.settle_cancelled(&item.product_id);
                self.spawn_delete(item, remove_reply);
                let _ = reply.send(Ok(AddOutcome::Added { item_id: store_id }));
            }
            (Err(e), None) => {
                self.wishlist.roll_back(placeholder_id);
                tracing::warn!(product_id = %item.product_id, error = %e, "Wishlist add rolled back");
                let _ = reply.send(Err(SyncError::Mutation(e.to_string())));
            }
            (Err(e), Some(remove_reply)) => {
                tracing::warn!(product_id = %item.product_id, error = %e, "Wishlist add failed after removal");
                self.wishlist.settle_cancelled(&item.product_id);
                let _ = reply.send(Err(SyncError::Mutation(e.to_string())));
                let _ = remove_reply.send(Ok(RemoveOutcome::Removed));
            }
        }

        self.publish();
    }

    fn on_deleted(&mut self, op_id: u64, result: Result<(), AppError>) {
        let Some(PendingDelete { item, reply }) = self.pending_deletes.remove(&op_id) else {
            return;
        };

        match result {
            Ok(()) => {
                tracing::info!(product_id = %item.product_id, item_id = %item.id, "Wishlist item removed");
                self.wishlist.finish_removal(&item.id);
                let _ = reply.send(Ok(RemoveOutcome::Removed));
            }
            Err(e) => {
                tracing::warn!(product_id = %item.product_id, error = %e, "Wishlist remove rolled back");
                self.wishlist.restore(item);
                let _ = reply.send(Err(SyncError::Mutation(e.to_string())));
            }
        }

        self.publish();
    }

    // ─── Helpers ─────────────────────────────────────────────────

    fn authenticated_uid(&self) -> Option<String> {
        if self.phase != Phase::Authenticated {
            return None;
        }
        self.session.as_ref().map(|session| session.uid.clone())
    }

    /// Answer callers waiting on work from a previous epoch.
    fn discard_waiters(&mut self) {
        for (_, pending) in self.pending_adds.drain() {
            let _ = pending.reply.send(Ok(AddOutcome::Discarded));
            if let Some(remove_reply) = pending.cancelled_by {
                let _ = remove_reply.send(Ok(RemoveOutcome::Discarded));
            }
        }
        for (_, pending) in self.pending_deletes.drain() {
            let _ = pending.reply.send(Ok(RemoveOutcome::Discarded));
        }
    }

    fn publish(&self) {
        self.state_tx.send_replace(SyncState {
            phase: self.phase,
            session: self.session.clone(),
            wishlist: self.wishlist.entries().to_vec(),
            loading: self.loading,
        });
    }
}

async fn next_snapshot(
    subscription: &mut Option<mpsc::Receiver<Vec<WishlistItem>>>,
) -> Option<Vec<WishlistItem>> {
    match subscription {
        Some(receiver) => receiver.recv().await,
        None => std::future::pending().await,
    }
}
