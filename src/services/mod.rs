// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod catalog;
pub mod id_token;
pub mod identity;
pub mod wishlist_sync;

pub use catalog::{CatalogQuery, ProductSort};
pub use id_token::{IdTokenError, IdTokenVerifier};
pub use identity::{FirebaseAuthClient, IdentityHub, SignedIn};
pub use wishlist_sync::{
    AddOutcome, RemoveOutcome, SyncError, SyncState, WishlistStore, WishlistSync,
};
