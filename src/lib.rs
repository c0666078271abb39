// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Asian Tiles: catalog backend with a session & wishlist synchronizer
//!
//! This crate provides the backend API for the storefront: public catalog
//! reads, Firebase sign-in, and an optimistic wishlist kept in sync with
//! Firestore in real time.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::FirestoreDb;
use services::{IdentityHub, WishlistSync};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: FirestoreDb,
    pub identity: IdentityHub,
    pub wishlist: WishlistSync,
}
