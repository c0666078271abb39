// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Asian Tiles API Server
//!
//! Serves the storefront catalog and keeps the signed-in user's wishlist
//! synchronized with Firestore.

use asian_tiles::{
    config::Config,
    db::FirestoreDb,
    services::{FirebaseAuthClient, IdTokenVerifier, IdentityHub, WishlistSync},
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging()?;

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(port = config.port, "Starting Asian Tiles API");

    // Initialize Firestore database
    let db = FirestoreDb::new(&config.firebase_project_id).await?;

    let verifier = Arc::new(IdTokenVerifier::new(&config)?);
    let identity = IdentityHub::new(
        FirebaseAuthClient::new(config.firebase_api_key.clone()),
        verifier,
        db.clone(),
    );

    // The synchronizer must be listening before the first auth result.
    let wishlist = WishlistSync::spawn(Arc::new(db.clone()), identity.subscribe());
    identity.start();
    tracing::info!("Wishlist synchronizer started");

    // Build shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        db,
        identity,
        wishlist,
    });

    // Build router
    let app = asian_tiles::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("asian_tiles=debug".parse()?)
                .add_directive("info".parse()?),
        )
        .with(format)
        .init();
    Ok(())
}
