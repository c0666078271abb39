// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Content management routes for admins.
//! The admin middleware is applied in routes/mod.rs for these routes.

use crate::db::collections;
use crate::error::{AppError, Result};
use crate::models::Session;
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::delete,
    Extension, Router,
};
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/admin/{kind}/{id}", delete(delete_content))
}

/// Map a route segment to the collection admins may delete from.
fn content_collection(kind: &str) -> Option<&'static str> {
    match kind {
        "products" => Some(collections::PRODUCTS),
        "projects" => Some(collections::PROJECTS),
        "collections" => Some(collections::COLLECTIONS),
        "downloads" => Some(collections::DOWNLOADS),
        _ => None,
    }
}

async fn delete_content(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    Path((kind, id)): Path<(String, String)>,
) -> Result<StatusCode> {
    let collection = content_collection(&kind)
        .ok_or_else(|| AppError::NotFound(format!("Unknown content type {}", kind)))?;

    tracing::info!(uid = %session.uid, collection, id = %id, "Admin delete");
    state.db.delete_document(collection, &id).await?;

    Ok(StatusCode::NO_CONTENT)
}
