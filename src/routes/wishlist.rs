// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Wishlist routes for the signed-in user.
//! The session middleware is applied in routes/mod.rs for these routes.

use crate::error::{AppError, Result};
use crate::models::{ProductRef, Session, WishlistEntry};
use crate::routes::validate_payload;
use crate::services::{AddOutcome, RemoveOutcome};
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/wishlist", get(get_wishlist).post(add_item))
        .route("/api/wishlist/{product_id}", delete(remove_item))
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct WishlistResponse {
    pub items: Vec<WishlistEntry>,
    pub count: usize,
}

/// Result of a wishlist change.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct WishlistChangeResponse {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_id: Option<String>,
}

/// Product summary saved with the wishlist record.
#[derive(Deserialize, Validate)]
pub struct AddToWishlistRequest {
    #[validate(length(min = 1))]
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    #[validate(range(min = 0.0))]
    price: f64,
    #[serde(default)]
    image: String,
    #[serde(default)]
    category: String,
}

impl From<AddToWishlistRequest> for ProductRef {
    fn from(req: AddToWishlistRequest) -> Self {
        Self {
            id: req.id,
            name: req.name,
            price: req.price,
            image: req.image,
            category: req.category,
        }
    }
}

async fn get_wishlist(State(state): State<Arc<AppState>>) -> Json<WishlistResponse> {
    let items = state.wishlist.state().wishlist;
    Json(WishlistResponse {
        count: items.len(),
        items,
    })
}

async fn add_item(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    Json(body): Json<AddToWishlistRequest>,
) -> Result<(StatusCode, Json<WishlistChangeResponse>)> {
    validate_payload(&body)?;
    let product = ProductRef::from(body);
    let product_id = product.id.clone();

    match state.wishlist.add_to_wishlist(product).await? {
        AddOutcome::Added { item_id } => Ok((
            StatusCode::CREATED,
            Json(WishlistChangeResponse {
                status: "added".to_string(),
                item_id: Some(item_id),
            }),
        )),
        AddOutcome::AlreadyPresent => Ok((
            StatusCode::OK,
            Json(WishlistChangeResponse {
                status: "already_present".to_string(),
                item_id: None,
            }),
        )),
        AddOutcome::Discarded => {
            tracing::info!(uid = %session.uid, product_id = %product_id, "Add discarded by session change");
            Err(AppError::Unauthenticated)
        }
    }
}

async fn remove_item(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    Path(product_id): Path<String>,
) -> Result<Json<WishlistChangeResponse>> {
    match state.wishlist.remove_from_wishlist(&product_id).await? {
        RemoveOutcome::Removed => Ok(Json(WishlistChangeResponse {
            status: "removed".to_string(),
            item_id: None,
        })),
        RemoveOutcome::NotPresent => Err(AppError::NotFound(format!(
            "Product {} is not on the wishlist",
            product_id
        ))),
        RemoveOutcome::Discarded => {
            tracing::info!(uid = %session.uid, product_id = %product_id, "Remove discarded by session change");
            Err(AppError::Unauthenticated)
        }
    }
}
