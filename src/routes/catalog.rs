// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Public catalog routes.

use crate::error::{AppError, Result};
use crate::models::{Collection, Download, Product, Project, Testimonial};
use crate::services::catalog::{self, CatalogQuery, ALL_CATEGORIES};
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/products", get(list_products))
        .route("/api/products/{id}", get(get_product))
        .route("/api/projects", get(list_projects))
        .route("/api/collections", get(list_collections))
        .route("/api/downloads", get(list_downloads))
        .route("/api/testimonials", get(list_testimonials))
}

// ─── Products ────────────────────────────────────────────────

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ProductListResponse {
    pub products: Vec<Product>,
    /// Filter options computed over the unfiltered catalog
    pub categories: Vec<String>,
    pub total: usize,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ProductDetailResponse {
    #[serde(flatten)]
    pub product: Product,
    pub gallery: Vec<String>,
}

async fn list_products(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CatalogQuery>,
) -> Result<Json<ProductListResponse>> {
    let all = state.db.list_products().await?;
    let categories = catalog::categories(&all);
    let products = catalog::filter_products(all, &query);

    Ok(Json(ProductListResponse {
        total: products.len(),
        products,
        categories,
    }))
}

async fn get_product(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ProductDetailResponse>> {
    let product = state
        .db
        .get_product(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Product {} not found", id)))?;

    Ok(Json(ProductDetailResponse {
        gallery: product.gallery(),
        product,
    }))
}

// ─── Content ─────────────────────────────────────────────────

async fn list_projects(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Project>>> {
    Ok(Json(state.db.list_projects().await?))
}

async fn list_collections(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Collection>>> {
    Ok(Json(state.db.list_collections().await?))
}

async fn list_testimonials(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Testimonial>>> {
    Ok(Json(state.db.list_testimonials().await?))
}

#[derive(Deserialize)]
struct DownloadsQuery {
    category: Option<String>,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct DownloadListResponse {
    pub downloads: Vec<Download>,
    pub categories: Vec<String>,
}

async fn list_downloads(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DownloadsQuery>,
) -> Result<Json<DownloadListResponse>> {
    let all = state.db.list_downloads().await?;
    let categories = catalog::download_categories(&all);

    let downloads = match query.category.as_deref() {
        None | Some("") | Some(ALL_CATEGORIES) => all,
        Some(category) => all
            .into_iter()
            .filter(|d| d.category == category)
            .collect(),
    };

    Ok(Json(DownloadListResponse {
        downloads,
        categories,
    }))
}
