// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Catalog content documents (products, projects, collections, downloads).
//!
//! Documents are created by the admin panel with generated ids and loosely
//! enforced fields, so everything except the id defaults when absent.

use crate::models::wishlist::ProductRef;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Product document in the `products` collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase", default)]
pub struct Product {
    #[serde(alias = "_firestore_id")]
    pub id: String,
    pub name: String,
    pub category: String,
    pub price: f64,
    /// Primary image reference
    pub image: String,
    /// Gallery images (older products only)
    pub images: Vec<String>,
    pub size: String,
    pub finish: String,
    pub in_stock: bool,
    pub description: String,
    pub features: Vec<String>,
    pub specifications: BTreeMap<String, String>,
    pub dimensions: Option<String>,
    pub area: Option<String>,
    pub thickness: Option<String>,
    pub coverage: Option<String>,
}

impl Product {
    /// Images to show on the detail page.
    ///
    /// Prefers the `images` array, falling back to the single `image`.
    pub fn gallery(&self) -> Vec<String> {
        if !self.images.is_empty() {
            return self.images.clone();
        }
        if !self.image.is_empty() {
            return vec![self.image.clone()];
        }
        Vec::new()
    }

    /// Fields denormalized into a wishlist entry.
    pub fn as_wishlist_ref(&self) -> ProductRef {
        ProductRef {
            id: self.id.clone(),
            name: self.name.clone(),
            price: self.price,
            image: self.image.clone(),
            category: self.category.clone(),
        }
    }
}

/// Completed installation shown on the projects page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase", default)]
pub struct Project {
    #[serde(alias = "_firestore_id")]
    pub id: String,
    pub title: String,
    pub client: String,
    pub category: String,
    pub location: String,
    pub area: String,
    pub year: String,
    pub image: String,
    pub description: String,
}

/// Product collection (range) card.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase", default)]
pub struct Collection {
    #[serde(alias = "_firestore_id")]
    pub id: String,
    pub name: String,
    pub description: String,
    pub image: String,
    /// Number of products in the range
    pub products: u32,
    pub price_range: String,
    pub badge: Option<String>,
}

/// Downloadable brochure or technical sheet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase", default)]
pub struct Download {
    #[serde(alias = "_firestore_id")]
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub size: String,
    pub format: String,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub downloads: u64,
    pub date: String,
    pub file_url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase", default)]
pub struct Testimonial {
    #[serde(alias = "_firestore_id")]
    pub id: String,
    pub name: String,
    pub location: String,
    pub rating: u8,
    pub text: String,
}
