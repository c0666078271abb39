// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Catalog browsing: search, category filter and sort over product listings.

use crate::models::{Download, Product};
use serde::Deserialize;
use std::collections::BTreeSet;

/// Category value that matches every product.
pub const ALL_CATEGORIES: &str = "All";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProductSort {
    /// Store order (name ascending as fetched)
    #[default]
    Featured,
    NameAsc,
    NameDesc,
}

/// Product listing query.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogQuery {
    /// Case-insensitive substring of the product name
    pub q: Option<String>,
    pub category: Option<String>,
    #[serde(default)]
    pub sort: ProductSort,
}

impl CatalogQuery {
    fn matches(&self, product: &Product) -> bool {
        let matches_search = match self.q.as_deref().map(str::trim) {
            Some(q) if !q.is_empty() => product
                .name
                .to_lowercase()
                .contains(&q.to_lowercase()),
            _ => true,
        };

        let matches_category = match self.category.as_deref() {
            None | Some(ALL_CATEGORIES) | Some("") => true,
            Some(category) => product.category == category,
        };

        matches_search && matches_category
    }
}

/// Apply `query` to `products`.
pub fn filter_products(products: Vec<Product>, query: &CatalogQuery) -> Vec<Product> {
    let mut filtered: Vec<Product> = products
        .into_iter()
        .filter(|product| query.matches(product))
        .collect();

    match query.sort {
        ProductSort::Featured => {}
        ProductSort::NameAsc => filtered.sort_by_key(|p| p.name.to_lowercase()),
        ProductSort::NameDesc => {
            filtered.sort_by_key(|p| std::cmp::Reverse(p.name.to_lowercase()))
        }
    }

    filtered
}

/// Category filter options: `All` followed by distinct categories, sorted.
pub fn categories(products: &[Product]) -> Vec<String> {
    let distinct: BTreeSet<&str> = products
        .iter()
        .map(|p| p.category.as_str())
        .filter(|c| !c.is_empty())
        .collect();

    std::iter::once(ALL_CATEGORIES)
        .chain(distinct)
        .map(String::from)
        .collect()
}

/// Download filter options: `All` followed by categories in first-seen order.
pub fn download_categories(downloads: &[Download]) -> Vec<String> {
    let mut result = vec![ALL_CATEGORIES.to_string()];
    for download in downloads {
        if !download.category.is_empty() && !result.contains(&download.category) {
            result.push(download.category.clone());
        }
    }
    result
}
