// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Wishlist models and the local optimistic collection.
//!
//! [`Wishlist`] is the in-memory view of the `wishlistItems` records owned by
//! the current session. Store snapshots form its authoritative base; pending
//! adds and removals are layered on top until the store settles them.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Product fields captured when saving to the wishlist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ProductRef {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub category: String,
}

/// A saved-product marker owned by one user.
///
/// Field names follow the existing `wishlistItems` documents. The document
/// id is not stored in the document body; Firestore supplies it through the
/// `_firestore_id` alias.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct WishlistItem {
    #[serde(alias = "_firestore_id", default)]
    pub id: String,
    pub product_id: String,
    pub user_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub category: String,
}

impl WishlistItem {
    /// Build an item for `product` owned by `user_id` under a local id.
    pub fn for_product(id: impl Into<String>, user_id: &str, product: &ProductRef) -> Self {
        Self {
            id: id.into(),
            product_id: product.id.clone(),
            user_id: user_id.to_string(),
            name: product.name.clone(),
            price: product.price,
            image: product.image.clone(),
            category: product.category.clone(),
        }
    }

    /// The create payload for this item.
    pub fn to_new(&self) -> NewWishlistItem {
        NewWishlistItem {
            user_id: self.user_id.clone(),
            product_id: self.product_id.clone(),
            name: self.name.clone(),
            price: self.price,
            image: self.image.clone(),
            category: self.category.clone(),
        }
    }
}

/// Body of a `wishlistItems` document as written by create.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewWishlistItem {
    pub user_id: String,
    pub product_id: String,
    pub name: String,
    pub price: f64,
    pub image: String,
    pub category: String,
}

/// Per-item optimistic lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "snake_case")]
pub enum EntryState {
    /// Applied locally, store create not yet confirmed.
    Pending,
    /// Backed by a store record.
    Confirmed,
    /// Store create failed; never visible, only reported.
    RolledBack,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct WishlistEntry {
    #[serde(flatten)]
    pub item: WishlistItem,
    pub state: EntryState,
}

impl WishlistEntry {
    fn confirmed(item: WishlistItem) -> Self {
        Self {
            item,
            state: EntryState::Confirmed,
        }
    }
}

/// Local wishlist of the current session.
///
/// Holds at most one visible entry per product id.
#[derive(Debug, Clone, Default)]
pub struct Wishlist {
    entries: Vec<WishlistEntry>,
    /// Store records removed locally whose delete has not settled, by store id.
    pending_removals: HashMap<String, WishlistItem>,
    /// Products whose pending add was removed before the create settled.
    /// Counts in-flight cancelled creates per product id.
    cancelled_adds: HashMap<String, usize>,
}

impl Wishlist {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[WishlistEntry] {
        &self.entries
    }

    pub fn items(&self) -> impl Iterator<Item = &WishlistItem> {
        self.entries.iter().map(|entry| &entry.item)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains_product(&self, product_id: &str) -> bool {
        self.find_by_product(product_id).is_some()
    }

    pub fn find_by_product(&self, product_id: &str) -> Option<&WishlistEntry> {
        self.entries
            .iter()
            .find(|entry| entry.item.product_id == product_id)
    }

    /// Drop all entries and pending removals.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.pending_removals.clear();
        self.cancelled_adds.clear();
    }

    /// Insert an unconfirmed placeholder. Returns `false` if the product is
    /// already present.
    pub fn insert_pending(&mut self, item: WishlistItem) -> bool {
        if self.contains_product(&item.product_id) {
            return false;
        }
        self.entries.push(WishlistEntry {
            item,
            state: EntryState::Pending,
        });
        true
    }

    /// Replace the placeholder `placeholder_id` with its confirmed store id.
    ///
    /// If a snapshot already delivered `store_id`, the placeholder is dropped
    /// so the product stays single. Returns `false` when the placeholder is
    /// gone (removed or replaced by a snapshot in the meantime).
    pub fn confirm(&mut self, placeholder_id: &str, store_id: &str) -> bool {
        let Some(pos) = self.pending_position(placeholder_id) else {
            return false;
        };

        if self.entries.iter().any(|entry| entry.item.id == store_id) {
            self.entries.remove(pos);
            return true;
        }

        if let Some(entry) = self.entries.get_mut(pos) {
            entry.item.id = store_id.to_string();
            entry.state = EntryState::Confirmed;
        }
        true
    }

    /// Remove the placeholder `placeholder_id` after a failed create.
    pub fn roll_back(&mut self, placeholder_id: &str) -> Option<WishlistEntry> {
        let pos = self.pending_position(placeholder_id)?;
        let mut entry = self.entries.remove(pos);
        entry.state = EntryState::RolledBack;
        Some(entry)
    }

    /// Remove the entry for `product_id` ahead of a store delete.
    ///
    /// A confirmed entry is remembered as a pending removal until
    /// [`finish_removal`](Self::finish_removal) or [`restore`](Self::restore).
    pub fn take_for_removal(&mut self, product_id: &str) -> Option<WishlistEntry> {
        let pos = self
            .entries
            .iter()
            .position(|entry| entry.item.product_id == product_id)?;
        let entry = self.entries.remove(pos);
        if entry.state == EntryState::Confirmed {
            self.hide(entry.item.clone());
        }
        Some(entry)
    }

    /// Keep the store record `item` out of view until its delete settles.
    pub fn hide(&mut self, item: WishlistItem) {
        self.entries.retain(|entry| entry.item.id != item.id);
        self.pending_removals.insert(item.id.clone(), item);
    }

    pub fn finish_removal(&mut self, store_id: &str) {
        self.pending_removals.remove(store_id);
    }

    /// Hide unknown store records for `product_id` until the cancelled
    /// create settles. Its record id is not known before then.
    pub fn cancel_pending(&mut self, product_id: &str) {
        *self
            .cancelled_adds
            .entry(product_id.to_string())
            .or_default() += 1;
    }

    /// A cancelled create for `product_id` has settled.
    pub fn settle_cancelled(&mut self, product_id: &str) {
        if let Some(count) = self.cancelled_adds.get_mut(product_id) {
            *count -= 1;
            if *count == 0 {
                self.cancelled_adds.remove(product_id);
            }
        }
    }

    /// Put back an entry whose store delete failed.
    pub fn restore(&mut self, item: WishlistItem) {
        self.pending_removals.remove(&item.id);
        if !self.contains_product(&item.product_id) {
            self.entries.push(WishlistEntry::confirmed(item));
        }
    }

    /// Reconcile with a full snapshot of the user's store records.
    pub fn apply_snapshot(&mut self, records: Vec<WishlistItem>) {
        let mut seen: HashSet<String> = HashSet::with_capacity(records.len());
        let mut next: Vec<WishlistEntry> = Vec::with_capacity(records.len());

        for record in records {
            if self.pending_removals.contains_key(&record.id) {
                continue;
            }
            // Only records already confirmed locally are known not to be
            // the cancelled create.
            if self.cancelled_adds.contains_key(&record.product_id)
                && !self.items().any(|item| item.id == record.id)
            {
                continue;
            }
            if !seen.insert(record.product_id.clone()) {
                continue;
            }
            next.push(WishlistEntry::confirmed(record));
        }

        for entry in self.entries.drain(..) {
            if entry.state == EntryState::Pending && !seen.contains(&entry.item.product_id) {
                seen.insert(entry.item.product_id.clone());
                next.push(entry);
            }
        }

        self.entries = next;
    }

    fn pending_position(&self, placeholder_id: &str) -> Option<usize> {
        self.entries.iter().position(|entry| {
            entry.item.id == placeholder_id && entry.state == EntryState::Pending
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(id: &str, name: &str, price: f64) -> ProductRef {
        ProductRef {
            id: id.to_string(),
            name: name.to_string(),
            price,
            image: format!("https://img.example/{id}.jpg"),
            category: "Tiles".to_string(),
        }
    }

    fn record(store_id: &str, product_id: &str) -> WishlistItem {
        WishlistItem::for_product(store_id, "u1", &product(product_id, "Tile", 10.0))
    }

    #[test]
    fn test_pending_then_confirmed() {
        let mut wishlist = Wishlist::new();
        let placeholder = WishlistItem::for_product("temp-1", "u1", &product("P1", "Tile A", 100.0));

        assert!(wishlist.insert_pending(placeholder));
        assert_eq!(wishlist.entries()[0].state, EntryState::Pending);

        assert!(wishlist.confirm("temp-1", "doc-1"));
        let entry = &wishlist.entries()[0];
        assert_eq!(entry.state, EntryState::Confirmed);
        assert_eq!(entry.item.id, "doc-1");
        assert_eq!(entry.item.name, "Tile A");
        assert_eq!(entry.item.price, 100.0);
    }

    #[test]
    fn test_duplicate_pending_rejected() {
        let mut wishlist = Wishlist::new();
        let p = product("P1", "Tile A", 100.0);

        assert!(wishlist.insert_pending(WishlistItem::for_product("temp-1", "u1", &p)));
        assert!(!wishlist.insert_pending(WishlistItem::for_product("temp-2", "u1", &p)));
        assert_eq!(wishlist.len(), 1);
    }

    #[test]
    fn test_roll_back_restores_previous_set() {
        let mut wishlist = Wishlist::new();
        wishlist.apply_snapshot(vec![record("doc-1", "P1")]);
        let before: Vec<_> = wishlist.items().cloned().collect();

        wishlist.insert_pending(WishlistItem::for_product("temp-1", "u1", &product("P2", "B", 5.0)));
        let rolled = wishlist.roll_back("temp-1").expect("placeholder present");

        assert_eq!(rolled.state, EntryState::RolledBack);
        let after: Vec<_> = wishlist.items().cloned().collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_confirm_targets_placeholder_identity() {
        let mut wishlist = Wishlist::new();
        wishlist.insert_pending(WishlistItem::for_product("temp-1", "u1", &product("P1", "A", 1.0)));
        wishlist.insert_pending(WishlistItem::for_product("temp-2", "u1", &product("P2", "B", 2.0)));

        assert!(wishlist.confirm("temp-2", "doc-2"));

        let p1 = wishlist.find_by_product("P1").unwrap();
        let p2 = wishlist.find_by_product("P2").unwrap();
        assert_eq!(p1.item.id, "temp-1");
        assert_eq!(p1.state, EntryState::Pending);
        assert_eq!(p2.item.id, "doc-2");
        assert_eq!(p2.state, EntryState::Confirmed);
    }

    #[test]
    fn test_confirm_after_snapshot_does_not_duplicate() {
        let mut wishlist = Wishlist::new();
        wishlist.insert_pending(WishlistItem::for_product("temp-1", "u1", &product("P1", "A", 1.0)));

        // The push arrives before the create call returns.
        wishlist.apply_snapshot(vec![record("doc-1", "P1")]);
        assert_eq!(wishlist.len(), 1);

        assert!(!wishlist.confirm("temp-1", "doc-1"));
        assert_eq!(wishlist.len(), 1);
        assert_eq!(wishlist.entries()[0].item.id, "doc-1");
    }

    #[test]
    fn test_snapshot_keeps_pending_overlay() {
        let mut wishlist = Wishlist::new();
        wishlist.insert_pending(WishlistItem::for_product("temp-1", "u1", &product("P9", "A", 1.0)));

        wishlist.apply_snapshot(vec![record("doc-1", "P1"), record("doc-2", "P2")]);

        let ids: Vec<_> = wishlist.items().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["doc-1", "doc-2", "temp-1"]);
    }

    #[test]
    fn test_pending_removal_hidden_from_snapshots() {
        let mut wishlist = Wishlist::new();
        wishlist.apply_snapshot(vec![record("doc-1", "P1"), record("doc-2", "P2")]);

        let taken = wishlist.take_for_removal("P1").unwrap();
        assert_eq!(taken.item.id, "doc-1");

        // Snapshot computed before the delete landed still carries doc-1.
        wishlist.apply_snapshot(vec![record("doc-1", "P1"), record("doc-2", "P2")]);
        assert!(!wishlist.contains_product("P1"));

        wishlist.finish_removal("doc-1");
        wishlist.apply_snapshot(vec![record("doc-2", "P2")]);
        assert_eq!(wishlist.len(), 1);
    }

    #[test]
    fn test_restore_after_failed_delete() {
        let mut wishlist = Wishlist::new();
        let original = record("doc-1", "P1");
        wishlist.apply_snapshot(vec![original.clone()]);

        let taken = wishlist.take_for_removal("P1").unwrap();
        assert!(wishlist.is_empty());

        wishlist.restore(taken.item);
        let entry = wishlist.find_by_product("P1").unwrap();
        assert_eq!(entry.item, original);
        assert_eq!(entry.state, EntryState::Confirmed);

        wishlist.apply_snapshot(vec![original]);
        assert_eq!(wishlist.len(), 1);
    }

    #[test]
    fn test_cancelled_add_hidden_until_settled() {
        let mut wishlist = Wishlist::new();
        wishlist.insert_pending(WishlistItem::for_product("temp-1", "u1", &product("P1", "A", 1.0)));

        let taken = wishlist.take_for_removal("P1").unwrap();
        assert_eq!(taken.state, EntryState::Pending);
        wishlist.cancel_pending("P1");

        // The create landed and was pushed before its result came back.
        wishlist.apply_snapshot(vec![record("doc-1", "P1")]);
        assert!(!wishlist.contains_product("P1"));

        // A new add of the same product is not blocked.
        assert!(wishlist.insert_pending(WishlistItem::for_product("temp-2", "u1", &product("P1", "A", 1.0))));
        assert!(wishlist.confirm("temp-2", "doc-2"));
        wishlist.apply_snapshot(vec![record("doc-1", "P1"), record("doc-2", "P1")]);
        assert_eq!(wishlist.len(), 1);
        assert_eq!(wishlist.entries()[0].item.id, "doc-2");

        wishlist.hide(record("doc-1", "P1"));
        wishlist.settle_cancelled("P1");
        wishlist.apply_snapshot(vec![record("doc-1", "P1"), record("doc-2", "P1")]);
        assert_eq!(wishlist.len(), 1);
        assert_eq!(wishlist.entries()[0].item.id, "doc-2");
    }

    #[test]
    fn test_snapshot_collapses_duplicate_products() {
        let mut wishlist = Wishlist::new();
        wishlist.apply_snapshot(vec![record("doc-1", "P1"), record("doc-2", "P1")]);

        assert_eq!(wishlist.len(), 1);
        assert_eq!(wishlist.entries()[0].item.id, "doc-1");
    }

    #[test]
    fn test_item_document_field_names() {
        let item = record("doc-1", "P1");
        let json = serde_json::to_value(item.to_new()).unwrap();
        assert_eq!(json["userId"], "u1");
        assert_eq!(json["productId"], "P1");
        assert!(json.get("id").is_none());

        let parsed: WishlistItem = serde_json::from_value(serde_json::json!({
            "_firestore_id": "abc",
            "userId": "u1",
            "productId": "P1",
            "price": 12.5
        }))
        .unwrap();
        assert_eq!(parsed.id, "abc");
        assert_eq!(parsed.price, 12.5);
        assert_eq!(parsed.name, "");
    }
}
