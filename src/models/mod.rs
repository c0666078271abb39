// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod catalog;
pub mod session;
pub mod submission;
pub mod wishlist;

pub use catalog::{Collection, Download, Product, Project, Testimonial};
pub use session::{AuthEvent, AuthUser, Phase, Role, Session, UserProfile};
pub use submission::{ContactSubmission, DownloadRequest};
pub use wishlist::{EntryState, NewWishlistItem, ProductRef, Wishlist, WishlistEntry, WishlistItem};
