//! Database layer (Firestore).

pub mod firestore;

pub use firestore::FirestoreDb;

/// Collection names as constants.
///
/// Names match the documents written by the storefront and admin panel.
pub mod collections {
    /// User profiles with role (keyed by Firebase uid)
    pub const USERS: &str = "users";
    pub const WISHLIST_ITEMS: &str = "wishlistItems";
    pub const PRODUCTS: &str = "products";
    pub const PROJECTS: &str = "projects";
    pub const COLLECTIONS: &str = "collections";
    pub const DOWNLOADS: &str = "downloads";
    pub const TESTIMONIALS: &str = "testimonials";
    pub const CONTACT_SUBMISSIONS: &str = "contactSubmissions";
    pub const DOWNLOAD_SUBMISSIONS: &str = "downloadSubmissions";
}
