// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Session model: identity, role and synchronizer phase.

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Permission level of a signed-in user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Role lookup still in flight.
    Pending,
    User,
    Admin,
}

impl Role {
    /// Interpret the `role` field of a `users/{uid}` document.
    ///
    /// Anything other than `"admin"` resolves to the least-privileged role.
    pub fn from_document_field(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some("admin") => Role::Admin,
            _ => Role::User,
        }
    }

    pub fn is_admin(self) -> bool {
        self == Role::Admin
    }
}

/// User handle emitted by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub uid: String,
    pub email: Option<String>,
}

/// Auth-state change delivered on the identity stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    SignedIn(AuthUser),
    SignedOut,
}

/// The resolved identity and permission level of the current user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Session {
    pub uid: String,
    pub email: Option<String>,
    pub role: Role,
}

impl Session {
    /// Session for a user whose role lookup has not resolved yet.
    pub fn pending(user: AuthUser) -> Self {
        Self {
            uid: user.uid,
            email: user.email,
            role: Role::Pending,
        }
    }
}

/// Synchronizer lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// No auth result yet.
    Initializing,
    /// Auth stream confirmed no user.
    Anonymous,
    /// User confirmed, role lookup in flight.
    Authenticating,
    /// User and role resolved, wishlist subscription active.
    Authenticated,
}

/// The `users/{uid}` document written on registration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub uid: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}
