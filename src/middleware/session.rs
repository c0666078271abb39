// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session guards for wishlist and admin routes.
//!
//! The synchronizer holds one process-wide session. A guarded request must
//! also prove it comes from that session's user with a Firebase ID token in
//! an `Authorization: Bearer` header.

use crate::error::AppError;
use crate::models::{Role, Session};
use crate::services::SyncState;
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

/// Resolve the current session, or the error a guarded route should return.
fn authenticated_session(state: &SyncState) -> Result<Session, AppError> {
    if state.loading {
        return Err(AppError::NotReady);
    }
    match &state.session {
        Some(session) if state.is_authenticated() => Ok(session.clone()),
        _ => Err(AppError::Unauthenticated),
    }
}

/// The Bearer token of a request, if any.
pub(crate) fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Check that the request's ID token belongs to `uid`.
pub(crate) async fn verify_caller(
    state: &AppState,
    headers: &HeaderMap,
    uid: &str,
) -> Result<(), AppError> {
    let token = bearer_token(headers).ok_or(AppError::Unauthenticated)?;
    let caller = state.identity.verify_id_token(token).await?;
    if caller.uid != uid {
        tracing::warn!(caller = %caller.uid, session = %uid, "ID token is not for the active session");
        return Err(AppError::Unauthenticated);
    }
    Ok(())
}

/// Middleware that requires a fully authenticated session.
///
/// Inserts the [`Session`] into request extensions.
pub async fn require_session(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let session = authenticated_session(&state.wishlist.state())?;
    verify_caller(&state, request.headers(), &session.uid).await?;
    request.extensions_mut().insert(session);
    Ok(next.run(request).await)
}

/// Middleware that requires an authenticated session with the admin role.
pub async fn require_admin(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let sync = state.wishlist.state();
    let session = authenticated_session(&sync)?;
    verify_caller(&state, request.headers(), &session.uid).await?;
    if sync.role() != Some(Role::Admin) {
        tracing::warn!(uid = %session.uid, role = ?session.role, "Admin route denied");
        return Err(AppError::Forbidden("Admin role required".to_string()));
    }
    request.extensions_mut().insert(session);
    Ok(next.run(request).await)
}
