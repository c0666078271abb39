// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session and Firebase sign-in routes.

use axum::{extract::State, http::HeaderMap, routing::get, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

use crate::error::Result;
use crate::middleware::session::verify_caller;
use crate::models::{Phase, Session};
use crate::routes::validate_payload;
use crate::services::{SignedIn, SyncState};
use crate::AppState;

/// How long sign-in routes wait for the role lookup before answering.
const SESSION_SETTLE_TIMEOUT: Duration = Duration::from_secs(5);

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/session", get(get_session))
        .route("/api/auth/login", post(login))
        .route("/api/auth/register", post(register))
        .route("/api/auth/token", post(token_sign_in))
        .route("/api/auth/logout", post(logout))
}

/// Current session state.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SessionResponse {
    pub phase: Phase,
    pub session: Option<Session>,
    pub loading: bool,
    /// ID token to send as `Authorization: Bearer` on guarded routes.
    /// Only returned by password sign-in and registration.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
}

impl From<SyncState> for SessionResponse {
    fn from(state: SyncState) -> Self {
        Self {
            phase: state.phase,
            session: state.session,
            loading: state.loading,
            id_token: None,
        }
    }
}

#[derive(Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    email: String,
    #[validate(length(min = 1))]
    password: String,
}

#[derive(Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 100))]
    name: String,
    #[validate(email)]
    email: String,
    #[validate(length(min = 6, message = "Password should be at least 6 characters"))]
    password: String,
}

#[derive(Deserialize, Validate)]
pub struct TokenRequest {
    #[validate(length(min = 1))]
    id_token: String,
}

async fn get_session(State(state): State<Arc<AppState>>) -> Json<SessionResponse> {
    Json(state.wishlist.state().into())
}

async fn login(
    State(state): State<Arc<AppState>>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<SessionResponse>> {
    validate_payload(&body)?;
    let signed_in = state
        .identity
        .sign_in_with_password(&body.email, &body.password)
        .await?;
    Ok(Json(with_token(&state, signed_in).await))
}

async fn register(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RegisterRequest>,
) -> Result<Json<SessionResponse>> {
    validate_payload(&body)?;
    let signed_in = state
        .identity
        .register(body.name.trim(), &body.email, &body.password)
        .await?;
    Ok(Json(with_token(&state, signed_in).await))
}

/// Sign in with an ID token from a client-side Firebase sign-in.
async fn token_sign_in(
    State(state): State<Arc<AppState>>,
    Json(body): Json<TokenRequest>,
) -> Result<Json<SessionResponse>> {
    validate_payload(&body)?;
    let user = state.identity.sign_in_with_id_token(&body.id_token).await?;
    Ok(Json(wait_for_session(&state, &user.uid).await))
}

/// End the current session. Only its own user may do so.
async fn logout(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<SessionResponse>> {
    let Some(current) = state.identity.current_user() else {
        return Ok(Json(state.wishlist.state().into()));
    };
    verify_caller(&state, &headers, &current.uid).await?;

    state.identity.sign_out();

    let mut rx = state.wishlist.subscribe();
    let settled = tokio::time::timeout(
        SESSION_SETTLE_TIMEOUT,
        rx.wait_for(|s| s.phase == Phase::Anonymous),
    )
    .await
    .is_ok();
    if !settled {
        tracing::warn!("Timed out waiting for sign-out to settle");
    }

    Ok(Json(state.wishlist.state().into()))
}

async fn with_token(state: &AppState, signed_in: SignedIn) -> SessionResponse {
    let mut response = wait_for_session(state, &signed_in.user.uid).await;
    response.id_token = Some(signed_in.id_token);
    response
}

/// Wait until the synchronizer has authenticated `uid`.
///
/// On timeout the current (still authenticating) state is returned.
async fn wait_for_session(state: &AppState, uid: &str) -> SessionResponse {
    let mut rx = state.wishlist.subscribe();
    let settled = tokio::time::timeout(
        SESSION_SETTLE_TIMEOUT,
        rx.wait_for(|s| {
            s.is_authenticated() && s.session.as_ref().is_some_and(|session| session.uid == uid)
        }),
    )
    .await
    .is_ok();
    if !settled {
        tracing::warn!(uid, "Timed out waiting for role lookup");
    }

    state.wishlist.state().into()
}
