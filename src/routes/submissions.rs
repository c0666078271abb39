// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Visitor submissions: contact form and download-by-email requests.

use crate::error::Result;
use crate::middleware::session::verify_caller;
use crate::models::{ContactSubmission, DownloadRequest, Phase};
use crate::routes::validate_payload;
use crate::time_utils::format_utc_rfc3339;
use crate::AppState;
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/contact", post(submit_contact))
        .route("/api/downloads/request", post(request_download))
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SubmissionResponse {
    pub id: String,
}

#[derive(Deserialize, Validate)]
pub struct ContactRequest {
    #[validate(length(min = 1, max = 100))]
    name: String,
    #[validate(email)]
    email: String,
    #[validate(length(max = 30))]
    phone: Option<String>,
    #[validate(length(min = 1, max = 5000))]
    message: String,
}

#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct DownloadRequestBody {
    #[validate(email)]
    email: String,
    #[validate(length(min = 1))]
    file_name: String,
    #[validate(url)]
    file_url: String,
}

async fn submit_contact(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ContactRequest>,
) -> Result<(StatusCode, Json<SubmissionResponse>)> {
    validate_payload(&body)?;

    let submission = ContactSubmission {
        name: body.name.trim().to_string(),
        email: body.email,
        phone: body.phone.filter(|p| !p.trim().is_empty()),
        message: body.message,
        submitted_at: format_utc_rfc3339(chrono::Utc::now()),
    };
    let id = state.db.add_contact_submission(&submission).await?;
    tracing::info!(id = %id, "Contact submission stored");

    Ok((StatusCode::CREATED, Json(SubmissionResponse { id })))
}

async fn request_download(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<DownloadRequestBody>,
) -> Result<(StatusCode, Json<SubmissionResponse>)> {
    validate_payload(&body)?;

    // Attributed to the signed-in user when they are the caller.
    let sync = state.wishlist.state();
    let user_id = match sync.session {
        Some(session) if sync.phase == Phase::Authenticated => {
            verify_caller(&state, &headers, &session.uid)
                .await
                .ok()
                .map(|()| session.uid)
        }
        _ => None,
    };

    let request = DownloadRequest {
        email: body.email,
        file_name: body.file_name,
        file_url: body.file_url,
        user_id,
        submitted_at: format_utc_rfc3339(chrono::Utc::now()),
    };
    let id = state.db.add_download_request(&request).await?;
    tracing::info!(id = %id, file = %request.file_name, "Download request stored");

    Ok((StatusCode::CREATED, Json(SubmissionResponse { id })))
}
