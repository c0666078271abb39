// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use asian_tiles::error::AppError;
use asian_tiles::services::SyncError;
use axum::http::StatusCode;
use axum::response::IntoResponse;

async fn render(err: AppError) -> (StatusCode, serde_json::Value) {
    let response = err.into_response();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_status_codes() {
    let cases = [
        (AppError::Unauthenticated, StatusCode::UNAUTHORIZED, "unauthenticated"),
        (AppError::InvalidCredentials, StatusCode::UNAUTHORIZED, "invalid_credentials"),
        (AppError::Forbidden("admin".to_string()), StatusCode::FORBIDDEN, "forbidden"),
        (AppError::NotReady, StatusCode::SERVICE_UNAVAILABLE, "session_loading"),
        (AppError::NotFound("x".to_string()), StatusCode::NOT_FOUND, "not_found"),
        (AppError::BadRequest("x".to_string()), StatusCode::BAD_REQUEST, "bad_request"),
        (AppError::Mutation("x".to_string()), StatusCode::BAD_GATEWAY, "wishlist_update_failed"),
        (AppError::Database("x".to_string()), StatusCode::INTERNAL_SERVER_ERROR, "database_error"),
    ];

    for (err, status, code) in cases {
        let (actual_status, body) = render(err).await;
        assert_eq!(actual_status, status, "{code}");
        assert_eq!(body["error"], code);
    }
}

#[tokio::test]
async fn test_internal_details_not_leaked() {
    let (_, body) = render(AppError::Database("connection refused at 10.0.0.3".to_string())).await;
    assert!(body.get("details").is_none());

    let (_, body) = render(AppError::Identity("quota exceeded for key abc".to_string())).await;
    assert!(body.get("details").is_none());

    let (_, body) = render(AppError::NotFound("Product P1 not found".to_string())).await;
    assert_eq!(body["details"], "Product P1 not found");
}

#[test]
fn test_sync_error_conversion() {
    assert!(matches!(
        AppError::from(SyncError::Unauthenticated),
        AppError::Unauthenticated
    ));
    assert!(matches!(
        AppError::from(SyncError::Mutation("denied".to_string())),
        AppError::Mutation(msg) if msg == "denied"
    ));
    assert!(matches!(
        AppError::from(SyncError::Stopped),
        AppError::Internal(_)
    ));
}
