// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Identity provider: Firebase Authentication and the auth-state stream.
//!
//! [`IdentityHub`] owns the process-wide auth-state stream consumed by the
//! wishlist synchronizer. The stream holds `None` until [`IdentityHub::start`]
//! reports the initial (signed-out) state, then one [`AuthEvent`] per
//! sign-in or sign-out.

use crate::db::FirestoreDb;
use crate::error::AppError;
use crate::models::{AuthEvent, AuthUser, UserProfile};
use crate::services::id_token::{IdTokenError, IdTokenVerifier};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::watch;

const IDENTITY_TOOLKIT_URL: &str = "https://identitytoolkit.googleapis.com/v1";

/// Client for the Firebase Auth (Identity Toolkit) REST API.
#[derive(Clone)]
pub struct FirebaseAuthClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountResponse {
    local_id: String,
    email: Option<String>,
    id_token: String,
}

/// A password sign-in: the user and the ID token that authenticates their
/// later requests.
#[derive(Debug, Clone)]
pub struct SignedIn {
    pub user: AuthUser,
    pub id_token: String,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

impl FirebaseAuthClient {
    /// Create a client for `api_key`.
    ///
    /// For local development with the emulator, set FIREBASE_AUTH_EMULATOR_HOST.
    pub fn new(api_key: impl Into<String>) -> Self {
        let base_url = match std::env::var("FIREBASE_AUTH_EMULATOR_HOST") {
            Ok(host) => {
                tracing::info!(host = %host, "Using Firebase Auth emulator");
                format!("http://{host}/identitytoolkit.googleapis.com/v1")
            }
            Err(_) => IDENTITY_TOOLKIT_URL.to_string(),
        };
        Self::with_base_url(api_key, base_url)
    }

    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    /// Sign in an existing email/password account.
    pub async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<SignedIn, AppError> {
        self.password_call("signInWithPassword", email, password)
            .await
    }

    /// Create an email/password account.
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<SignedIn, AppError> {
        self.password_call("signUp", email, password).await
    }

    async fn password_call(
        &self,
        method: &str,
        email: &str,
        password: &str,
    ) -> Result<SignedIn, AppError> {
        let url = format!("{}/accounts:{}", self.base_url, method);

        let response = self
            .http
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&PasswordRequest {
                email,
                password,
                return_secure_token: true,
            })
            .send()
            .await
            .map_err(|e| AppError::Identity(format!("{method} request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let message = response
                .json::<ErrorEnvelope>()
                .await
                .map(|envelope| envelope.error.message)
                .unwrap_or_else(|_| format!("HTTP {status}"));
            return Err(map_auth_error(&message));
        }

        let account: AccountResponse = response
            .json()
            .await
            .map_err(|e| AppError::Identity(format!("invalid {method} response: {e}")))?;

        Ok(SignedIn {
            user: AuthUser {
                uid: account.local_id,
                email: account.email.or_else(|| Some(email.to_string())),
            },
            id_token: account.id_token,
        })
    }
}

/// Map an Identity Toolkit error message (e.g. `"WEAK_PASSWORD : ..."`).
fn map_auth_error(message: &str) -> AppError {
    let code = message
        .split(|c: char| c == ' ' || c == ':')
        .next()
        .unwrap_or_default();

    match code {
        "EMAIL_NOT_FOUND" | "INVALID_PASSWORD" | "INVALID_LOGIN_CREDENTIALS" | "USER_DISABLED" => {
            AppError::InvalidCredentials
        }
        "EMAIL_EXISTS" => {
            AppError::BadRequest("An account with this email already exists".to_string())
        }
        "WEAK_PASSWORD" => {
            AppError::BadRequest("Password should be at least 6 characters".to_string())
        }
        "INVALID_EMAIL" | "MISSING_EMAIL" | "MISSING_PASSWORD" => {
            AppError::BadRequest("Email and password are required".to_string())
        }
        _ => AppError::Identity(message.to_string()),
    }
}

/// Owner of the auth-state stream.
pub struct IdentityHub {
    auth: FirebaseAuthClient,
    verifier: Arc<IdTokenVerifier>,
    db: FirestoreDb,
    events: watch::Sender<Option<AuthEvent>>,
}

impl IdentityHub {
    pub fn new(auth: FirebaseAuthClient, verifier: Arc<IdTokenVerifier>, db: FirestoreDb) -> Self {
        let (events, _) = watch::channel(None);
        Self {
            auth,
            verifier,
            db,
            events,
        }
    }

    /// Receiver for auth-state changes.
    pub fn subscribe(&self) -> watch::Receiver<Option<AuthEvent>> {
        self.events.subscribe()
    }

    /// Report the startup state. No-op once any state has been reported.
    pub fn start(&self) {
        self.events.send_if_modified(|current| {
            if current.is_some() {
                return false;
            }
            *current = Some(AuthEvent::SignedOut);
            true
        });
    }

    /// The user whose sign-in is current, if any.
    pub fn current_user(&self) -> Option<AuthUser> {
        match &*self.events.borrow() {
            Some(AuthEvent::SignedIn(user)) => Some(user.clone()),
            _ => None,
        }
    }

    pub async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<SignedIn, AppError> {
        let signed_in = self.auth.sign_in_with_password(email, password).await?;
        self.emit_signed_in(signed_in.user.clone());
        Ok(signed_in)
    }

    /// Identify the caller of a request by their ID token.
    ///
    /// Does not change the current session.
    pub async fn verify_id_token(&self, id_token: &str) -> Result<AuthUser, AppError> {
        self.verifier.verify(id_token).await.map_err(|e| match e {
            IdTokenError::Rejected(msg) => AppError::InvalidToken(msg),
            IdTokenError::Transient(msg) => AppError::Identity(msg),
        })
    }

    /// Sign in with an ID token obtained by a client-side Firebase sign-in.
    pub async fn sign_in_with_id_token(&self, id_token: &str) -> Result<AuthUser, AppError> {
        let user = self.verify_id_token(id_token).await?;
        self.emit_signed_in(user.clone());
        Ok(user)
    }

    /// Create an account, store its profile with the default role, and sign in.
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<SignedIn, AppError> {
        let signed_in = self.auth.sign_up(email, password).await?;
        let user = &signed_in.user;

        let profile = UserProfile {
            uid: user.uid.clone(),
            name: name.to_string(),
            email: user.email.clone(),
            role: Some("user".to_string()),
        };
        if let Err(e) = self.db.upsert_user_profile(&profile).await {
            // Role lookup falls back to "user" when the document is missing.
            tracing::warn!(uid = %user.uid, error = %e, "Failed to store user profile");
        }

        self.emit_signed_in(user.clone());
        Ok(signed_in)
    }

    pub fn sign_out(&self) {
        tracing::info!("Signing out");
        self.events.send_replace(Some(AuthEvent::SignedOut));
    }

    fn emit_signed_in(&self, user: AuthUser) {
        tracing::info!(uid = %user.uid, "Signing in");
        self.events.send_replace(Some(AuthEvent::SignedIn(user)));
    }
}
