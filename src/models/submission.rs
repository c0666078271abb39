// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Lead-generation submissions written by public visitors.

use serde::{Deserialize, Serialize};

/// Contact form submission (`contactSubmissions`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactSubmission {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub message: String,
    /// RFC3339 submission time
    pub submitted_at: String,
}

/// "Email me this file" request (`downloadSubmissions`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadRequest {
    pub email: String,
    pub file_name: String,
    pub file_url: String,
    /// Signed-in user, if any
    pub user_id: Option<String>,
    pub submitted_at: String,
}
