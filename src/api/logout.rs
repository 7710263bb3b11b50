// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Twoj Kwadrat

//! Session termination (logout).
//!
//! Logout deliberately bypasses signature verification: the token
//! being logged out may already be expired or otherwise
//! non-canonical, and rejecting the logout for that reason would be
//! wrong. Its claims are trusted just enough to read an expiry, so the
//! revocation entry gets a bounded lifetime instead of living forever.

use axum::{extract::State, http::HeaderMap, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::auth::claims::revocation_horizon;
use crate::auth::{bearer_token, AuthError};
use crate::state::AppState;

/// Successful logout response.
#[derive(Debug, Serialize, ToSchema)]
pub struct LogoutResponse {
    pub message: String,
    /// Until when the token stays blacklisted (RFC 3339).
    pub blacklisted_until: String,
}

/// Log out the presented token.
///
/// Idempotent: a second logout with the same token re-confirms the
/// revocation (possibly with a slightly shorter remaining TTL) or is a
/// harmless no-op once the token has expired. A revocation-store
/// failure is surfaced as 503; it is never masked as success.
#[utoipa::path(
    post,
    path = "/logout",
    tag = "Session",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Token revoked", body = LogoutResponse),
        (status = 401, description = "Missing or malformed Authorization header"),
        (status = 429, description = "Rate limit exceeded"),
        (status = 503, description = "Revocation store unavailable")
    )
)]
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<LogoutResponse>, AuthError> {
    let token = bearer_token(&headers)?;

    let now = Utc::now().timestamp();
    let horizon = revocation_horizon(token, now);

    state.revocations.revoke(token, horizon).await.map_err(|e| {
        tracing::error!(error = %e, "revocation write failed, logout not completed");
        AuthError::RevocationUnavailable(e.to_string())
    })?;

    let blacklisted_until = DateTime::<Utc>::from_timestamp(horizon, 0)
        .map(|ts| ts.to_rfc3339())
        .unwrap_or_else(|| horizon.to_string());

    tracing::info!(%blacklisted_until, "token revoked via logout");

    Ok(Json(LogoutResponse {
        message: "Logged out successfully".to_string(),
        blacklisted_until,
    }))
}
