// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Twoj Kwadrat

//! Axum extractors for authenticated identities.
//!
//! Use the `Auth` extractor in handlers to require authentication:
//!
//! ```rust,ignore
//! async fn my_handler(Auth(user): Auth) -> impl IntoResponse {
//!     // user is AuthenticatedUser
//! }
//! ```
//!
//! `AdminOnly` additionally requires the `admin` realm role. A missing
//! role is a 403, never a silent downgrade to partial results.

use axum::{extract::FromRequestParts, http::request::Parts};

use super::{bearer_token, AuthError, AuthenticatedUser, Role};
use crate::state::AppState;

/// Extractor requiring any verified identity.
pub struct Auth(pub AuthenticatedUser);

impl FromRequestParts<AppState> for Auth {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        // Middleware (tests, future pre-auth layers) may already have
        // attached an identity.
        if let Some(user) = parts.extensions.get::<AuthenticatedUser>().cloned() {
            return Ok(Auth(user));
        }

        let token = bearer_token(&parts.headers)?;
        let user = state.verifier.verify(token).await?;

        Ok(Auth(user))
    }
}

/// Extractor that requires the admin realm role.
pub struct AdminOnly(pub AuthenticatedUser);

impl FromRequestParts<AppState> for AdminOnly {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Auth(user) = Auth::from_request_parts(parts, state).await?;

        if !user.has_role(Role::Admin) {
            tracing::debug!(subject = %user.subject, "admin role required");
            return Err(AuthError::InsufficientRole);
        }

        Ok(AdminOnly(user))
    }
}
