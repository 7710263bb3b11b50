// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Twoj Kwadrat

//! # Authentication Module
//!
//! Keycloak JWT authentication for the Kwadrat API.
//!
//! ## Gate Flow
//!
//! 1. Client sends `Authorization: Bearer <Keycloak JWT>`
//! 2. The gate:
//!    - checks the revocation store (logged-out tokens rejected first)
//!    - fetches the realm JWKS and verifies signature, expiry, audience
//!    - extracts `sub` and `realm_access.roles`
//! 3. Role gates (`AdminOnly`) enforce role requirements on top
//!
//! ## Security
//!
//! - Revocation is checked before signature verification
//! - JWKS is cached with TTL and refreshed once on signature failure
//! - Clock skew tolerance is 60 seconds
//! - The untrusted decode in `claims` is confined to the logout path

pub mod claims;
pub mod error;
pub mod extractor;
pub mod jwks;
pub mod roles;
pub mod verifier;

pub use claims::AuthenticatedUser;
pub use error::AuthError;
pub use extractor::{AdminOnly, Auth};
pub use jwks::JwksManager;
pub use roles::Role;
pub use verifier::TokenVerifier;

use axum::http::{header::AUTHORIZATION, HeaderMap};

/// Extract the raw bearer token from request headers.
///
/// Absence or a malformed prefix is a rejection, not a crash.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let auth_header = headers
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingAuthHeader)?
        .to_str()
        .map_err(|_| AuthError::InvalidAuthHeader)?;

    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or(AuthError::InvalidAuthHeader)
}
