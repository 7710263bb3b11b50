// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Twoj Kwadrat

//! Token verification.
//!
//! The verifier owns the ordering contract of the gate: revocation is
//! checked **before** signature verification. A revoked token is
//! rejected on revocation status alone, independent of whether its
//! signature would still check out, and the revocation lookup
//! short-circuits the more expensive cryptographic work.
//!
//! ## Verification Modes
//!
//! - **Production mode** (Keycloak configured): full verification
//!   against the realm JWKS, with expiry and audience checks.
//! - **Development mode** (no Keycloak configured): structure
//!   validation and a manual expiry check only. Logged loudly at
//!   startup; never a production configuration.

use std::sync::Arc;

use jsonwebtoken::{decode, decode_header, Validation};

use super::claims::{AuthenticatedUser, KeycloakClaims};
use super::error::AuthError;
use super::jwks::JwksManager;
use crate::revocation::RevocationStore;

/// Clock skew tolerance (60 seconds).
const CLOCK_SKEW_LEEWAY: u64 = 60;

/// Verifies bearer tokens against the revocation store and the realm
/// signing keys, producing a verified identity or a rejection.
pub struct TokenVerifier {
    revocations: Arc<dyn RevocationStore>,
    jwks: Option<JwksManager>,
    /// Expected audience (the Keycloak client id), production mode only.
    audience: Option<String>,
}

impl TokenVerifier {
    /// Development-mode verifier: no signature verification.
    pub fn new_development(revocations: Arc<dyn RevocationStore>) -> Self {
        Self {
            revocations,
            jwks: None,
            audience: None,
        }
    }

    /// Production verifier backed by the realm JWKS.
    pub fn new(
        revocations: Arc<dyn RevocationStore>,
        jwks: JwksManager,
        audience: impl Into<String>,
    ) -> Self {
        Self {
            revocations,
            jwks: Some(jwks),
            audience: Some(audience.into()),
        }
    }

    /// Whether this verifier checks signatures.
    pub fn verifies_signatures(&self) -> bool {
        self.jwks.is_some()
    }

    /// Verify a raw bearer token.
    ///
    /// State order: revocation check, then signature/claim
    /// verification. A revocation-store failure is surfaced, not
    /// treated as "not revoked".
    pub async fn verify(&self, token: &str) -> Result<AuthenticatedUser, AuthError> {
        let revoked = self
            .revocations
            .is_revoked(token)
            .await
            .map_err(|e| AuthError::RevocationUnavailable(e.to_string()))?;
        if revoked {
            tracing::debug!("rejecting revoked token");
            return Err(AuthError::Revoked);
        }

        match &self.jwks {
            Some(jwks) => self.verify_signed(token, jwks).await,
            None => self.verify_unsigned(token),
        }
    }

    /// Full verification against the realm JWKS.
    ///
    /// On a signature failure or unknown key id, the JWKS cache is
    /// refreshed once and the decode retried; a rotated signing key
    /// then verifies on the second attempt. A second failure is final.
    async fn verify_signed(
        &self,
        token: &str,
        jwks: &JwksManager,
    ) -> Result<AuthenticatedUser, AuthError> {
        let claims = match self.decode_against_jwks(token, jwks).await {
            Err(AuthError::InvalidSignature) | Err(AuthError::NoMatchingKey) => {
                tracing::info!("signature check failed, refreshing JWKS once for key rotation");
                jwks.refresh().await?;
                self.decode_against_jwks(token, jwks).await
            }
            other => other,
        }?;

        Ok(AuthenticatedUser::from_claims(claims, token))
    }

    async fn decode_against_jwks(
        &self,
        token: &str,
        jwks: &JwksManager,
    ) -> Result<KeycloakClaims, AuthError> {
        let header = decode_header(token).map_err(|_| AuthError::MalformedToken)?;

        let (decoding_key, algorithm) = if let Some(kid) = &header.kid {
            jwks.get_decoding_key(kid).await?
        } else {
            jwks.get_any_decoding_key().await?
        };

        let mut validation = Validation::new(algorithm);
        validation.leeway = CLOCK_SKEW_LEEWAY;

        if let Some(ref audience) = self.audience {
            validation.set_audience(&[audience]);
        } else {
            validation.validate_aud = false;
        }

        let token_data = decode::<KeycloakClaims>(token, &decoding_key, &validation)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                jsonwebtoken::errors::ErrorKind::InvalidSignature => AuthError::InvalidSignature,
                jsonwebtoken::errors::ErrorKind::InvalidAudience => AuthError::InvalidAudience,
                jsonwebtoken::errors::ErrorKind::InvalidIssuer => AuthError::InvalidIssuer,
                jsonwebtoken::errors::ErrorKind::ImmatureSignature => AuthError::TokenNotYetValid,
                _ => AuthError::MalformedToken,
            })?;

        Ok(token_data.claims)
    }

    /// Development verification (no signature check).
    fn verify_unsigned(&self, token: &str) -> Result<AuthenticatedUser, AuthError> {
        let token_data = jsonwebtoken::dangerous::insecure_decode::<KeycloakClaims>(token)
            .map_err(|_| AuthError::MalformedToken)?;
        let claims = token_data.claims;

        let now = chrono::Utc::now().timestamp();
        if let Some(exp) = claims.exp {
            if exp < now - CLOCK_SKEW_LEEWAY as i64 {
                return Err(AuthError::TokenExpired);
            }
        }

        Ok(AuthenticatedUser::from_claims(claims, token))
    }
}
