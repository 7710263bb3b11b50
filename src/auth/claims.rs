// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Twoj Kwadrat

//! JWT claims, the untrusted decode path, and the verified identity.
//!
//! There are two ways claims leave this module:
//!
//! - The verifier decodes tokens **with** signature verification and
//!   builds an [`AuthenticatedUser`] from the result.
//! - The logout path calls [`decode_unverified`] to read an expiry out
//!   of a token that may already be expired or otherwise rejectable.
//!   That is the only sanctioned caller; never use it on the
//!   authorization path.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::roles::Role;

/// Fallback revocation horizon for tokens without an `exp` claim.
///
/// Absence of expiry must not mean "revoked forever"; the entry gets a
/// bounded lifetime instead.
pub const REVOCATION_FALLBACK_SECS: i64 = 3600;

/// Claims carried in a Keycloak access token.
///
/// Keycloak puts realm roles in the nested `realm_access.roles` list;
/// that shape is canonical here. Issuer-specific fields not listed are
/// ignored on decode.
#[derive(Debug, Clone, Deserialize)]
pub struct KeycloakClaims {
    /// Subject (Keycloak user id)
    pub sub: String,

    /// Expiration timestamp (epoch seconds)
    #[serde(default)]
    pub exp: Option<i64>,

    /// Issued at timestamp
    #[serde(default)]
    pub iat: Option<i64>,

    /// Audience; validated by the jsonwebtoken crate, not read directly.
    /// Kept loose because Keycloak emits either a string or a list.
    #[serde(default)]
    pub aud: Option<serde_json::Value>,

    /// Preferred username
    #[serde(default)]
    pub preferred_username: Option<String>,

    /// Realm-level role container
    #[serde(default)]
    pub realm_access: Option<RealmAccess>,
}

/// Nested realm role list.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RealmAccess {
    #[serde(default)]
    pub roles: Vec<String>,
}

impl KeycloakClaims {
    /// Realm roles, empty when the claim is absent.
    pub fn roles(&self) -> &[String] {
        self.realm_access
            .as_ref()
            .map(|ra| ra.roles.as_slice())
            .unwrap_or(&[])
    }
}

/// Decode a token's claims without verifying its signature.
///
/// Structurally malformed input is still rejected; expired or badly
/// signed tokens are not. Logout-path use only.
pub fn decode_unverified(token: &str) -> Result<KeycloakClaims, super::AuthError> {
    let token_data = jsonwebtoken::dangerous::insecure_decode::<KeycloakClaims>(token)
        .map_err(|_| super::AuthError::MalformedToken)?;
    Ok(token_data.claims)
}

/// Compute the horizon until which a revocation entry for `token`
/// must be kept.
///
/// Uses the token's `exp` claim when one can be read; decode failure
/// or a missing claim falls back to `now + 3600`. Failure is non-fatal
/// by design: the goal is a bounded entry lifetime, not
/// re-authentication.
pub fn revocation_horizon(token: &str, now: i64) -> i64 {
    match decode_unverified(token) {
        Ok(claims) => claims.exp.unwrap_or(now + REVOCATION_FALLBACK_SECS),
        Err(_) => now + REVOCATION_FALLBACK_SECS,
    }
}

/// Verified identity extracted from a token that passed revocation and
/// signature checks.
///
/// This is the only artifact handlers and role gates see; it is never
/// persisted.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthenticatedUser {
    /// Keycloak user id (`sub` claim)
    pub subject: String,

    /// Preferred username (if present)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// Realm roles as delivered in the token
    pub roles: Vec<String>,

    /// Raw token string, kept as the revocation key (not serialized)
    #[serde(skip)]
    pub token_key: String,

    /// Token expiration (epoch seconds, not serialized)
    #[serde(skip)]
    pub expires_at: i64,
}

impl AuthenticatedUser {
    /// Build from verified claims and the raw token they came from.
    pub fn from_claims(claims: KeycloakClaims, token: &str) -> Self {
        Self {
            subject: claims.sub.clone(),
            username: claims.preferred_username.clone(),
            roles: claims.roles().to_vec(),
            token_key: token.to_string(),
            expires_at: claims.exp.unwrap_or(0),
        }
    }

    /// Check if the identity carries the given role.
    ///
    /// Matching goes through [`Role::from_claim`], so claim casing is
    /// normalized and unknown realm roles never grant anything.
    pub fn has_role(&self, required: Role) -> bool {
        self.roles
            .iter()
            .any(|r| Role::from_claim(r) == Some(required))
    }

    /// Check if this identity is an admin.
    pub fn is_admin(&self) -> bool {
        self.has_role(Role::Admin)
    }
}


#[cfg(test)]
mod tests {
    use super::test_tokens::{token_with_roles, unsigned_jwt};
    use super::*;

    #[test]
    fn decode_unverified_reads_claims_without_signature() {
        let token = token_with_roles("user-1", 1_700_000_000, &["admin", "user"]);
        let claims = decode_unverified(&token).unwrap();
        assert_eq!(claims.sub, "user-1");
        assert_eq!(claims.exp, Some(1_700_000_000));
        assert_eq!(claims.roles(), ["admin", "user"]);
    }

    #[test]
    fn decode_unverified_accepts_expired_tokens() {
        // Logout must be able to read an expiry out of a token that
        // trusted verification would already reject.
        let token = token_with_roles("user-1", 1, &[]);
        let claims = decode_unverified(&token).unwrap();
        assert_eq!(claims.exp, Some(1));
    }

    #[test]
    fn decode_unverified_rejects_malformed_input() {
        assert!(decode_unverified("not-a-jwt").is_err());
        assert!(decode_unverified("a.b").is_err());
        assert!(decode_unverified("").is_err());
    }

    #[test]
    fn revocation_horizon_uses_exp_claim() {
        let token = token_with_roles("user-1", 1_700_000_120, &[]);
        assert_eq!(revocation_horizon(&token, 1_700_000_000), 1_700_000_120);
    }

    #[test]
    fn revocation_horizon_falls_back_without_exp() {
        let token = unsigned_jwt(r#"{"sub":"user-1"}"#);
        let now = 1_700_000_000;
        assert_eq!(revocation_horizon(&token, now), now + REVOCATION_FALLBACK_SECS);
    }

    #[test]
    fn revocation_horizon_falls_back_on_decode_failure() {
        let now = 1_700_000_000;
        assert_eq!(
            revocation_horizon("garbage", now),
            now + REVOCATION_FALLBACK_SECS
        );
    }

    #[test]
    fn from_claims_extracts_identity() {
        let token = token_with_roles("user-1", 1_700_000_000, &["admin"]);
        let claims = decode_unverified(&token).unwrap();
        let user = AuthenticatedUser::from_claims(claims, &token);

        assert_eq!(user.subject, "user-1");
        assert_eq!(user.username.as_deref(), Some("user-1"));
        assert_eq!(user.token_key, token);
        assert!(user.is_admin());
        assert!(user.has_role(Role::Admin));
    }

    #[test]
    fn has_role_is_exact_membership() {
        let token = token_with_roles("user-1", 1_700_000_000, &["user"]);
        let claims = decode_unverified(&token).unwrap();
        let user = AuthenticatedUser::from_claims(claims, &token);

        assert!(user.has_role(Role::User));
        assert!(!user.has_role(Role::Admin));
        assert!(!user.is_admin());
    }

    #[test]
    fn has_role_normalizes_claim_casing() {
        let token = token_with_roles("user-1", 1_700_000_000, &["ADMIN", "offline_access"]);
        let claims = decode_unverified(&token).unwrap();
        let user = AuthenticatedUser::from_claims(claims, &token);

        assert!(user.is_admin());
        assert!(!user.has_role(Role::User));
    }
}
