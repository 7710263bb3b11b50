// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Twoj Kwadrat

//! Realm roles for authorization.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Roles recognized by the gate.
///
/// Keycloak delivers roles as a list of strings under
/// `realm_access.roles`; only the roles below carry meaning here.
/// Unknown realm roles are kept on the identity but never grant
/// anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Full administrative access (user listing, management endpoints)
    Admin,
    /// Normal authenticated user
    User,
}

impl Role {
    /// The realm role string this variant matches in token claims.
    pub fn as_claim(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
        }
    }

    /// Parse a realm role string (case-insensitive).
    pub fn from_claim(s: &str) -> Option<Role> {
        match s.to_lowercase().as_str() {
            "admin" => Some(Role::Admin),
            "user" => Some(Role::User),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_claim())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_claim_parses_known_roles() {
        assert_eq!(Role::from_claim("admin"), Some(Role::Admin));
        assert_eq!(Role::from_claim("ADMIN"), Some(Role::Admin));
        assert_eq!(Role::from_claim("user"), Some(Role::User));
    }

    #[test]
    fn from_claim_rejects_unknown_roles() {
        assert_eq!(Role::from_claim("offline_access"), None);
        assert_eq!(Role::from_claim(""), None);
    }

    #[test]
    fn as_claim_round_trips() {
        assert_eq!(Role::from_claim(Role::Admin.as_claim()), Some(Role::Admin));
        assert_eq!(Role::from_claim(Role::User.as_claim()), Some(Role::User));
    }
}
