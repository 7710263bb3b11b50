// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Twoj Kwadrat

//! # API Data Models
//!
//! Response data structures shared across handlers. All types derive
//! `Serialize` and `ToSchema` for JSON handling and OpenAPI docs.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A user row from Keycloak's `USER_ENTITY` table.
///
/// Nullable columns (Keycloak does not require email or names) map to
/// `Option` fields and serialize as JSON `null`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct UserRecord {
    /// Keycloak user id (UUID string).
    pub id: String,
    pub username: String,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub realm_id: Option<String>,
}
