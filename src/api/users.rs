// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Twoj Kwadrat

//! User endpoints.

use axum::{
    extract::{Path, State},
    Json,
};

use crate::auth::{AdminOnly, Auth};
use crate::error::ApiError;
use crate::models::UserRecord;
use crate::state::AppState;

/// List all users in the realm. Admin role required.
#[utoipa::path(
    get,
    path = "/users",
    tag = "Users",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "All users, ordered by username", body = [UserRecord]),
        (status = 401, description = "Unauthenticated"),
        (status = 403, description = "Admin role required"),
        (status = 429, description = "Rate limit exceeded"),
        (status = 500, description = "Database error")
    )
)]
pub async fn list_users(
    AdminOnly(admin): AdminOnly,
    State(state): State<AppState>,
) -> Result<Json<Vec<UserRecord>>, ApiError> {
    tracing::debug!(subject = %admin.subject, "listing users");
    let users = state.users.list().await?;
    Ok(Json(users))
}

/// Fetch one user by id. Any authenticated identity may read.
#[utoipa::path(
    get,
    path = "/users/{user_id}",
    tag = "Users",
    security(("bearer" = [])),
    params(
        ("user_id" = String, Path, description = "Keycloak user id")
    ),
    responses(
        (status = 200, description = "User record", body = UserRecord),
        (status = 401, description = "Unauthenticated"),
        (status = 404, description = "No such user"),
        (status = 429, description = "Rate limit exceeded"),
        (status = 500, description = "Database error")
    )
)]
pub async fn get_user(
    Auth(_user): Auth,
    Path(user_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<UserRecord>, ApiError> {
    match state.users.by_id(&user_id).await? {
        Some(record) => Ok(Json(record)),
        None => Err(ApiError::not_found("User not found")),
    }
}
