// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Twoj Kwadrat

//! User repository over Keycloak's `USER_ENTITY` table.

use sqlx::mysql::{MySqlPool, MySqlPoolOptions};

use crate::config::DatabaseConfig;
use crate::models::UserRecord;

const SELECT_USERS: &str = "SELECT ID AS id, USERNAME AS username, EMAIL AS email, \
     FIRST_NAME AS first_name, LAST_NAME AS last_name, REALM_ID AS realm_id \
     FROM USER_ENTITY ORDER BY USERNAME";

const SELECT_USER_BY_ID: &str = "SELECT ID AS id, USERNAME AS username, EMAIL AS email, \
     FIRST_NAME AS first_name, LAST_NAME AS last_name, REALM_ID AS realm_id \
     FROM USER_ENTITY WHERE ID = ?";

/// Pooled, read-only access to Keycloak user rows.
#[derive(Clone)]
pub struct UserRepository {
    pool: MySqlPool,
}

impl UserRepository {
    /// Create a repository with a lazy connection pool.
    ///
    /// No connection is made until the first query, so startup does
    /// not block on the database being up.
    pub fn connect_lazy(url: &str, pool_size: u32) -> Result<Self, sqlx::Error> {
        let pool = MySqlPoolOptions::new()
            .max_connections(pool_size)
            .connect_lazy(url)?;
        Ok(Self { pool })
    }

    /// Create from configuration.
    pub fn from_config(config: &DatabaseConfig) -> Result<Self, sqlx::Error> {
        Self::connect_lazy(&config.url(), config.pool_size)
    }

    /// All users, ordered by username.
    pub async fn list(&self) -> Result<Vec<UserRecord>, sqlx::Error> {
        sqlx::query_as::<_, UserRecord>(SELECT_USERS)
            .fetch_all(&self.pool)
            .await
    }

    /// One user by Keycloak id, or `None` on a miss.
    pub async fn by_id(&self, user_id: &str) -> Result<Option<UserRecord>, sqlx::Error> {
        sqlx::query_as::<_, UserRecord>(SELECT_USER_BY_ID)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
    }
}
