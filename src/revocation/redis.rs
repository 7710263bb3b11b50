// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Twoj Kwadrat

//! Shared revocation store backed by Redis.
//!
//! `revoke` writes `bl:<token>` with a TTL equal to the remaining
//! token lifetime, so Redis itself erases the entry at the horizon and
//! no sweep is needed. Visibility is immediate and shared across every
//! instance pointed at the same Redis. A connection failure is
//! reported to the caller; a blacklist write that silently fails must
//! never be presented to the client as "logged out successfully".

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

use super::{RevocationError, RevocationStore};

/// Key namespace for revocation entries.
const KEY_PREFIX: &str = "bl:";

/// Bound on a single Redis command. The verifier consults this store
/// on every request, so a Redis that accepts connections but stops
/// answering must not stall the request pool.
const COMMAND_TIMEOUT: Duration = Duration::from_secs(5);

/// Run a Redis command with the store's timeout, mapping both command
/// failure and elapse to [`RevocationError::Unavailable`].
async fn with_timeout<T>(
    fut: impl std::future::Future<Output = Result<T, redis::RedisError>>,
) -> Result<T, RevocationError> {
    match tokio::time::timeout(COMMAND_TIMEOUT, fut).await {
        Ok(result) => result.map_err(|e| RevocationError::Unavailable(e.to_string())),
        Err(_) => Err(RevocationError::Unavailable(format!(
            "redis command timed out after {}s",
            COMMAND_TIMEOUT.as_secs()
        ))),
    }
}

/// Redis-backed revocation store.
#[derive(Clone)]
pub struct RedisRevocationStore {
    conn: ConnectionManager,
}

impl RedisRevocationStore {
    /// Connect to Redis.
    ///
    /// The connection manager reconnects on its own after transient
    /// failures; commands issued while it is down fail and surface as
    /// [`RevocationError::Unavailable`].
    pub async fn connect(redis_url: &str) -> Result<Self, RevocationError> {
        let client = redis::Client::open(redis_url)
            .map_err(|e| RevocationError::Unavailable(e.to_string()))?;
        let conn = ConnectionManager::new(client)
            .await
            .map_err(|e| RevocationError::Unavailable(e.to_string()))?;
        Ok(Self { conn })
    }

    fn key(token_key: &str) -> String {
        format!("{KEY_PREFIX}{token_key}")
    }
}

/// Remaining TTL for an entry, or `None` when the horizon has already
/// passed and there is nothing left to protect.
fn ttl_for(expires_at: i64, now: i64) -> Option<u64> {
    let ttl = expires_at - now;
    if ttl > 0 {
        Some(ttl as u64)
    } else {
        None
    }
}

#[async_trait]
impl RevocationStore for RedisRevocationStore {
    async fn revoke(&self, token_key: &str, expires_at: i64) -> Result<(), RevocationError> {
        let Some(ttl) = ttl_for(expires_at, Utc::now().timestamp()) else {
            // Token already expired; signature/expiry checks reject it
            // without our help.
            return Ok(());
        };

        let mut conn = self.conn.clone();
        with_timeout(conn.set_ex::<_, _, ()>(Self::key(token_key), 1u8, ttl)).await?;
        Ok(())
    }

    async fn is_revoked(&self, token_key: &str) -> Result<bool, RevocationError> {
        let mut conn = self.conn.clone();
        let exists: bool = with_timeout(conn.exists(Self::key(token_key))).await?;
        Ok(exists)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ttl_is_remaining_lifetime() {
        assert_eq!(ttl_for(1_700_000_120, 1_700_000_000), Some(120));
        assert_eq!(ttl_for(1_700_000_001, 1_700_000_000), Some(1));
    }

    #[test]
    fn expired_horizon_yields_no_ttl() {
        assert_eq!(ttl_for(1_700_000_000, 1_700_000_000), None);
        assert_eq!(ttl_for(1_699_999_000, 1_700_000_000), None);
    }

    #[test]
    fn keys_are_namespaced() {
        assert_eq!(RedisRevocationStore::key("abc"), "bl:abc");
    }

    #[tokio::test(start_paused = true)]
    async fn hung_command_surfaces_as_unavailable() {
        // A command that never answers must elapse instead of hanging
        // the caller. Paused time fast-forwards past the timeout.
        let result =
            with_timeout(std::future::pending::<Result<(), redis::RedisError>>()).await;

        match result {
            Err(RevocationError::Unavailable(msg)) => assert!(msg.contains("timed out")),
            other => panic!("expected Unavailable, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn fast_command_passes_through() {
        let result = with_timeout(async { Ok::<_, redis::RedisError>(true) }).await;
        assert!(result.unwrap());
    }
}
