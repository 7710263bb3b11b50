// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Twoj Kwadrat

//! Process-local revocation store.
//!
//! A mutex-guarded map from raw token string to expiry. Writes and
//! reads are linearizable per key because every operation takes the
//! same lock; no reader can observe a half-written entry. The sweeper
//! runs on a fixed interval, takes the same lock, and removes entries
//! whose horizon has passed so the map does not grow without bound.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use super::{RevocationError, RevocationStore};

/// In-memory revocation store.
#[derive(Default)]
pub struct InMemoryRevocationStore {
    entries: Mutex<HashMap<String, i64>>,
}

impl InMemoryRevocationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove entries whose expiry has passed. Returns the number of
    /// entries removed.
    pub async fn sweep(&self) -> usize {
        self.sweep_at(Utc::now().timestamp()).await
    }

    async fn sweep_at(&self, now: i64) -> usize {
        let mut entries = self.entries.lock().await;
        let before = entries.len();
        entries.retain(|_, expires_at| *expires_at > now);
        before - entries.len()
    }

    async fn revoke_at(&self, token_key: &str, expires_at: i64, now: i64) {
        if expires_at <= now {
            // Already expired; expiry checks alone reject the token.
            return;
        }
        let mut entries = self.entries.lock().await;
        entries.insert(token_key.to_string(), expires_at);
    }

    async fn is_revoked_at(&self, token_key: &str, now: i64) -> bool {
        let entries = self.entries.lock().await;
        match entries.get(token_key) {
            Some(expires_at) => *expires_at > now,
            None => false,
        }
    }

    /// Spawn the background sweep task.
    ///
    /// Runs until the cancellation token fires (service shutdown).
    pub fn spawn_sweeper(
        store: Arc<Self>,
        interval: Duration,
        shutdown: CancellationToken,
    ) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick fires immediately; skip it so startup
            // does not race a sweep nobody needs yet.
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let removed = store.sweep().await;
                        if removed > 0 {
                            tracing::debug!(removed, "swept expired revocation entries");
                        }
                    }
                    _ = shutdown.cancelled() => {
                        tracing::debug!("revocation sweeper stopping");
                        break;
                    }
                }
            }
        })
    }
}

#[async_trait]
impl RevocationStore for InMemoryRevocationStore {
    async fn revoke(&self, token_key: &str, expires_at: i64) -> Result<(), RevocationError> {
        self.revoke_at(token_key, expires_at, Utc::now().timestamp())
            .await;
        Ok(())
    }

    async fn is_revoked(&self, token_key: &str) -> Result<bool, RevocationError> {
        Ok(self.is_revoked_at(token_key, Utc::now().timestamp()).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_700_000_000;

    #[tokio::test]
    async fn revoke_then_is_revoked_round_trip() {
        let store = InMemoryRevocationStore::new();
        store.revoke_at("token-a", NOW + 120, NOW).await;

        assert!(store.is_revoked_at("token-a", NOW).await);
        assert!(store.is_revoked_at("token-a", NOW + 119).await);
    }

    #[tokio::test]
    async fn miss_is_not_revoked_and_not_an_error() {
        let store = InMemoryRevocationStore::new();
        assert!(!store.is_revoked("never-seen").await.unwrap());
    }

    #[tokio::test]
    async fn entry_expires_deterministically_at_horizon() {
        let store = InMemoryRevocationStore::new();
        store.revoke_at("token-a", NOW + 120, NOW).await;

        // At and past the horizon the entry is indistinguishable from
        // "never revoked", even before any sweep runs.
        assert!(!store.is_revoked_at("token-a", NOW + 120).await);
        assert!(!store.is_revoked_at("token-a", NOW + 121).await);
    }

    #[tokio::test]
    async fn revoking_expired_token_is_a_noop() {
        let store = InMemoryRevocationStore::new();
        store.revoke_at("token-a", NOW - 1, NOW).await;
        assert!(!store.is_revoked_at("token-a", NOW).await);
        assert_eq!(store.entries.lock().await.len(), 0);
    }

    #[tokio::test]
    async fn revoke_is_idempotent() {
        let store = InMemoryRevocationStore::new();
        store.revoke_at("token-a", NOW + 120, NOW).await;
        store.revoke_at("token-a", NOW + 120, NOW + 1).await;

        assert!(store.is_revoked_at("token-a", NOW + 2).await);
        assert_eq!(store.entries.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn sweep_removes_only_stale_entries() {
        let store = InMemoryRevocationStore::new();
        store.revoke_at("stale", NOW + 10, NOW).await;
        store.revoke_at("live", NOW + 120, NOW).await;

        let removed = store.sweep_at(NOW + 60).await;
        assert_eq!(removed, 1);
        assert!(!store.is_revoked_at("stale", NOW + 60).await);
        assert!(store.is_revoked_at("live", NOW + 60).await);
    }

    #[tokio::test]
    async fn concurrent_revokes_are_visible_to_readers() {
        let store = Arc::new(InMemoryRevocationStore::new());

        let mut handles = Vec::new();
        for i in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.revoke(&format!("token-{i}"), NOW + 3600).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        for i in 0..16 {
            assert!(store.is_revoked_at(&format!("token-{i}"), NOW).await);
        }
    }

    #[tokio::test]
    async fn sweeper_task_stops_on_cancellation() {
        let store = Arc::new(InMemoryRevocationStore::new());
        let shutdown = CancellationToken::new();
        let handle = InMemoryRevocationStore::spawn_sweeper(
            store,
            Duration::from_secs(3600),
            shutdown.clone(),
        );

        shutdown.cancel();
        handle.await.unwrap();
    }
}
