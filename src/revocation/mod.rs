// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Twoj Kwadrat

//! Revoked-token store.
//!
//! Logout records the presented token here until its natural expiry;
//! the verifier consults the store before any signature work. Two
//! interchangeable backends exist:
//!
//! - [`InMemoryRevocationStore`] - a single-instance map with a
//!   periodic sweep. Revocations are **not** visible across instances
//!   serving the same audience; that is a documented constraint of the
//!   backend, not something worked around silently.
//! - [`RedisRevocationStore`] - a shared Redis store using native
//!   per-key TTL, immediately visible to every instance.
//!
//! Both satisfy the same property: an entry at or past its
//! `expires_at` is indistinguishable from "never revoked".

pub mod memory;
pub mod redis;

pub use memory::InMemoryRevocationStore;
pub use redis::RedisRevocationStore;

use async_trait::async_trait;

/// Revocation store failure.
///
/// A lookup miss is `Ok(false)`, never an error; this type only covers
/// a backend that cannot answer at all.
#[derive(Debug, thiserror::Error)]
pub enum RevocationError {
    #[error("revocation backend unavailable: {0}")]
    Unavailable(String),
}

/// Records and queries revoked tokens.
///
/// The store is the single source of truth for "is this token,
/// presented right now, considered invalid". `revoke` followed by
/// `is_revoked` for the same key returns `true` once the write
/// completes, from any caller. Revoking an already-revoked or
/// already-expired token is a harmless no-op, which is what makes
/// logout idempotent.
#[async_trait]
pub trait RevocationStore: Send + Sync {
    /// Record `token_key` as revoked until `expires_at` (epoch
    /// seconds). A horizon at or before now is a no-op: the token is
    /// already rejected by expiry checks alone.
    async fn revoke(&self, token_key: &str, expires_at: i64) -> Result<(), RevocationError>;

    /// Whether `token_key` is currently revoked.
    async fn is_revoked(&self, token_key: &str) -> Result<bool, RevocationError>;
}
