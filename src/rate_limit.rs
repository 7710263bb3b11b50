// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Twoj Kwadrat

//! Fixed-window per-client rate limiting.
//!
//! One window per `(client key, endpoint)` pair. The first request in
//! a window starts it; requests inside the window increment the
//! counter under the limiter's lock (no lost updates); once the count
//! exceeds the limit the request is rejected with a 429 carrying the
//! `rate_limited` code, distinct from authentication failures so
//! clients back off instead of re-authenticating. When the window has
//! elapsed the next request starts a fresh window with count 1.
//!
//! Windows for clients that never return are reclaimed by a periodic
//! sweep, so the map stays proportional to recently active clients
//! rather than every address ever seen.
//!
//! Probe traffic can be exempted by an upstream layer inserting
//! [`Exempt`] into request extensions; the limiter itself hardcodes no
//! paths.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::config::RATE_WINDOW_SECS;
use crate::error::ApiError;

/// Throttle policy for one endpoint group.
#[derive(Debug, Clone, Copy)]
pub struct RatePolicy {
    /// Endpoint label, part of the window key.
    pub endpoint: &'static str,
    /// Maximum requests per window.
    pub limit: u32,
    /// Window length in seconds.
    pub window_secs: i64,
}

impl RatePolicy {
    pub fn new(endpoint: &'static str, limit: u32) -> Self {
        Self {
            endpoint,
            limit,
            window_secs: RATE_WINDOW_SECS,
        }
    }
}

/// Marker extension exempting a request from throttling.
///
/// Inserted by the caller (e.g. an internal-probe layer), never by the
/// limiter.
#[derive(Debug, Clone, Copy)]
pub struct Exempt;

#[derive(Debug)]
struct Window {
    started_at: i64,
    count: u32,
    window_secs: i64,
}

/// Fixed-window counter store.
#[derive(Default)]
pub struct RateLimiter {
    windows: Mutex<HashMap<(String, &'static str), Window>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a request and decide whether it is within the limit.
    pub async fn allow(&self, client_key: &str, policy: &RatePolicy) -> bool {
        self.allow_at(client_key, policy, Utc::now().timestamp()).await
    }

    async fn allow_at(&self, client_key: &str, policy: &RatePolicy, now: i64) -> bool {
        let mut windows = self.windows.lock().await;
        let window = windows
            .entry((client_key.to_string(), policy.endpoint))
            .or_insert(Window {
                started_at: now,
                count: 0,
                window_secs: policy.window_secs,
            });

        if now - window.started_at >= policy.window_secs {
            window.started_at = now;
            window.count = 0;
        }

        window.count += 1;
        window.count <= policy.limit
    }

    /// Remove windows that elapsed more than one window ago. Returns
    /// the number of entries removed.
    pub async fn sweep(&self) -> usize {
        self.sweep_at(Utc::now().timestamp()).await
    }

    async fn sweep_at(&self, now: i64) -> usize {
        let mut windows = self.windows.lock().await;
        let before = windows.len();
        windows.retain(|_, w| now - w.started_at < 2 * w.window_secs);
        before - windows.len()
    }

    /// Spawn the background sweep task.
    ///
    /// Without it the map grows with every distinct client address
    /// ever seen. Runs until the cancellation token fires.
    pub fn spawn_sweeper(
        limiter: Arc<Self>,
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
                        let removed = limiter.sweep().await;
                        if removed > 0 {
                            tracing::debug!(removed, "swept stale rate limit windows");
                        }
                    }
                    _ = shutdown.cancelled() => {
                        tracing::debug!("rate limit sweeper stopping");
                        break;
                    }
                }
            }
        })
    }
}

/// Per-route middleware state.
#[derive(Clone)]
pub struct RateLimitContext {
    pub limiter: Arc<RateLimiter>,
    pub policy: RatePolicy,
}

/// Derive the throttle key from the caller's network address.
fn client_key(request: &Request) -> String {
    request
        .extensions()
        .get::<ConnectInfo<std::net::SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Axum middleware enforcing a [`RatePolicy`].
///
/// Attach per route group with `middleware::from_fn_with_state`.
pub async fn enforce(
    State(ctx): State<RateLimitContext>,
    request: Request,
    next: Next,
) -> Response {
    if request.extensions().get::<Exempt>().is_some() {
        return next.run(request).await;
    }

    let key = client_key(&request);
    if ctx.limiter.allow(&key, &ctx.policy).await {
        next.run(request).await
    } else {
        tracing::warn!(
            client = %key,
            endpoint = ctx.policy.endpoint,
            limit = ctx.policy.limit,
            "rate limit exceeded"
        );
        ApiError::rate_limited().into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::{middleware, routing::get, Router};
    use tower::ServiceExt;

    const NOW: i64 = 1_700_000_000;

    fn policy(limit: u32) -> RatePolicy {
        RatePolicy::new("test", limit)
    }

    #[tokio::test]
    async fn requests_within_limit_are_allowed() {
        let limiter = RateLimiter::new();
        let policy = policy(10);

        for _ in 0..10 {
            assert!(limiter.allow_at("1.2.3.4", &policy, NOW).await);
        }
    }

    #[tokio::test]
    async fn request_over_limit_is_rejected() {
        let limiter = RateLimiter::new();
        let policy = policy(10);

        for i in 0..11 {
            let allowed = limiter.allow_at("1.2.3.4", &policy, NOW).await;
            if i < 10 {
                assert!(allowed, "request {} should pass", i + 1);
            } else {
                assert!(!allowed, "request 11 should be throttled");
            }
        }
    }

    #[tokio::test]
    async fn window_resets_after_elapsing() {
        let limiter = RateLimiter::new();
        let policy = policy(2);

        assert!(limiter.allow_at("1.2.3.4", &policy, NOW).await);
        assert!(limiter.allow_at("1.2.3.4", &policy, NOW + 1).await);
        assert!(!limiter.allow_at("1.2.3.4", &policy, NOW + 2).await);

        // A full window later the counter starts fresh at 1.
        assert!(limiter.allow_at("1.2.3.4", &policy, NOW + RATE_WINDOW_SECS).await);
    }

    #[tokio::test]
    async fn clients_are_throttled_independently() {
        let limiter = RateLimiter::new();
        let policy = policy(1);

        assert!(limiter.allow_at("1.1.1.1", &policy, NOW).await);
        assert!(!limiter.allow_at("1.1.1.1", &policy, NOW).await);
        assert!(limiter.allow_at("2.2.2.2", &policy, NOW).await);
    }

    #[tokio::test]
    async fn endpoints_are_throttled_independently() {
        let limiter = RateLimiter::new();
        let logout = RatePolicy::new("logout", 1);
        let health = RatePolicy::new("health", 1);

        assert!(limiter.allow_at("1.2.3.4", &logout, NOW).await);
        assert!(!limiter.allow_at("1.2.3.4", &logout, NOW).await);
        assert!(limiter.allow_at("1.2.3.4", &health, NOW).await);
    }

    #[tokio::test]
    async fn sweep_reclaims_stale_windows() {
        let limiter = RateLimiter::new();
        let policy = policy(10);

        for i in 0..1000 {
            assert!(limiter.allow_at(&format!("10.0.{}.{}", i / 256, i % 256), &policy, NOW).await);
        }
        assert_eq!(limiter.windows.lock().await.len(), 1000);

        // A client that keeps coming back stays tracked.
        assert!(limiter.allow_at("10.0.0.0", &policy, NOW + 3 * RATE_WINDOW_SECS).await);

        let removed = limiter.sweep_at(NOW + 3 * RATE_WINDOW_SECS).await;
        assert_eq!(removed, 999);
        assert_eq!(limiter.windows.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn sweep_keeps_live_windows() {
        let limiter = RateLimiter::new();
        let policy = policy(10);

        assert!(limiter.allow_at("1.2.3.4", &policy, NOW).await);

        // Inside the window, and inside the grace window after it.
        assert_eq!(limiter.sweep_at(NOW + RATE_WINDOW_SECS - 1).await, 0);
        assert_eq!(limiter.sweep_at(NOW + 2 * RATE_WINDOW_SECS - 1).await, 0);
        assert_eq!(limiter.sweep_at(NOW + 2 * RATE_WINDOW_SECS).await, 1);
    }

    #[tokio::test]
    async fn sweeper_task_stops_on_cancellation() {
        let limiter = Arc::new(RateLimiter::new());
        let shutdown = CancellationToken::new();
        let handle =
            RateLimiter::spawn_sweeper(limiter, Duration::from_secs(3600), shutdown.clone());

        shutdown.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn middleware_rejects_with_429() {
        let ctx = RateLimitContext {
            limiter: Arc::new(RateLimiter::new()),
            policy: RatePolicy::new("test", 1),
        };
        let app = Router::new()
            .route("/ping", get(|| async { "pong" }))
            .route_layer(middleware::from_fn_with_state(ctx, enforce));

        // Without ConnectInfo every request shares the "unknown" key,
        // which is exactly what the second call should trip over.
        let first = app
            .clone()
            .oneshot(Request::builder().uri("/ping").body(axum::body::Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(first.status(), StatusCode::OK);

        let second = app
            .oneshot(Request::builder().uri("/ping").body(axum::body::Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn exempt_requests_bypass_the_limiter() {
        let ctx = RateLimitContext {
            limiter: Arc::new(RateLimiter::new()),
            policy: RatePolicy::new("test", 1),
        };
        let app = Router::new()
            .route("/ping", get(|| async { "pong" }))
            .route_layer(middleware::from_fn_with_state(ctx, enforce));

        for _ in 0..5 {
            let mut request = Request::builder()
                .uri("/ping")
                .body(axum::body::Body::empty())
                .unwrap();
            request.extensions_mut().insert(Exempt);

            let response = app.clone().oneshot(request).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }
    }
}
