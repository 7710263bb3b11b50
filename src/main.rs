// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Twoj Kwadrat

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use kwadrat_auth_gate::api::router;
use kwadrat_auth_gate::config::{Config, RevocationBackend, RATE_WINDOW_SECS};
use kwadrat_auth_gate::rate_limit::RateLimiter;
use kwadrat_auth_gate::revocation::{
    InMemoryRevocationStore, RedisRevocationStore, RevocationStore,
};
use kwadrat_auth_gate::auth::{JwksManager, TokenVerifier};
use kwadrat_auth_gate::state::AppState;
use kwadrat_auth_gate::storage::UserRepository;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug"));

    match std::env::var("LOG_FORMAT").as_deref() {
        Ok("json") => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init(),
        _ => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
}

#[tokio::main]
async fn main() {
    init_tracing();

    let config = Config::from_env().expect("Failed to load configuration");

    // Revocation backend, selected at startup. The sweeper only exists
    // for the in-memory backend; Redis expires entries on its own.
    let shutdown = CancellationToken::new();
    let revocations: Arc<dyn RevocationStore> = match &config.revocation {
        RevocationBackend::Memory {
            sweep_interval_secs,
        } => {
            warn!(
                "in-memory revocation store: revocations are not shared across instances"
            );
            let store = Arc::new(InMemoryRevocationStore::new());
            InMemoryRevocationStore::spawn_sweeper(
                store.clone(),
                Duration::from_secs(*sweep_interval_secs),
                shutdown.clone(),
            );
            store
        }
        backend @ RevocationBackend::Redis { .. } => {
            let url = backend.redis_url().expect("redis backend has a URL");
            let store = RedisRevocationStore::connect(&url)
                .await
                .expect("Failed to connect to Redis revocation store");
            info!(%url, "using Redis revocation store");
            Arc::new(store)
        }
    };

    let verifier = match &config.keycloak {
        Some(kc) => {
            info!(realm = %kc.realm, "verifying tokens against Keycloak JWKS");
            TokenVerifier::new(
                revocations.clone(),
                JwksManager::new(kc.jwks_url()),
                kc.client_id.clone(),
            )
        }
        None => {
            warn!("KEYCLOAK_URL not set: development mode, signatures are NOT verified");
            TokenVerifier::new_development(revocations.clone())
        }
    };

    let users = UserRepository::from_config(&config.database)
        .expect("Failed to create database pool");

    // Stale throttle windows are reclaimed on the same shutdown token
    // as the revocation sweeper.
    let rate_limiter = Arc::new(RateLimiter::new());
    RateLimiter::spawn_sweeper(
        rate_limiter.clone(),
        Duration::from_secs(RATE_WINDOW_SECS as u64),
        shutdown.clone(),
    );

    let state = AppState::new(Arc::new(verifier), revocations, rate_limiter, users);
    let app = router(state, &config.rate_limits);

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .expect("Failed to bind listen address");
    info!(addr = %config.bind, "kwadrat-auth-gate listening (docs at /docs)");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal(shutdown))
    .await
    .expect("HTTP server failed");
}

async fn shutdown_signal(shutdown: CancellationToken) {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    info!("shutdown signal received");
    shutdown.cancel();
}
