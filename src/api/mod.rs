// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Twoj Kwadrat

//! HTTP API: routing and OpenAPI documentation.
//!
//! Every protected request passes rate limiting, then token
//! verification (which consults the revocation store before any
//! signature work), then role gates, then the handler. Logout passes
//! rate limiting and goes straight to the revocation store.

use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::RateLimitConfig;
use crate::models::UserRecord;
use crate::rate_limit::{self, RateLimitContext, RateLimiter, RatePolicy};
use crate::state::AppState;

pub mod health;
pub mod logout;
pub mod users;

fn throttled(limiter: &Arc<RateLimiter>, policy: RatePolicy) -> RateLimitContext {
    RateLimitContext {
        limiter: limiter.clone(),
        policy,
    }
}

pub fn router(state: AppState, limits: &RateLimitConfig) -> Router {
    let limiter = &state.rate_limiter;

    let health_routes = Router::new()
        .route("/health", get(health::health))
        .route_layer(middleware::from_fn_with_state(
            throttled(limiter, limits.health),
            rate_limit::enforce,
        ));

    let logout_routes = Router::new()
        .route("/logout", post(logout::logout))
        .route_layer(middleware::from_fn_with_state(
            throttled(limiter, limits.logout),
            rate_limit::enforce,
        ));

    let user_routes = Router::new()
        .route("/users", get(users::list_users))
        .route("/users/{user_id}", get(users::get_user))
        .route_layer(middleware::from_fn_with_state(
            throttled(limiter, limits.users),
            rate_limit::enforce,
        ));

    Router::new()
        .merge(health_routes)
        .merge(logout_routes)
        .merge(user_routes)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        logout::logout,
        users::list_users,
        users::get_user
    ),
    components(
        schemas(
            health::HealthResponse,
            logout::LogoutResponse,
            UserRecord
        )
    ),
    tags(
        (name = "Health", description = "Service liveness"),
        (name = "Session", description = "Session termination (token revocation)"),
        (name = "Users", description = "Realm user records")
    )
)]
struct ApiDoc;
