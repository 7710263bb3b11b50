// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Twoj Kwadrat

//! Kwadrat Auth Gate - Authentication & Revocation Gateway
//!
//! This crate authenticates and authorizes HTTP requests on behalf of
//! the Kwadrat resource endpoints, using bearer tokens issued by
//! Keycloak. It also supports server-initiated session termination
//! (logout before natural token expiry) and per-client rate limiting
//! on sensitive endpoints.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Token verification and role-based authorization
//! - `revocation` - Revoked-token store (in-memory and Redis backends)
//! - `rate_limit` - Fixed-window per-client request throttling
//! - `storage` - Relational user repository (Keycloak `USER_ENTITY`)

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod rate_limit;
pub mod revocation;
pub mod state;
pub mod storage;
