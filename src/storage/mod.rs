// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Twoj Kwadrat

//! Relational storage.
//!
//! The gate reads user records straight out of Keycloak's own MySQL
//! schema (`USER_ENTITY`). This module is a thin query/row-mapping
//! layer; the database itself is an external collaborator.

pub mod users;

pub use users::UserRepository;
