// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Critiqal

//! Critiqal - session authentication and ownership-gated posts
//!
//! This crate provides the Critiqal API server: username/password accounts,
//! signed access/refresh session tokens delivered as HttpOnly cookies, an
//! identity middleware for protected routes, and owner-only mutation of
//! posts and profiles.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Token codec, session issuance, identity middleware, auth flows
//! - `config` - Environment configuration
//! - `storage` - User/post stores (in-memory or redb) and ownership checks

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod state;
pub mod storage;

#[cfg(test)]
pub(crate) mod test_utils;
