// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Critiqal

//! Shared fixtures for unit tests.

use std::sync::Arc;

use crate::auth::{
    Argon2Hasher, Argon2Params, CookiePolicy, Identity, SessionIssuer, TokenCodec,
};
use crate::state::AppState;
use crate::storage::InMemoryStore;

pub const TEST_SECRET: &str = "critiqal-test-secret";

/// Argon2 with minimal cost so tests stay fast.
pub fn test_hasher() -> Argon2Hasher {
    Argon2Hasher::new(Argon2Params {
        memory_kib: 1024,
        iterations: 1,
        parallelism: 1,
    })
}

pub fn test_issuer() -> SessionIssuer {
    SessionIssuer::new(
        TokenCodec::new(TEST_SECRET).expect("test secret is non-empty"),
        CookiePolicy::default(),
    )
}

pub fn test_state() -> AppState {
    let store = Arc::new(InMemoryStore::new());
    AppState::new(
        store.clone(),
        store,
        Arc::new(test_hasher()),
        test_issuer(),
    )
}

/// `Authorization` header value for a fresh access token.
pub fn bearer(state: &AppState, identity: &Identity) -> String {
    let pair = state.sessions.issue(identity).expect("issue test session");
    format!("Bearer {}", pair.access.token)
}
