// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Critiqal

//! Axum extractor for the authenticated caller.
//!
//! Use the `Auth` extractor in handlers that need the caller identity:
//!
//! ```rust,ignore
//! async fn my_handler(Auth(identity): Auth) -> impl IntoResponse {
//!     // identity.subject_id is the caller's user ID
//! }
//! ```

use axum::{extract::FromRequestParts, http::request::Parts};

use super::middleware::resolve_identity;
use super::{AuthError, Identity};
use crate::state::AppState;

/// Extractor for the authenticated caller.
///
/// Prefers the identity published by the `require_identity` middleware and
/// resolves the request headers itself when the route is not layered.
pub struct Auth(pub Identity);

impl FromRequestParts<AppState> for Auth {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if let Some(identity) = parts.extensions.get::<Identity>().cloned() {
            return Ok(Auth(identity));
        }

        let identity = resolve_identity(&parts.headers, state.sessions.codec())?;
        Ok(Auth(identity))
    }
}
