// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Critiqal

//! Session token claims and the caller identity derived from them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// The role a session token plays.
///
/// Access tokens authenticate ordinary requests; refresh tokens are only
/// accepted by the refresh flow. A token of one kind is never accepted in
/// place of the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    /// Short-lived credential for ordinary requests
    Access,
    /// Long-lived credential used only to mint new access tokens
    Refresh,
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenKind::Access => write!(f, "access"),
            TokenKind::Refresh => write!(f, "refresh"),
        }
    }
}

/// Claims carried inside a signed session token.
///
/// Wire names follow the JWT payload the web client already understands:
/// `user_id`, `username`, `type` and `exp` (unix seconds). Every field is
/// required; a payload missing any of them fails to decode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject (store-assigned user ID)
    #[serde(rename = "user_id")]
    pub subject_id: String,

    /// Username at the time of issuance
    pub username: String,

    /// Token kind
    #[serde(rename = "type")]
    pub kind: TokenKind,

    /// Absolute expiry (unix seconds)
    #[serde(rename = "exp")]
    pub expires_at: i64,
}

impl SessionClaims {
    /// Build claims of the given kind for an identity.
    ///
    /// Sub-second precision of `expires_at` is truncated.
    pub fn new(identity: &Identity, kind: TokenKind, expires_at: DateTime<Utc>) -> Self {
        Self {
            subject_id: identity.subject_id.clone(),
            username: identity.username.clone(),
            kind,
            expires_at: expires_at.timestamp(),
        }
    }

    /// A token is only live while `expires_at` is strictly in the future.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now.timestamp()
    }

    /// Expiry as a timestamp.
    pub fn expiry(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.expires_at, 0).unwrap_or_default()
    }

    /// Both identity claims must carry a value.
    pub fn has_identity(&self) -> bool {
        !self.subject_id.is_empty() && !self.username.is_empty()
    }
}

/// The authenticated principal making a request.
///
/// Reconstructed from a verified access token on every request and
/// published into the request extensions by the identity middleware.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Identity {
    /// Canonical user ID
    pub subject_id: String,
    /// Username carried by the token
    pub username: String,
}

impl Identity {
    pub fn new(subject_id: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            subject_id: subject_id.into(),
            username: username.into(),
        }
    }
}

impl From<&SessionClaims> for Identity {
    fn from(claims: &SessionClaims) -> Self {
        Self {
            subject_id: claims.subject_id.clone(),
            username: claims.username.clone(),
        }
    }
}
