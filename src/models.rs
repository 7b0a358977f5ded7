// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Critiqal

//! # API Data Models
//!
//! Request and response bodies for the REST API. All types derive
//! `Serialize`/`Deserialize` and `ToSchema` for JSON handling and OpenAPI
//! documentation.
//!
//! ## Model Categories
//!
//! - **Auth**: sign-up, sign-in, refresh and sign-out bodies
//! - **Users**: the public profile (never carries the password digest)
//! - **Posts**: create/update bodies and the post view

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::storage::{PostRecord, UserRecord};

/// Default page size for recent posts.
pub const DEFAULT_RECENT_LIMIT: usize = 50;

/// Largest page size for recent posts.
pub const MAX_RECENT_LIMIT: usize = 100;

// =============================================================================
// Auth Models
// =============================================================================

/// Request to create an account.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

/// Request to sign in.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Optional body for clients that do not send cookies.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct RefreshRequest {
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// Returned by sign-up and sign-in.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthResponse {
    pub user: PublicUser,
    /// Access token
    pub token: String,
    pub refresh_token: String,
}

/// Returned by refresh.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RefreshResponse {
    /// New access token
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SignOutResponse {
    pub success: bool,
}

// =============================================================================
// User Models
// =============================================================================

/// A user as seen by API clients.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct PublicUser {
    pub id: String,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub photo_url: String,
    pub created_at: DateTime<Utc>,
}

impl From<&UserRecord> for PublicUser {
    fn from(user: &UserRecord) -> Self {
        Self {
            id: user.id.clone(),
            username: user.username.clone(),
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            photo_url: user.photo_url.clone(),
            created_at: user.created_at,
        }
    }
}

// =============================================================================
// Post Models
// =============================================================================

/// Request to create a post. The owner is always the caller.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreatePostRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub photo_url: Option<String>,
    pub description: String,
}

/// Partial post update; omitted fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdatePostRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub photo_url: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct PostResponse {
    pub id: String,
    pub owner_id: String,
    pub title: Option<String>,
    pub photo_url: Option<String>,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

impl From<PostRecord> for PostResponse {
    fn from(post: PostRecord) -> Self {
        Self {
            id: post.id,
            owner_id: post.owner_id,
            title: post.title,
            photo_url: post.photo_url,
            description: post.description,
            created_at: post.created_at,
        }
    }
}

/// Query parameters for recent posts.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RecentQuery {
    /// Page size (default 50, max 100)
    pub limit: Option<i64>,
}

impl RecentQuery {
    /// Missing or non-positive limits fall back to the default; large ones
    /// are capped.
    pub fn effective_limit(&self) -> usize {
        match self.limit {
            Some(limit) if limit > 0 => (limit as usize).min(MAX_RECENT_LIMIT),
            _ => DEFAULT_RECENT_LIMIT,
        }
    }
}
