// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Critiqal

//! # Storage Module
//!
//! User and post persistence behind two synchronous traits, [`UserStore`]
//! and [`PostStore`]. Two backends implement both:
//!
//! - [`InMemoryStore`]: process-local maps, the default
//! - [`RedbStore`]: embedded redb database under `DATA_DIR`
//!
//! ## Rules every backend follows
//!
//! - IDs are store-assigned UUID v4 strings
//! - Deletes are soft: `deleted_at` is stamped and the row is hidden from
//!   every lookup and listing
//! - Usernames and emails stay reserved after a soft delete
//! - Listings of posts are newest first

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod database;
pub mod memory;
pub mod ownership;

pub use database::RedbStore;
pub use memory::InMemoryStore;
pub use ownership::{authorize, OwnedResource, OwnershipCheck, OwnershipEnforcer};

/// Error type for store operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StorageError {
    /// Entity not found (or soft-deleted)
    #[error("{0} not found")]
    NotFound(String),
    /// Uniqueness violation
    #[error("{0} already exists")]
    Conflict(String),
    /// Backend failure (database, serialization)
    #[error("storage backend error: {0}")]
    Backend(String),
}

macro_rules! backend_error {
    ($($source:ty),* $(,)?) => {
        $(
            impl From<$source> for StorageError {
                fn from(e: $source) -> Self {
                    StorageError::Backend(e.to_string())
                }
            }
        )*
    };
}

backend_error!(
    redb::Error,
    redb::DatabaseError,
    redb::TransactionError,
    redb::TableError,
    redb::StorageError,
    redb::CommitError,
    serde_json::Error,
);

/// Result type for store operations.
pub type StorageResult<T> = Result<T, StorageError>;

// =============================================================================
// Records
// =============================================================================

/// A stored user account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: String,
    pub username: String,
    pub email: String,
    /// PHC-format password digest; never leaves the server
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub photo_url: String,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl UserRecord {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Fields supplied when creating a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
}

impl NewUser {
    pub(crate) fn into_record(self, now: DateTime<Utc>) -> UserRecord {
        UserRecord {
            id: uuid::Uuid::new_v4().to_string(),
            username: self.username,
            email: self.email,
            password_hash: self.password_hash,
            first_name: self.first_name,
            last_name: self.last_name,
            photo_url: String::new(),
            created_at: now,
            deleted_at: None,
        }
    }
}

/// A stored post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostRecord {
    pub id: String,
    pub owner_id: String,
    pub title: Option<String>,
    pub photo_url: Option<String>,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl PostRecord {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    pub(crate) fn apply(&mut self, changes: PostChanges) {
        if let Some(title) = changes.title {
            self.title = Some(title);
        }
        if let Some(photo_url) = changes.photo_url {
            self.photo_url = Some(photo_url);
        }
        if let Some(description) = changes.description.filter(|d| !d.is_empty()) {
            self.description = description;
        }
    }
}

/// Fields supplied when creating a post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPost {
    pub owner_id: String,
    pub title: Option<String>,
    pub photo_url: Option<String>,
    pub description: String,
}

impl NewPost {
    pub(crate) fn into_record(self, now: DateTime<Utc>) -> PostRecord {
        PostRecord {
            id: uuid::Uuid::new_v4().to_string(),
            owner_id: self.owner_id,
            title: self.title,
            photo_url: self.photo_url,
            description: self.description,
            created_at: now,
            deleted_at: None,
        }
    }
}

/// Partial post update. `None` (or an empty description) leaves the field
/// unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostChanges {
    pub title: Option<String>,
    pub photo_url: Option<String>,
    pub description: Option<String>,
}

// =============================================================================
// Store traits
// =============================================================================

/// User account persistence.
pub trait UserStore: Send + Sync {
    /// Create a user. Username and email must both be unused.
    fn create(&self, user: NewUser) -> StorageResult<UserRecord>;

    fn get_by_id(&self, id: &str) -> StorageResult<UserRecord>;

    fn get_by_username(&self, username: &str) -> StorageResult<UserRecord>;

    /// All live users, oldest first.
    fn list(&self) -> StorageResult<Vec<UserRecord>>;

    /// Live users whose username starts with `prefix` (case-insensitive).
    fn search(&self, prefix: &str, limit: usize) -> StorageResult<Vec<UserRecord>>;

    fn soft_delete(&self, id: &str) -> StorageResult<()>;

    /// Readiness probe.
    fn ping(&self) -> StorageResult<()> {
        Ok(())
    }
}

/// Post persistence.
pub trait PostStore: Send + Sync {
    fn create(&self, post: NewPost) -> StorageResult<PostRecord>;

    fn get(&self, id: &str) -> StorageResult<PostRecord>;

    /// Apply `changes` to a live post and return the updated record.
    fn update(&self, id: &str, changes: PostChanges) -> StorageResult<PostRecord>;

    fn soft_delete(&self, id: &str) -> StorageResult<()>;

    /// Live posts owned by `owner_id`, newest first.
    fn list_by_owner(&self, owner_id: &str) -> StorageResult<Vec<PostRecord>>;

    /// The `limit` newest live posts.
    fn recent(&self, limit: usize) -> StorageResult<Vec<PostRecord>>;

    /// Readiness probe.
    fn ping(&self) -> StorageResult<()> {
        Ok(())
    }
}

/// Case-insensitive username prefix match.
pub(crate) fn matches_prefix(username: &str, prefix: &str) -> bool {
    username.to_lowercase().starts_with(&prefix.to_lowercase())
}

/// Sort posts newest first, breaking ties by ID for a stable order.
pub(crate) fn newest_first(posts: &mut [PostRecord]) {
    posts.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
}
