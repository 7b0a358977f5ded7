// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Critiqal

//! Embedded user/post database backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `users`: user_id → serialized UserRecord
//! - `usernames`: username → user_id (uniqueness index, kept after soft delete)
//! - `emails`: email → user_id (uniqueness index, kept after soft delete)
//! - `posts`: post_id → serialized PostRecord

use std::path::Path;

use chrono::Utc;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};

use super::{
    matches_prefix, newest_first, NewPost, NewUser, PostChanges, PostRecord, PostStore,
    StorageError, StorageResult, UserRecord, UserStore,
};

// =============================================================================
// Table Definitions
// =============================================================================

const USERS: TableDefinition<&str, &[u8]> = TableDefinition::new("users");

const USERNAMES: TableDefinition<&str, &str> = TableDefinition::new("usernames");

const EMAILS: TableDefinition<&str, &str> = TableDefinition::new("emails");

const POSTS: TableDefinition<&str, &[u8]> = TableDefinition::new("posts");

/// File name of the database inside `DATA_DIR`.
pub const DATABASE_FILE: &str = "critiqal.redb";

// =============================================================================
// RedbStore
// =============================================================================

/// Durable implementation of both store traits.
pub struct RedbStore {
    db: Database,
}

impl RedbStore {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StorageError::Backend(format!("create {}: {e}", parent.display())))?;
        }
        let db = Database::create(path)?;

        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(USERS)?;
            let _ = write_txn.open_table(USERNAMES)?;
            let _ = write_txn.open_table(EMAILS)?;
            let _ = write_txn.open_table(POSTS)?;
        }
        write_txn.commit()?;

        tracing::info!(path = %path.display(), "Opened redb store");
        Ok(Self { db })
    }

    /// Open the database file inside a data directory.
    pub fn open_in(data_dir: &Path) -> StorageResult<Self> {
        Self::open(&data_dir.join(DATABASE_FILE))
    }

    fn read_user(&self, id: &str) -> StorageResult<Option<UserRecord>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(USERS)?;
        match table.get(id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    fn scan_users(&self) -> StorageResult<Vec<UserRecord>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(USERS)?;
        let mut users = Vec::new();
        for entry in table.iter()? {
            let (_, value) = entry?;
            let user: UserRecord = serde_json::from_slice(value.value())?;
            if !user.is_deleted() {
                users.push(user);
            }
        }
        Ok(users)
    }

    fn scan_posts(&self, keep: impl Fn(&PostRecord) -> bool) -> StorageResult<Vec<PostRecord>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(POSTS)?;
        let mut posts = Vec::new();
        for entry in table.iter()? {
            let (_, value) = entry?;
            let post: PostRecord = serde_json::from_slice(value.value())?;
            if !post.is_deleted() && keep(&post) {
                posts.push(post);
            }
        }
        newest_first(&mut posts);
        Ok(posts)
    }

    /// Read-modify-write a live post inside one write transaction.
    fn modify_post(
        &self,
        id: &str,
        change: impl FnOnce(&mut PostRecord),
    ) -> StorageResult<PostRecord> {
        let write_txn = self.db.begin_write()?;
        let post = {
            let mut table = write_txn.open_table(POSTS)?;

            // Read existing value and deserialize before mutating
            let existing_bytes = match table.get(id)? {
                Some(existing) => existing.value().to_vec(),
                None => return Err(StorageError::NotFound(format!("Post {id}"))),
            };

            let mut post: PostRecord = serde_json::from_slice(&existing_bytes)?;
            if post.is_deleted() {
                return Err(StorageError::NotFound(format!("Post {id}")));
            }
            change(&mut post);

            let json = serde_json::to_vec(&post)?;
            table.insert(id, json.as_slice())?;
            post
        };
        write_txn.commit()?;
        Ok(post)
    }
}

impl UserStore for RedbStore {
    fn create(&self, user: NewUser) -> StorageResult<UserRecord> {
        let record = user.into_record(Utc::now());
        let json = serde_json::to_vec(&record)?;

        let write_txn = self.db.begin_write()?;
        {
            let mut usernames = write_txn.open_table(USERNAMES)?;
            if usernames.get(record.username.as_str())?.is_some() {
                return Err(StorageError::Conflict(format!("Username {}", record.username)));
            }
            let mut emails = write_txn.open_table(EMAILS)?;
            if emails.get(record.email.as_str())?.is_some() {
                return Err(StorageError::Conflict(format!("Email {}", record.email)));
            }

            usernames.insert(record.username.as_str(), record.id.as_str())?;
            emails.insert(record.email.as_str(), record.id.as_str())?;

            let mut users = write_txn.open_table(USERS)?;
            users.insert(record.id.as_str(), json.as_slice())?;
        }
        write_txn.commit()?;
        Ok(record)
    }

    fn get_by_id(&self, id: &str) -> StorageResult<UserRecord> {
        self.read_user(id)?
            .filter(|u| !u.is_deleted())
            .ok_or_else(|| StorageError::NotFound(format!("User {id}")))
    }

    fn get_by_username(&self, username: &str) -> StorageResult<UserRecord> {
        let id = self
            .db
            .begin_read()?
            .open_table(USERNAMES)?
            .get(username)?
            .map(|v| v.value().to_string());

        id.and_then(|id| self.read_user(&id).transpose())
            .transpose()?
            .filter(|u| !u.is_deleted())
            .ok_or_else(|| StorageError::NotFound(format!("User {username}")))
    }

    fn list(&self) -> StorageResult<Vec<UserRecord>> {
        let mut users = self.scan_users()?;
        users.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.username.cmp(&b.username)));
        Ok(users)
    }

    fn search(&self, prefix: &str, limit: usize) -> StorageResult<Vec<UserRecord>> {
        let mut users: Vec<UserRecord> = self
            .scan_users()?
            .into_iter()
            .filter(|u| matches_prefix(&u.username, prefix))
            .collect();
        users.sort_by(|a, b| a.username.cmp(&b.username));
        users.truncate(limit);
        Ok(users)
    }

    fn soft_delete(&self, id: &str) -> StorageResult<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(USERS)?;
            let existing_bytes = match table.get(id)? {
                Some(existing) => existing.value().to_vec(),
                None => return Err(StorageError::NotFound(format!("User {id}"))),
            };

            let mut user: UserRecord = serde_json::from_slice(&existing_bytes)?;
            if user.is_deleted() {
                return Err(StorageError::NotFound(format!("User {id}")));
            }
            user.deleted_at = Some(Utc::now());

            let json = serde_json::to_vec(&user)?;
            table.insert(id, json.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn ping(&self) -> StorageResult<()> {
        let read_txn = self.db.begin_read()?;
        let _ = read_txn.open_table(USERS)?;
        Ok(())
    }
}

impl PostStore for RedbStore {
    fn create(&self, post: NewPost) -> StorageResult<PostRecord> {
        let record = post.into_record(Utc::now());
        let json = serde_json::to_vec(&record)?;

        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(POSTS)?;
            table.insert(record.id.as_str(), json.as_slice())?;
        }
        write_txn.commit()?;
        Ok(record)
    }

    fn get(&self, id: &str) -> StorageResult<PostRecord> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(POSTS)?;
        let post: Option<PostRecord> = match table.get(id)? {
            Some(value) => Some(serde_json::from_slice(value.value())?),
            None => None,
        };

        post.filter(|p| !p.is_deleted())
            .ok_or_else(|| StorageError::NotFound(format!("Post {id}")))
    }

    fn update(&self, id: &str, changes: PostChanges) -> StorageResult<PostRecord> {
        self.modify_post(id, |post| post.apply(changes))
    }

    fn soft_delete(&self, id: &str) -> StorageResult<()> {
        self.modify_post(id, |post| post.deleted_at = Some(Utc::now()))
            .map(|_| ())
    }

    fn list_by_owner(&self, owner_id: &str) -> StorageResult<Vec<PostRecord>> {
        self.scan_posts(|p| p.owner_id == owner_id)
    }

    fn ping(&self) -> StorageResult<()> {
        let read_txn = self.db.begin_read()?;
        let _ = read_txn.open_table(POSTS)?;
        Ok(())
    }

    fn recent(&self, limit: usize) -> StorageResult<Vec<PostRecord>> {
        let mut posts = self.scan_posts(|_| true)?;
        posts.truncate(limit);
        Ok(posts)
    }
}

// =============================================================================
// Tests
// =============================================================================
