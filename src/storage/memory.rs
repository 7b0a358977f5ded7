// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Critiqal

//! Process-local store. Data is lost on restart.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;

use super::{
    matches_prefix, newest_first, NewPost, NewUser, PostChanges, PostRecord, PostStore,
    StorageError, StorageResult, UserRecord, UserStore,
};

#[derive(Debug, Default)]
struct Tables {
    users: HashMap<String, UserRecord>,
    posts: HashMap<String, PostRecord>,
}

/// In-memory implementation of both store traits.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    // A panicking writer never leaves a half-applied record, so poisoned
    // locks are safe to reuse.
    fn read(&self) -> RwLockReadGuard<'_, Tables> {
        self.tables.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Tables> {
        self.tables.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl UserStore for InMemoryStore {
    fn create(&self, user: NewUser) -> StorageResult<UserRecord> {
        let mut tables = self.write();
        for existing in tables.users.values() {
            if existing.username == user.username {
                return Err(StorageError::Conflict(format!("Username {}", user.username)));
            }
            if existing.email == user.email {
                return Err(StorageError::Conflict(format!("Email {}", user.email)));
            }
        }

        let record = user.into_record(Utc::now());
        tables.users.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    fn get_by_id(&self, id: &str) -> StorageResult<UserRecord> {
        self.read()
            .users
            .get(id)
            .filter(|u| !u.is_deleted())
            .cloned()
            .ok_or_else(|| StorageError::NotFound(format!("User {id}")))
    }

    fn get_by_username(&self, username: &str) -> StorageResult<UserRecord> {
        self.read()
            .users
            .values()
            .find(|u| u.username == username && !u.is_deleted())
            .cloned()
            .ok_or_else(|| StorageError::NotFound(format!("User {username}")))
    }

    fn list(&self) -> StorageResult<Vec<UserRecord>> {
        let mut users: Vec<UserRecord> = self
            .read()
            .users
            .values()
            .filter(|u| !u.is_deleted())
            .cloned()
            .collect();
        users.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.username.cmp(&b.username)));
        Ok(users)
    }

    fn search(&self, prefix: &str, limit: usize) -> StorageResult<Vec<UserRecord>> {
        let mut users: Vec<UserRecord> = self
            .read()
            .users
            .values()
            .filter(|u| !u.is_deleted() && matches_prefix(&u.username, prefix))
            .cloned()
            .collect();
        users.sort_by(|a, b| a.username.cmp(&b.username));
        users.truncate(limit);
        Ok(users)
    }

    fn soft_delete(&self, id: &str) -> StorageResult<()> {
        let mut tables = self.write();
        match tables.users.get_mut(id) {
            Some(user) if !user.is_deleted() => {
                user.deleted_at = Some(Utc::now());
                Ok(())
            }
            _ => Err(StorageError::NotFound(format!("User {id}"))),
        }
    }
}

impl PostStore for InMemoryStore {
    fn create(&self, post: NewPost) -> StorageResult<PostRecord> {
        let record = post.into_record(Utc::now());
        self.write().posts.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    fn get(&self, id: &str) -> StorageResult<PostRecord> {
        self.read()
            .posts
            .get(id)
            .filter(|p| !p.is_deleted())
            .cloned()
            .ok_or_else(|| StorageError::NotFound(format!("Post {id}")))
    }

    fn update(&self, id: &str, changes: PostChanges) -> StorageResult<PostRecord> {
        let mut tables = self.write();
        match tables.posts.get_mut(id) {
            Some(post) if !post.is_deleted() => {
                post.apply(changes);
                Ok(post.clone())
            }
            _ => Err(StorageError::NotFound(format!("Post {id}"))),
        }
    }

    fn soft_delete(&self, id: &str) -> StorageResult<()> {
        let mut tables = self.write();
        match tables.posts.get_mut(id) {
            Some(post) if !post.is_deleted() => {
                post.deleted_at = Some(Utc::now());
                Ok(())
            }
            _ => Err(StorageError::NotFound(format!("Post {id}"))),
        }
    }

    fn list_by_owner(&self, owner_id: &str) -> StorageResult<Vec<PostRecord>> {
        let mut posts: Vec<PostRecord> = self
            .read()
            .posts
            .values()
            .filter(|p| p.owner_id == owner_id && !p.is_deleted())
            .cloned()
            .collect();
        newest_first(&mut posts);
        Ok(posts)
    }

    fn recent(&self, limit: usize) -> StorageResult<Vec<PostRecord>> {
        let mut posts: Vec<PostRecord> = self
            .read()
            .posts
            .values()
            .filter(|p| !p.is_deleted())
            .cloned()
            .collect();
        newest_first(&mut posts);
        posts.truncate(limit);
        Ok(posts)
    }
}
