// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Critiqal

use std::sync::Arc;

use crate::auth::{Argon2Hasher, AuthService, CredentialHasher, SessionIssuer};
use crate::storage::{InMemoryStore, PostStore, UserStore};

#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserStore>,
    pub posts: Arc<dyn PostStore>,
    pub sessions: SessionIssuer,
    pub auth: AuthService,
}

impl AppState {
    pub fn new(
        users: Arc<dyn UserStore>,
        posts: Arc<dyn PostStore>,
        hasher: Arc<dyn CredentialHasher>,
        sessions: SessionIssuer,
    ) -> Self {
        let auth = AuthService::new(users.clone(), hasher, sessions.clone());
        Self {
            users,
            posts,
            sessions,
            auth,
        }
    }

    /// State backed by one store serving both users and posts.
    pub fn with_store<S>(store: Arc<S>, sessions: SessionIssuer) -> Self
    where
        S: UserStore + PostStore + 'static,
    {
        Self::new(
            store.clone(),
            store,
            Arc::new(Argon2Hasher::default()),
            sessions,
        )
    }

    /// State backed by a fresh in-memory store.
    pub fn in_memory(sessions: SessionIssuer) -> Self {
        Self::with_store(Arc::new(InMemoryStore::new()), sessions)
    }
}
