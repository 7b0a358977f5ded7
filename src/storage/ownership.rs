// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Critiqal

//! Ownership enforcement for mutating operations.
//!
//! Every update or delete of an owned resource passes through these checks.
//! Existence is always settled first: a missing resource is `NotFound` for
//! everyone, and only an existing resource can be `Forbidden`.

use crate::auth::{AuthError, Identity};

use super::{PostRecord, StorageResult, UserRecord};

/// Trait for resources that have an owner.
pub trait OwnedResource {
    /// Get the owner's user ID.
    fn owner_id(&self) -> &str;
}

impl OwnedResource for PostRecord {
    fn owner_id(&self) -> &str {
        &self.owner_id
    }
}

/// A user account is owned by itself.
impl OwnedResource for UserRecord {
    fn owner_id(&self) -> &str {
        &self.id
    }
}

/// Allow the caller only when they are the recorded owner.
///
/// Plain string equality over every pair, empty strings included.
pub fn authorize(identity: &Identity, owner_id: &str) -> Result<(), AuthError> {
    if identity.subject_id == owner_id {
        Ok(())
    } else {
        tracing::warn!(
            subject_id = %identity.subject_id,
            owner_id = %owner_id,
            "Ownership check failed"
        );
        Err(AuthError::Forbidden)
    }
}

/// Trait for enforcing ownership on storage operations.
pub trait OwnershipEnforcer {
    /// Verify that the caller owns this resource.
    ///
    /// # Errors
    /// Returns `AuthError::Forbidden` if the caller doesn't own the resource.
    fn verify_ownership(&self, identity: &Identity) -> Result<(), AuthError>;
}

impl<T: OwnedResource> OwnershipEnforcer for T {
    fn verify_ownership(&self, identity: &Identity) -> Result<(), AuthError> {
        authorize(identity, self.owner_id())
    }
}

/// Extension trait for checking ownership on a store lookup.
pub trait OwnershipCheck<T> {
    /// Verify ownership and return the resource if authorized.
    ///
    /// A lookup failure is reported as-is (`NotFound` for a missing
    /// resource) before ownership is considered.
    fn verify_owner(self, identity: &Identity) -> Result<T, AuthError>;
}

impl<T: OwnedResource> OwnershipCheck<T> for StorageResult<T> {
    fn verify_owner(self, identity: &Identity) -> Result<T, AuthError> {
        let resource = self?;
        resource.verify_ownership(identity)?;
        Ok(resource)
    }
}
