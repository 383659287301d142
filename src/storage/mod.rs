// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Identity Storage
//!
//! Persistence for [`IdentityRecord`]s behind the [`IdentityStore`] trait.
//!
//! ## Uniqueness
//!
//! Every implementation keys records by `auth_id` and refuses a second
//! record for the same `auth_id` with [`StoreError::DuplicateKey`]. Identity
//! resolution relies on this instead of locking across requests.
//!
//! ## Implementations
//!
//! - [`MemoryIdentityStore`] - process-local map, used when no `DATA_DIR` is set
//! - [`IdentityDatabase`] - embedded redb database under `DATA_DIR`

use async_trait::async_trait;
use thiserror::Error;

use crate::models::IdentityRecord;

pub mod identity_db;
pub mod memory;

pub use identity_db::IdentityDatabase;
pub use memory::MemoryIdentityStore;

/// Error type for identity storage operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// A record with this `auth_id` already exists
    #[error("identity '{0}' already exists")]
    DuplicateKey(String),

    /// Storage backend failure
    #[error("storage backend error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Abstract identity persistence.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Look up a record by subject identifier.
    async fn find_by_auth_id(&self, auth_id: &str) -> StoreResult<Option<IdentityRecord>>;

    /// Insert a new record. Fails with [`StoreError::DuplicateKey`] when the
    /// `auth_id` is taken.
    async fn create(&self, record: IdentityRecord) -> StoreResult<IdentityRecord>;

    /// Verify the backend can serve requests.
    async fn health_check(&self) -> StoreResult<()> {
        Ok(())
    }

    /// Short backend name for logs and health output.
    fn backend(&self) -> &'static str;
}
