// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded identity database backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `identities`: auth_id → serialized IdentityRecord (JSON bytes)
//!
//! The table key is the subject identifier, so a second record for the same
//! subject cannot exist. Inserts check and write inside one write
//! transaction; redb runs write transactions one at a time.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};

use super::{IdentityStore, StoreError, StoreResult};
use crate::models::IdentityRecord;

/// File name of the database inside `DATA_DIR`.
pub const IDENTITY_DB_FILE: &str = "identities.redb";

/// Primary table: auth_id → serialized IdentityRecord.
const IDENTITIES: TableDefinition<&str, &[u8]> = TableDefinition::new("identities");

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum IdentityDbError {
    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type IdentityDbResult<T> = Result<T, IdentityDbError>;

impl From<IdentityDbError> for StoreError {
    fn from(e: IdentityDbError) -> Self {
        StoreError::Backend(e.to_string())
    }
}

// =============================================================================
// IdentityDatabase
// =============================================================================

/// Embedded ACID identity store.
#[derive(Clone)]
pub struct IdentityDatabase {
    db: Arc<Database>,
}

impl IdentityDatabase {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> IdentityDbResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(path)?;

        // Pre-create the table so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(IDENTITIES)?;
        }
        write_txn.commit()?;

        tracing::info!(target: "storage.identity_db", path = %path.display(), "Identity database opened");
        Ok(Self { db: Arc::new(db) })
    }

    /// Open `identities.redb` inside `dir`.
    pub fn open_in_dir(dir: &Path) -> IdentityDbResult<Self> {
        Self::open(&dir.join(IDENTITY_DB_FILE))
    }

    async fn run_blocking<T, F>(&self, op: F) -> StoreResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Database) -> IdentityDbResult<T> + Send + 'static,
    {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || op(&db))
            .await
            .map_err(|e| StoreError::Backend(format!("storage task failed: {e}")))?
            .map_err(StoreError::from)
    }
}

/// Look up a single record by auth_id.
fn get_record(db: &Database, auth_id: &str) -> IdentityDbResult<Option<IdentityRecord>> {
    let read_txn = db.begin_read()?;
    let table = read_txn.open_table(IDENTITIES)?;
    match table.get(auth_id)? {
        Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
        None => Ok(None),
    }
}

/// Insert unless the key exists. Returns whether the record was written.
fn insert_record(db: &Database, record: &IdentityRecord) -> IdentityDbResult<bool> {
    let json = serde_json::to_vec(record)?;

    let write_txn = db.begin_write()?;
    let inserted = {
        let mut table = write_txn.open_table(IDENTITIES)?;
        let exists = table.get(record.auth_id.as_str())?.is_some();
        if !exists {
            table.insert(record.auth_id.as_str(), json.as_slice())?;
        }
        !exists
    };

    if inserted {
        write_txn.commit()?;
    } else {
        write_txn.abort()?;
    }
    Ok(inserted)
}

#[async_trait]
impl IdentityStore for IdentityDatabase {
    async fn find_by_auth_id(&self, auth_id: &str) -> StoreResult<Option<IdentityRecord>> {
        let auth_id = auth_id.to_string();
        self.run_blocking(move |db| get_record(db, &auth_id)).await
    }

    async fn create(&self, record: IdentityRecord) -> StoreResult<IdentityRecord> {
        let (inserted, record) = self
            .run_blocking(move |db| insert_record(db, &record).map(|inserted| (inserted, record)))
            .await?;

        if !inserted {
            return Err(StoreError::DuplicateKey(record.auth_id));
        }
        Ok(record)
    }

    async fn health_check(&self) -> StoreResult<()> {
        self.run_blocking(|db| {
            let read_txn = db.begin_read()?;
            let _ = read_txn.open_table(IDENTITIES)?;
            Ok(())
        })
        .await
    }

    fn backend(&self) -> &'static str {
        "redb"
    }
}
