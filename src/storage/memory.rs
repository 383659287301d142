// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-memory identity store.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{IdentityStore, StoreError, StoreResult};
use crate::models::IdentityRecord;

/// Identity records held in a process-local map keyed by `auth_id`.
#[derive(Default)]
pub struct MemoryIdentityStore {
    records: RwLock<HashMap<String, IdentityRecord>>,
}

impl MemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl IdentityStore for MemoryIdentityStore {
    async fn find_by_auth_id(&self, auth_id: &str) -> StoreResult<Option<IdentityRecord>> {
        Ok(self.records.read().await.get(auth_id).cloned())
    }

    async fn create(&self, record: IdentityRecord) -> StoreResult<IdentityRecord> {
        let mut records = self.records.write().await;
        match records.entry(record.auth_id.clone()) {
            Entry::Occupied(_) => Err(StoreError::DuplicateKey(record.auth_id)),
            Entry::Vacant(slot) => Ok(slot.insert(record).clone()),
        }
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
