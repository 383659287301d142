// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Find-or-create of local identity records from verified claims.

use std::sync::Arc;

use chrono::Utc;
use tracing::instrument;
use uuid::Uuid;

use super::provider::{ProviderAllowList, SubjectId};
use crate::auth::{AuthError, Role, VerifiedClaims};
use crate::models::IdentityRecord;
use crate::storage::{IdentityStore, StoreError};

/// Maps verified subjects to local identity records.
///
/// There is no lock across requests. Two first logins for the same subject
/// may both try to create; the store keeps one and the loser re-reads it.
pub struct IdentityResolver {
    store: Arc<dyn IdentityStore>,
    providers: ProviderAllowList,
}

impl IdentityResolver {
    pub fn new(store: Arc<dyn IdentityStore>, providers: ProviderAllowList) -> Self {
        Self { store, providers }
    }

    /// Return the record for the claims' subject, creating it on first sight.
    ///
    /// Existing records are returned unchanged, whatever the current
    /// allow-list says. Only creation checks the provider.
    #[instrument(skip_all, fields(sub = %claims.subject()))]
    pub async fn resolve(&self, claims: &VerifiedClaims) -> Result<IdentityRecord, AuthError> {
        let auth_id = claims.subject();

        if let Some(existing) = self.store.find_by_auth_id(auth_id).await? {
            tracing::debug!(target: "identity.resolve", id = %existing.id, "Existing identity");
            return Ok(existing);
        }

        let record = self.new_record(claims)?;
        match self.store.create(record).await {
            Ok(created) => {
                tracing::info!(
                    target: "identity.resolve",
                    id = %created.id,
                    backend = self.store.backend(),
                    "Identity created"
                );
                Ok(created)
            }
            Err(StoreError::DuplicateKey(_)) => {
                tracing::debug!(target: "identity.resolve", "Lost creation race, re-reading");
                self.store.find_by_auth_id(auth_id).await?.ok_or_else(|| {
                    AuthError::PersistenceFailure(StoreError::Backend(format!(
                        "identity '{auth_id}' reported as duplicate but not found"
                    )))
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    fn new_record(&self, claims: &VerifiedClaims) -> Result<IdentityRecord, AuthError> {
        let raw = claims.subject();
        let subject = SubjectId::parse(raw).map_err(|e| AuthError::UnsupportedProvider {
            provider: e.provider_segment().to_string(),
            subject: raw.to_string(),
        })?;

        if !self.providers.contains(subject.provider()) {
            tracing::warn!(
                target: "identity.resolve",
                provider = %subject.provider(),
                "Identity provider not allowed"
            );
            return Err(AuthError::UnsupportedProvider {
                provider: subject.provider().to_string(),
                subject: raw.to_string(),
            });
        }

        let alias = claims
            .nickname()
            .filter(|nickname| !nickname.trim().is_empty())
            .unwrap_or_else(|| subject.local_id());

        Ok(IdentityRecord {
            id: Uuid::new_v4(),
            auth_id: raw.to_string(),
            alias: alias.to_string(),
            email: claims.email().unwrap_or_default().to_string(),
            email_verified: claims.email_verified(),
            role: Role::default(),
            session_token: None,
            created_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::IdTokenClaims;
    use crate::storage::{MemoryIdentityStore, StoreResult};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn claims(sub: &str, nickname: Option<&str>) -> VerifiedClaims {
        VerifiedClaims::new(IdTokenClaims {
            sub: sub.to_string(),
            exp: Utc::now().timestamp() + 3600,
            iss: None,
            aud: None,
            iat: None,
            nbf: None,
            nickname: nickname.map(str::to_string),
            email: Some("a@x.com".to_string()),
            email_verified: true,
        })
    }

    fn resolver() -> (IdentityResolver, Arc<MemoryIdentityStore>) {
        let store = Arc::new(MemoryIdentityStore::new());
        (
            IdentityResolver::new(store.clone(), ProviderAllowList::default()),
            store,
        )
    }

    #[tokio::test]
    async fn creates_record_on_first_sight() {
        let (resolver, store) = resolver();

        let record = resolver.resolve(&claims("github|42", Some("ada"))).await.unwrap();
        assert_eq!(record.auth_id, "github|42");
        assert_eq!(record.alias, "ada");
        assert_eq!(record.email, "a@x.com");
        assert!(record.email_verified);
        assert_eq!(record.role, Role::Unassigned);
        assert!(record.session_token.is_none());
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn returns_existing_record_unchanged() {
        let (resolver, store) = resolver();
        let first = resolver.resolve(&claims("github|42", Some("ada"))).await.unwrap();

        let second = resolver
            .resolve(&claims("github|42", Some("renamed")))
            .await
            .unwrap();
        assert_eq!(second, first);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn alias_falls_back_to_local_id() {
        let (resolver, _store) = resolver();
        let record = resolver.resolve(&claims("auth0|abc123", None)).await.unwrap();
        assert_eq!(record.alias, "abc123");

        let record = resolver.resolve(&claims("github|7", Some("  "))).await.unwrap();
        assert_eq!(record.alias, "7");
    }

    #[tokio::test]
    async fn unlisted_provider_creates_nothing() {
        let (resolver, store) = resolver();

        let err = resolver
            .resolve(&claims("twitter|42", Some("ada")))
            .await
            .unwrap_err();
        match err {
            AuthError::UnsupportedProvider { provider, subject } => {
                assert_eq!(provider, "twitter");
                assert_eq!(subject, "twitter|42");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn subject_without_provider_is_unsupported() {
        let (resolver, store) = resolver();

        for sub in ["no-separator", "|42", "github|"] {
            let err = resolver.resolve(&claims(sub, Some("ada"))).await.unwrap_err();
            assert!(
                matches!(err, AuthError::UnsupportedProvider { .. }),
                "{sub}: {err:?}"
            );
        }
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn existing_record_skips_provider_check() {
        let store = Arc::new(MemoryIdentityStore::new());
        let permissive = IdentityResolver::new(
            store.clone(),
            "github,auth0,twitter".parse().unwrap(),
        );
        let created = permissive
            .resolve(&claims("twitter|42", Some("ada")))
            .await
            .unwrap();

        let strict = IdentityResolver::new(store, ProviderAllowList::default());
        let found = strict.resolve(&claims("twitter|42", Some("ada"))).await.unwrap();
        assert_eq!(found.id, created.id);
    }

    #[tokio::test]
    async fn concurrent_first_logins_share_one_record() {
        let (resolver, store) = resolver();
        let resolver = Arc::new(resolver);

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let resolver = resolver.clone();
                tokio::spawn(async move {
                    resolver.resolve(&claims("github|42", Some("ada"))).await
                })
            })
            .collect();

        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.await.unwrap().unwrap().id);
        }
        ids.dedup();
        assert_eq!(ids.len(), 1);
        assert_eq!(store.len().await, 1);
    }

    /// Hides the record from the first lookup, as if another request
    /// created it between our find and create.
    struct RacingStore {
        inner: MemoryIdentityStore,
        finds: AtomicUsize,
        hide_after_duplicate: bool,
    }

    #[async_trait]
    impl IdentityStore for RacingStore {
        async fn find_by_auth_id(&self, auth_id: &str) -> StoreResult<Option<IdentityRecord>> {
            let call = self.finds.fetch_add(1, Ordering::SeqCst);
            if call == 0 || self.hide_after_duplicate {
                return Ok(None);
            }
            self.inner.find_by_auth_id(auth_id).await
        }

        async fn create(&self, record: IdentityRecord) -> StoreResult<IdentityRecord> {
            self.inner.create(record).await
        }

        fn backend(&self) -> &'static str {
            "racing"
        }
    }

    async fn racing_store(hide_after_duplicate: bool) -> (Arc<RacingStore>, IdentityRecord) {
        let inner = MemoryIdentityStore::new();
        let winner = IdentityResolver::new(Arc::new(MemoryIdentityStore::new()), Default::default())
            .new_record(&claims("github|42", Some("winner")))
            .unwrap();
        let winner = inner.create(winner).await.unwrap();
        let store = Arc::new(RacingStore {
            inner,
            finds: AtomicUsize::new(0),
            hide_after_duplicate,
        });
        (store, winner)
    }

    #[tokio::test]
    async fn duplicate_on_create_returns_existing_record() {
        let (store, winner) = racing_store(false).await;
        let resolver = IdentityResolver::new(store.clone(), ProviderAllowList::default());

        let resolved = resolver.resolve(&claims("github|42", Some("loser"))).await.unwrap();
        assert_eq!(resolved, winner);
        assert_eq!(store.finds.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn duplicate_without_record_is_persistence_failure() {
        let (store, _winner) = racing_store(true).await;
        let resolver = IdentityResolver::new(store, ProviderAllowList::default());

        let err = resolver
            .resolve(&claims("github|42", Some("loser")))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::PersistenceFailure(_)));
    }

    struct BrokenStore;

    #[async_trait]
    impl IdentityStore for BrokenStore {
        async fn find_by_auth_id(&self, _auth_id: &str) -> StoreResult<Option<IdentityRecord>> {
            Err(StoreError::Backend("disk on fire".into()))
        }

        async fn create(&self, _record: IdentityRecord) -> StoreResult<IdentityRecord> {
            Err(StoreError::Backend("disk on fire".into()))
        }

        fn backend(&self) -> &'static str {
            "broken"
        }
    }

    #[tokio::test]
    async fn store_failure_is_persistence_failure() {
        let resolver = IdentityResolver::new(Arc::new(BrokenStore), ProviderAllowList::default());

        let err = resolver
            .resolve(&claims("github|42", Some("ada")))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AuthError::PersistenceFailure(StoreError::Backend(_))
        ));
    }
}
