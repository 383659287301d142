// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::auth::{KeySetCache, TokenVerifier};
use crate::config::AuthConfig;
use crate::identity::{Authenticator, IdentityResolver};
use crate::storage::IdentityStore;

#[derive(Clone)]
pub struct AppState {
    pub authenticator: Arc<Authenticator>,
    /// Same cache the verifier uses; read by the readiness probe.
    pub key_set: Arc<KeySetCache>,
    pub store: Arc<dyn IdentityStore>,
}

impl AppState {
    pub fn new(config: &AuthConfig, store: Arc<dyn IdentityStore>) -> Self {
        let key_set = Arc::new(
            KeySetCache::new(config.jwks_url.clone())
                .with_fetch_limit(config.jwks_requests_per_minute)
                .with_capacity(config.jwks_cache_capacity),
        );
        let verifier = TokenVerifier::new(key_set.clone(), config);
        let resolver = IdentityResolver::new(store.clone(), config.providers.clone());

        Self {
            authenticator: Arc::new(Authenticator::new(verifier, resolver)),
            key_set,
            store,
        }
    }
}
