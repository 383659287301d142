// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! JWKS (JSON Web Key Set) fetching and caching.
//!
//! ## Behaviour
//!
//! - Keys are cached per `kid` and never expire on a timer. A miss for a
//!   `kid` (for example after the provider rotated keys) triggers a fetch
//!   of the whole set.
//! - Fetches are serialized. A caller that waited on another caller's fetch
//!   uses that result instead of fetching again.
//! - Fetches are capped per minute by a [`FetchBudget`]; a miss beyond the
//!   cap fails with [`KeySetError::RateLimited`].
//! - No retries. Network and decoding failures surface as
//!   [`KeySetError::KeySetUnavailable`].

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use jsonwebtoken::jwk::{JwkSet, PublicKeyUse};
use jsonwebtoken::DecodingKey;
use lru::LruCache;
use tracing::instrument;

use super::error::KeySetError;
use super::rate_limit::FetchBudget;

/// Default number of cached keys.
pub const DEFAULT_CACHE_CAPACITY: usize = 64;

/// Default fetch ceiling (requests per minute).
pub const DEFAULT_FETCH_LIMIT: u32 = 1;

const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// A public verification key and the identifier that names it.
#[derive(Clone)]
pub struct SigningKey {
    kid: String,
    key: DecodingKey,
}

impl SigningKey {
    pub fn kid(&self) -> &str {
        &self.kid
    }

    pub fn decoding_key(&self) -> &DecodingKey {
        &self.key
    }
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningKey").field("kid", &self.kid).finish()
    }
}

/// Lazily populated, rate-limited cache of the issuer's signing keys.
pub struct KeySetCache {
    /// JWKS endpoint URL
    jwks_url: String,
    /// HTTP client
    client: reqwest::Client,
    /// Cached keys by kid
    keys: Mutex<LruCache<String, SigningKey>>,
    /// Serializes outbound fetches
    fetch_lock: tokio::sync::Mutex<()>,
    /// Bumped after every completed fetch attempt
    fetch_generation: AtomicU64,
    /// Error of the latest completed fetch, `None` when it succeeded.
    /// Written under `fetch_lock`.
    last_failure: Mutex<Option<KeySetError>>,
    budget: FetchBudget,
}

impl KeySetCache {
    /// Create a cache for the given JWKS URL with default limits.
    pub fn new(jwks_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(target: "auth.jwks", error = %e, "Failed to build HTTP client with custom config, using defaults");
                reqwest::Client::new()
            });

        Self {
            jwks_url: jwks_url.into(),
            client,
            keys: Mutex::new(LruCache::new(capacity(DEFAULT_CACHE_CAPACITY))),
            fetch_lock: tokio::sync::Mutex::new(()),
            fetch_generation: AtomicU64::new(0),
            last_failure: Mutex::new(None),
            budget: FetchBudget::per_minute(DEFAULT_FETCH_LIMIT),
        }
    }

    /// Set the fetch ceiling in requests per minute.
    pub fn with_fetch_limit(self, per_minute: u32) -> Self {
        self.with_budget(FetchBudget::per_minute(per_minute))
    }

    pub fn with_budget(mut self, budget: FetchBudget) -> Self {
        self.budget = budget;
        self
    }

    /// Set the maximum number of cached keys.
    pub fn with_capacity(self, max_keys: usize) -> Self {
        if let Ok(mut keys) = self.keys.lock() {
            keys.resize(capacity(max_keys));
        }
        self
    }

    pub fn jwks_url(&self) -> &str {
        &self.jwks_url
    }

    /// Get the signing key for `kid`, fetching the key set on a miss.
    #[instrument(skip(self), fields(kid = %kid))]
    pub async fn get_signing_key(&self, kid: &str) -> Result<SigningKey, KeySetError> {
        if let Some(key) = self.cached(kid) {
            tracing::debug!(target: "auth.jwks", kid = %kid, "JWKS cache hit");
            return Ok(key);
        }

        let seen_generation = self.fetch_generation.load(Ordering::Acquire);
        let _guard = self.fetch_lock.lock().await;

        if let Some(key) = self.cached(kid) {
            return Ok(key);
        }
        if self.fetch_generation.load(Ordering::Acquire) != seen_generation {
            // A fetch finished while we waited. Report its failure, or the
            // key's absence from the set it returned.
            if let Some(err) = self.last_failure() {
                tracing::debug!(target: "auth.jwks", kid = %kid, error = %err, "Concurrent fetch failed");
                return Err(err);
            }
            tracing::debug!(target: "auth.jwks", kid = %kid, "Key absent from concurrent fetch");
            return Err(KeySetError::KeyNotFound {
                kid: kid.to_string(),
            });
        }

        let fetched = self.fetch_and_store().await?;
        fetched.get(kid).cloned().ok_or_else(|| {
            tracing::warn!(target: "auth.jwks", kid = %kid, "Key not found in JWKS after refresh");
            KeySetError::KeyNotFound {
                kid: kid.to_string(),
            }
        })
    }

    /// Force a fetch of the key set. Still subject to the fetch ceiling.
    pub async fn refresh(&self) -> Result<usize, KeySetError> {
        let _guard = self.fetch_lock.lock().await;
        let fetched = self.fetch_and_store().await?;
        Ok(fetched.len())
    }

    /// Whether any key is cached.
    pub fn is_warm(&self) -> bool {
        self.len() > 0
    }

    /// Number of cached keys.
    pub fn len(&self) -> usize {
        self.keys.lock().map(|keys| keys.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn last_failure(&self) -> Option<KeySetError> {
        self.last_failure.lock().ok()?.clone()
    }

    fn cached(&self, kid: &str) -> Option<SigningKey> {
        self.keys.lock().ok()?.get(kid).cloned()
    }

    /// Fetch, convert and cache. Caller must hold `fetch_lock`.
    async fn fetch_and_store(&self) -> Result<HashMap<String, SigningKey>, KeySetError> {
        if !self.budget.try_acquire() {
            tracing::warn!(
                target: "auth.jwks",
                limit = self.budget.limit(),
                "JWKS fetch refused by rate ceiling"
            );
            return Err(KeySetError::RateLimited {
                limit: self.budget.limit(),
            });
        }

        let result = self.fetch_jwks().await.map(signing_keys);
        if let Ok(mut last_failure) = self.last_failure.lock() {
            *last_failure = result.as_ref().err().cloned();
        }
        self.fetch_generation.fetch_add(1, Ordering::AcqRel);
        let fetched = result?;

        if let Ok(mut keys) = self.keys.lock() {
            for (kid, key) in &fetched {
                keys.put(kid.clone(), key.clone());
            }
        }

        tracing::info!(target: "auth.jwks", key_count = fetched.len(), "JWKS cache refreshed");
        Ok(fetched)
    }

    /// Fetch JWKS from the endpoint.
    async fn fetch_jwks(&self) -> Result<JwkSet, KeySetError> {
        tracing::debug!(target: "auth.jwks", url = %self.jwks_url, "Fetching JWKS");

        let response = self
            .client
            .get(&self.jwks_url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| {
                tracing::error!(target: "auth.jwks", error = %e, "Failed to fetch JWKS");
                KeySetError::KeySetUnavailable(e.to_string())
            })?;

        if !response.status().is_success() {
            tracing::error!(target: "auth.jwks", status = %response.status(), "JWKS endpoint returned error");
            return Err(KeySetError::KeySetUnavailable(format!(
                "HTTP {} from JWKS endpoint",
                response.status()
            )));
        }

        response.json::<JwkSet>().await.map_err(|e| {
            tracing::error!(target: "auth.jwks", error = %e, "Failed to parse JWKS response");
            KeySetError::KeySetUnavailable(format!("invalid JWKS document: {e}"))
        })
    }
}

/// Convert every usable signature key in the set.
fn signing_keys(jwks: JwkSet) -> HashMap<String, SigningKey> {
    let mut keys = HashMap::with_capacity(jwks.keys.len());

    for jwk in &jwks.keys {
        let Some(kid) = jwk.common.key_id.clone() else {
            tracing::warn!(target: "auth.jwks", "Skipping JWK without kid");
            continue;
        };
        if matches!(jwk.common.public_key_use, Some(PublicKeyUse::Encryption)) {
            continue;
        }
        match DecodingKey::from_jwk(jwk) {
            Ok(key) => {
                keys.insert(kid.clone(), SigningKey { kid, key });
            }
            Err(e) => {
                tracing::warn!(target: "auth.jwks", kid = %kid, error = %e, "Skipping unusable JWK");
            }
        }
    }

    keys
}

fn capacity(max_keys: usize) -> NonZeroUsize {
    NonZeroUsize::new(max_keys).unwrap_or(NonZeroUsize::MIN)
}
