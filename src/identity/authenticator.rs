// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! The `authenticate` operation: verify the ID token, then resolve the identity.

use tracing::instrument;

use super::resolver::IdentityResolver;
use crate::auth::{AuthError, TokenVerifier};
use crate::models::AuthSummary;

pub struct Authenticator {
    verifier: TokenVerifier,
    resolver: IdentityResolver,
}

impl Authenticator {
    pub fn new(verifier: TokenVerifier, resolver: IdentityResolver) -> Self {
        Self { verifier, resolver }
    }

    /// Verify `id_token` and return the summary of its local identity.
    ///
    /// Failures from either stage are returned as-is. Nothing is stored
    /// unless verification succeeded.
    #[instrument(skip_all)]
    pub async fn authenticate(&self, id_token: &str) -> Result<AuthSummary, AuthError> {
        let claims = self.verifier.verify(id_token).await.inspect_err(|e| {
            tracing::info!(
                target: "identity.authenticate",
                code = e.error_code(),
                error = %e,
                "Verification failed"
            );
        })?;

        let record = self.resolver.resolve(&claims).await.inspect_err(|e| {
            tracing::warn!(
                target: "identity.authenticate",
                sub = %claims.subject(),
                code = e.error_code(),
                error = %e,
                "Identity resolution failed"
            );
        })?;

        tracing::info!(target: "identity.authenticate", sub = %record.auth_id, "Authenticated");
        Ok(AuthSummary::from(&record))
    }
}
