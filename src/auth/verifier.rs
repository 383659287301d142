// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! ID token verification.
//!
//! 1. Decode header and payload without verifying anything; reject tokens
//!    missing either part or the `kid` header.
//! 2. Resolve the signing key for `kid` through the [`KeySetCache`].
//! 3. Verify signature and standard claims with a fixed [`Validation`]. The
//!    algorithm comes from configuration, never from the token header.

use std::sync::Arc;

use jsonwebtoken::errors::ErrorKind as JwtErrorKind;
use jsonwebtoken::{decode, decode_header, Validation};
use tracing::instrument;

use super::claims::{IdTokenClaims, VerifiedClaims};
use super::error::AuthError;
use super::jwks::KeySetCache;
use crate::config::AuthConfig;

/// Verifies ID tokens against the issuer's key set.
pub struct TokenVerifier {
    keys: Arc<KeySetCache>,
    validation: Validation,
}

impl TokenVerifier {
    pub fn new(keys: Arc<KeySetCache>, config: &AuthConfig) -> Self {
        let mut validation = Validation::new(config.algorithm);
        validation.leeway = config.clock_skew_seconds;
        validation.validate_nbf = true;
        validation.set_required_spec_claims(&["exp", "sub"]);

        if let Some(ref issuer) = config.expected_issuer {
            validation.set_issuer(&[issuer]);
        }

        if let Some(ref audience) = config.audience {
            validation.set_audience(&[audience]);
        } else {
            validation.validate_aud = false;
        }

        Self { keys, validation }
    }

    pub fn key_set(&self) -> &Arc<KeySetCache> {
        &self.keys
    }

    /// Verify `raw` and return its claims.
    #[instrument(skip_all)]
    pub async fn verify(&self, raw: &str) -> Result<VerifiedClaims, AuthError> {
        let token = raw.trim();
        if token.is_empty() {
            return Err(AuthError::MalformedCredential("credential is empty".into()));
        }

        let header = decode_header(token)
            .map_err(|e| AuthError::MalformedCredential(format!("invalid header: {e}")))?;
        let kid = header
            .kid
            .filter(|kid| !kid.is_empty())
            .ok_or_else(|| AuthError::MalformedCredential("header has no key identifier".into()))?;

        let payload = jsonwebtoken::dangerous::insecure_decode::<serde_json::Value>(token)
            .map_err(|e| AuthError::MalformedCredential(format!("invalid payload: {e}")))?;
        if !payload.claims.is_object() {
            return Err(AuthError::MalformedCredential(
                "payload is not a claim set".into(),
            ));
        }

        let key = self
            .keys
            .get_signing_key(&kid)
            .await
            .map_err(|source| AuthError::KeyResolutionFailed {
                kid: kid.clone(),
                source,
            })?;

        let token_data = decode::<IdTokenClaims>(token, key.decoding_key(), &self.validation)
            .map_err(|e| {
                let err = map_jwt_error(e.kind());
                tracing::debug!(target: "auth.verify", kid = %kid, error = %e, code = err.error_code(), "Token rejected");
                err
            })?;

        tracing::debug!(target: "auth.verify", kid = %kid, sub = %token_data.claims.sub, "Token verified");
        Ok(VerifiedClaims::new(token_data.claims))
    }
}

fn map_jwt_error(kind: &JwtErrorKind) -> AuthError {
    match kind {
        JwtErrorKind::ExpiredSignature => AuthError::TokenExpired,
        JwtErrorKind::InvalidSignature
        | JwtErrorKind::InvalidAlgorithm
        | JwtErrorKind::MissingAlgorithm => AuthError::SignatureInvalid,
        JwtErrorKind::InvalidIssuer => AuthError::ClaimsInvalid("issuer mismatch".into()),
        JwtErrorKind::InvalidAudience => AuthError::ClaimsInvalid("audience mismatch".into()),
        JwtErrorKind::InvalidSubject => AuthError::ClaimsInvalid("subject mismatch".into()),
        JwtErrorKind::ImmatureSignature => AuthError::ClaimsInvalid("token not yet valid".into()),
        JwtErrorKind::MissingRequiredClaim(claim) => {
            AuthError::ClaimsInvalid(format!("missing required claim '{claim}'"))
        }
        JwtErrorKind::InvalidToken
        | JwtErrorKind::Base64(_)
        | JwtErrorKind::Json(_)
        | JwtErrorKind::Utf8(_) => AuthError::MalformedCredential("undecodable token".into()),
        // Key material or crypto backend failures.
        _ => AuthError::SignatureInvalid,
    }
}
