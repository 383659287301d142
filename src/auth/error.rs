// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication errors.
//!
//! Every failure of the verification-and-resolution pipeline is one variant
//! of [`AuthError`]. Nothing is retried internally; the caller receives the
//! variant unchanged and can match on it.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::storage::StoreError;

/// Failure to produce a signing key from the remote key set.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum KeySetError {
    /// The fetched key set does not contain the requested key identifier.
    #[error("key '{kid}' not found in key set")]
    KeyNotFound { kid: String },

    /// Network failure, non-success status or undecodable key set document.
    #[error("key set unavailable: {0}")]
    KeySetUnavailable(String),

    /// The key set fetch ceiling for the current window is exhausted.
    #[error("key set fetch limit of {limit} per minute reached")]
    RateLimited { limit: u32 },
}

/// Broad classification used for logging and status mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The caller sent something unusable (4xx).
    ClientInput,
    /// The credential was understood but rejected.
    Rejected,
    /// A dependency (key set endpoint, storage) failed (5xx).
    Dependency,
}

/// Authentication error type.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Credential could not be decoded, or lacks a header, key id or payload.
    #[error("malformed credential: {0}")]
    MalformedCredential(String),

    /// The signing key could not be resolved.
    #[error("could not resolve signing key '{kid}': {source}")]
    KeyResolutionFailed {
        kid: String,
        #[source]
        source: KeySetError,
    },

    /// Signature does not verify, or the token uses a non-allow-listed algorithm.
    #[error("credential signature is invalid")]
    SignatureInvalid,

    /// The `exp` claim has passed.
    #[error("credential has expired")]
    TokenExpired,

    /// Any other standard-claim violation (issuer, audience, not-before, ...).
    #[error("credential claims are invalid: {0}")]
    ClaimsInvalid(String),

    /// Subject's identity provider is not in the allow-list.
    #[error("identity provider '{provider}' is not supported (subject '{subject}')")]
    UnsupportedProvider { provider: String, subject: String },

    /// The identity store failed.
    #[error("identity persistence failed: {0}")]
    PersistenceFailure(#[from] StoreError),
}

#[derive(Serialize)]
struct AuthErrorBody {
    error: String,
    error_code: String,
}

impl AuthError {
    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::MalformedCredential(_) => "malformed_credential",
            AuthError::KeyResolutionFailed { source, .. } => match source {
                KeySetError::KeyNotFound { .. } => "key_not_found",
                KeySetError::KeySetUnavailable(_) => "key_set_unavailable",
                KeySetError::RateLimited { .. } => "key_set_rate_limited",
            },
            AuthError::SignatureInvalid => "signature_invalid",
            AuthError::TokenExpired => "token_expired",
            AuthError::ClaimsInvalid(_) => "claims_invalid",
            AuthError::UnsupportedProvider { .. } => "unsupported_provider",
            AuthError::PersistenceFailure(_) => "persistence_failure",
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            AuthError::MalformedCredential(_) | AuthError::UnsupportedProvider { .. } => {
                ErrorKind::ClientInput
            }
            AuthError::SignatureInvalid
            | AuthError::TokenExpired
            | AuthError::ClaimsInvalid(_) => ErrorKind::Rejected,
            AuthError::KeyResolutionFailed { source, .. } => match source {
                KeySetError::KeyNotFound { .. } => ErrorKind::Rejected,
                KeySetError::KeySetUnavailable(_) | KeySetError::RateLimited { .. } => {
                    ErrorKind::Dependency
                }
            },
            AuthError::PersistenceFailure(_) => ErrorKind::Dependency,
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::MalformedCredential(_) | AuthError::UnsupportedProvider { .. } => {
                StatusCode::BAD_REQUEST
            }
            AuthError::SignatureInvalid
            | AuthError::TokenExpired
            | AuthError::ClaimsInvalid(_) => StatusCode::UNAUTHORIZED,
            AuthError::KeyResolutionFailed { source, .. } => match source {
                KeySetError::KeyNotFound { .. } => StatusCode::UNAUTHORIZED,
                KeySetError::KeySetUnavailable(_) => StatusCode::BAD_GATEWAY,
                KeySetError::RateLimited { .. } => StatusCode::SERVICE_UNAVAILABLE,
            },
            AuthError::PersistenceFailure(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// True when the key set was reachable but lacks the requested key.
    pub fn is_key_not_found(&self) -> bool {
        matches!(
            self,
            AuthError::KeyResolutionFailed {
                source: KeySetError::KeyNotFound { .. },
                ..
            }
        )
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        // Storage internals stay in the log.
        let message = match &self {
            AuthError::PersistenceFailure(e) => {
                tracing::error!(target: "auth.error", error = %e, "Identity store failure");
                "identity persistence failed".to_string()
            }
            other => other.to_string(),
        };
        let body = Json(AuthErrorBody {
            error: message,
            error_code: self.error_code().to_string(),
        });
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[tokio::test]
    async fn malformed_credential_returns_400() {
        let response = AuthError::MalformedCredential("empty".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();
        assert_eq!(body["error_code"], "malformed_credential");
    }

    #[test]
    fn key_resolution_status_depends_on_cause() {
        let not_found = AuthError::KeyResolutionFailed {
            kid: "k9".into(),
            source: KeySetError::KeyNotFound { kid: "k9".into() },
        };
        assert_eq!(not_found.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(not_found.kind(), ErrorKind::Rejected);
        assert!(not_found.is_key_not_found());

        let unavailable = AuthError::KeyResolutionFailed {
            kid: "k9".into(),
            source: KeySetError::KeySetUnavailable("HTTP 500".into()),
        };
        assert_eq!(unavailable.status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(unavailable.kind(), ErrorKind::Dependency);
        assert!(!unavailable.is_key_not_found());

        let limited = AuthError::KeyResolutionFailed {
            kid: "k9".into(),
            source: KeySetError::RateLimited { limit: 1 },
        };
        assert_eq!(limited.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(limited.error_code(), "key_set_rate_limited");
    }

    #[test]
    fn unsupported_provider_is_client_input() {
        let err = AuthError::UnsupportedProvider {
            provider: "twitter".into(),
            subject: "twitter|7".into(),
        };
        assert_eq!(err.kind(), ErrorKind::ClientInput);
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert!(err.to_string().contains("twitter|7"));
    }

    #[tokio::test]
    async fn persistence_failure_hides_backend_detail() {
        let err = AuthError::from(StoreError::Backend("disk /var/lib full".into()));
        assert_eq!(err.kind(), ErrorKind::Dependency);

        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();
        assert_eq!(body["error_code"], "persistence_failure");
        assert!(!body["error"].as_str().unwrap().contains("/var/lib"));
    }
}
