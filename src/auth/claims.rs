// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! ID token claims.

use serde::{Deserialize, Serialize};

/// Claims read from an ID token payload.
///
/// Standard OIDC claims plus the profile claims the identity provider adds
/// (`nickname`, `email`, `email_verified`). Only [`VerifiedClaims`] may be
/// handed to identity resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdTokenClaims {
    /// Subject, issuer-qualified (`provider|id`)
    pub sub: String,

    /// Expiration timestamp
    pub exp: i64,

    /// Issuer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,

    /// Audience (string or array; checked by the verifier when configured)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<serde_json::Value>,

    /// Issued at timestamp
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,

    /// Not before timestamp
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nbf: Option<i64>,

    /// Provider-side alias
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(default)]
    pub email_verified: bool,
}

/// Claims whose signature and standard fields have been verified.
///
/// Constructed only by [`TokenVerifier`](super::TokenVerifier).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedClaims(IdTokenClaims);

impl VerifiedClaims {
    pub(crate) fn new(claims: IdTokenClaims) -> Self {
        Self(claims)
    }

    pub fn subject(&self) -> &str {
        &self.0.sub
    }

    pub fn nickname(&self) -> Option<&str> {
        self.0.nickname.as_deref()
    }

    pub fn email(&self) -> Option<&str> {
        self.0.email.as_deref()
    }

    pub fn email_verified(&self) -> bool {
        self.0.email_verified
    }

    pub fn issuer(&self) -> Option<&str> {
        self.0.iss.as_deref()
    }
}
