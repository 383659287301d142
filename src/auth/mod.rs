// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Verifies ID tokens issued by the external identity provider.
//!
//! ## Flow
//!
//! 1. Client sends its ID token to `POST /v1/authenticate`
//! 2. Server:
//!    - Decodes the token header and reads `kid`
//!    - Looks the key up in the JWKS cache, fetching the provider's
//!      `/.well-known/jwks.json` on a miss
//!    - Verifies the signature (configured algorithm only), expiry,
//!      issuer and audience
//! 3. The verified claims go to identity resolution
//!
//! ## Security
//!
//! - The signature algorithm is fixed by configuration
//! - JWKS fetches are capped per minute and never retried
//! - Clock skew tolerance defaults to 60 seconds

pub mod claims;
pub mod error;
pub mod jwks;
pub mod rate_limit;
pub mod roles;
pub mod verifier;

pub use claims::{IdTokenClaims, VerifiedClaims};
pub use error::{AuthError, ErrorKind, KeySetError};
pub use jwks::{KeySetCache, SigningKey};
pub use rate_limit::FetchBudget;
pub use roles::Role;
pub use verifier::TokenVerifier;
