// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Identity Auth Server - ID token verification and local identity resolution
//!
//! Verifies ID tokens issued by an external identity provider against the
//! provider's published key set, then finds or creates the local identity
//! record for the token's subject.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Key set cache, token verification, error taxonomy
//! - `identity` - Identity resolution and the `authenticate` operation
//! - `storage` - Identity persistence (in-memory or redb)

pub mod api;
pub mod auth;
pub mod config;
pub mod identity;
pub mod models;
pub mod state;
pub mod storage;

#[cfg(test)]
pub mod test_support;
