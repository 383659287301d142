// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Identity Module
//!
//! Turns verified claims into local identity records.
//!
//! - [`IdentityResolver`] - find-or-create by subject identifier
//! - [`Authenticator`] - token verification followed by resolution
//! - [`provider`] - subject prefix parsing and the provider allow-list

pub mod authenticator;
pub mod provider;
pub mod resolver;

pub use authenticator::Authenticator;
pub use provider::{IdentityProvider, ProviderAllowList, SubjectError, SubjectId};
pub use resolver::IdentityResolver;
