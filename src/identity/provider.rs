// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Identity provider prefixes of subject identifiers.
//!
//! Subjects issued by the identity provider have the form `provider|localId`,
//! e.g. `github|42` or `google-oauth2|1093`. The provider segment is everything
//! before the first `|`.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// Separator between the provider segment and the provider-local id.
pub const SUBJECT_SEPARATOR: char = '|';

/// Identity provider named by a subject prefix.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IdentityProvider {
    /// Username/password database of the identity provider itself
    Auth0,
    Github,
    Google,
    Twitter,
    Facebook,
    WindowsLive,
    Linkedin,
    /// Any prefix without a dedicated variant
    Other(String),
}

impl IdentityProvider {
    /// Map a prefix to a provider. Matching is exact; prefixes are lowercase.
    pub fn from_prefix(prefix: &str) -> Self {
        match prefix {
            "auth0" => IdentityProvider::Auth0,
            "github" => IdentityProvider::Github,
            "google-oauth2" => IdentityProvider::Google,
            "twitter" => IdentityProvider::Twitter,
            "facebook" => IdentityProvider::Facebook,
            "windowslive" => IdentityProvider::WindowsLive,
            "linkedin" => IdentityProvider::Linkedin,
            other => IdentityProvider::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            IdentityProvider::Auth0 => "auth0",
            IdentityProvider::Github => "github",
            IdentityProvider::Google => "google-oauth2",
            IdentityProvider::Twitter => "twitter",
            IdentityProvider::Facebook => "facebook",
            IdentityProvider::WindowsLive => "windowslive",
            IdentityProvider::Linkedin => "linkedin",
            IdentityProvider::Other(name) => name,
        }
    }
}

impl fmt::Display for IdentityProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a subject identifier has no usable provider segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubjectError {
    MissingSeparator,
    EmptyProvider,
    EmptyLocalId { provider: String },
}

impl SubjectError {
    /// The provider segment as far as it could be read.
    pub fn provider_segment(&self) -> &str {
        match self {
            SubjectError::MissingSeparator | SubjectError::EmptyProvider => "",
            SubjectError::EmptyLocalId { provider } => provider,
        }
    }
}

/// A subject identifier split into provider and provider-local id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectId<'a> {
    provider: IdentityProvider,
    local_id: &'a str,
    raw: &'a str,
}

impl<'a> SubjectId<'a> {
    pub fn parse(raw: &'a str) -> Result<Self, SubjectError> {
        let (prefix, local_id) = raw
            .split_once(SUBJECT_SEPARATOR)
            .ok_or(SubjectError::MissingSeparator)?;

        if prefix.is_empty() {
            return Err(SubjectError::EmptyProvider);
        }
        if local_id.is_empty() {
            return Err(SubjectError::EmptyLocalId {
                provider: prefix.to_string(),
            });
        }

        Ok(Self {
            provider: IdentityProvider::from_prefix(prefix),
            local_id,
            raw,
        })
    }

    pub fn provider(&self) -> &IdentityProvider {
        &self.provider
    }

    pub fn local_id(&self) -> &'a str {
        self.local_id
    }

    pub fn as_str(&self) -> &'a str {
        self.raw
    }
}

/// Providers for which new identities may be created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderAllowList(HashSet<IdentityProvider>);

impl ProviderAllowList {
    pub fn new(providers: impl IntoIterator<Item = IdentityProvider>) -> Self {
        Self(providers.into_iter().collect())
    }

    pub fn contains(&self, provider: &IdentityProvider) -> bool {
        self.0.contains(provider)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Provider prefixes, sorted.
    pub fn prefixes(&self) -> Vec<&str> {
        let mut prefixes: Vec<&str> = self.0.iter().map(IdentityProvider::as_str).collect();
        prefixes.sort_unstable();
        prefixes
    }
}

impl Default for ProviderAllowList {
    fn default() -> Self {
        Self::new([IdentityProvider::Github, IdentityProvider::Auth0])
    }
}

impl FromStr for ProviderAllowList {
    type Err = String;

    /// Parse a comma-separated list of prefixes, e.g. `github,auth0`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let list = Self::new(
            s.split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(IdentityProvider::from_prefix),
        );
        if list.is_empty() {
            return Err(format!("no identity providers in '{s}'"));
        }
        Ok(list)
    }
}
