// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Data Models
//!
//! The durable identity record and the request/response bodies of the
//! `authenticate` endpoint. JSON field names are camelCase.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::Role;

// =============================================================================
// Identity Record
// =============================================================================

/// A local user, keyed by the issuer-qualified subject identifier.
///
/// `auth_id` is unique across records and never changes after creation.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct IdentityRecord {
    /// Local identifier.
    pub id: Uuid,
    /// Subject identifier from the identity provider (`provider|id`).
    pub auth_id: String,
    /// Display alias, initially the provider nickname.
    pub alias: String,
    pub email: String,
    pub email_verified: bool,
    pub role: Role,
    /// Session token, set by session management after creation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_token: Option<String>,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Authenticate
// =============================================================================

/// Request body for `POST /v1/authenticate`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticateRequest {
    /// ID token issued by the identity provider.
    pub id_token: String,
}

/// Public identity summary returned on successful authentication.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AuthSummary {
    /// Subject identifier (`provider|id`).
    pub auth_id: String,
    pub alias: String,
}

impl From<&IdentityRecord> for AuthSummary {
    fn from(record: &IdentityRecord) -> Self {
        Self {
            auth_id: record.auth_id.clone(),
            alias: record.alias.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> IdentityRecord {
        IdentityRecord {
            id: Uuid::nil(),
            auth_id: "github|42".to_string(),
            alias: "ada".to_string(),
            email: "a@x.com".to_string(),
            email_verified: true,
            role: Role::Unassigned,
            session_token: None,
            created_at: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
        }
    }

    #[test]
    fn record_uses_camel_case_fields() {
        let json = serde_json::to_value(record()).unwrap();
        assert_eq!(json["authId"], "github|42");
        assert_eq!(json["emailVerified"], true);
        assert_eq!(json["role"], "unassigned");
        assert!(json.get("sessionToken").is_none());
    }

    #[test]
    fn summary_from_record() {
        let summary = AuthSummary::from(&record());
        assert_eq!(
            serde_json::to_string(&summary).unwrap(),
            r#"{"authId":"github|42","alias":"ada"}"#
        );
    }

    #[test]
    fn request_reads_id_token() {
        let request: AuthenticateRequest =
            serde_json::from_str(r#"{"idToken":"a.b.c"}"#).unwrap();
        assert_eq!(request.id_token, "a.b.c");
    }
}
