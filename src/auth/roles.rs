// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Role references carried by identity records.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// User role.
///
/// Stored on each identity record by its numeric id. New identities start
/// as `Unassigned`; assigning another role is not done here.
///
/// | id | role |
/// |----|------|
/// | `1` | Not defined |
/// | `2` | Developer |
/// | `3` | Trader |
/// | `4` | Data analyst |
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// No role chosen yet
    #[default]
    Unassigned,
    Developer,
    Trader,
    DataAnalyst,
}

impl Role {
    /// Stable role id.
    pub fn id(&self) -> &'static str {
        match self {
            Role::Unassigned => "1",
            Role::Developer => "2",
            Role::Trader => "3",
            Role::DataAnalyst => "4",
        }
    }

    pub fn from_id(id: &str) -> Option<Role> {
        match id {
            "1" => Some(Role::Unassigned),
            "2" => Some(Role::Developer),
            "3" => Some(Role::Trader),
            "4" => Some(Role::DataAnalyst),
            _ => None,
        }
    }

    /// Display name.
    pub fn name(&self) -> &'static str {
        match self {
            Role::Unassigned => "Not Defined",
            Role::Developer => "Developer",
            Role::Trader => "Trader",
            Role::DataAnalyst => "Data Analyst",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
