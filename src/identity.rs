// Copyright (c) The github-activity-stats Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mapping of GitHub logins to local-system identities.

use anyhow::{Context, Result};
use camino::Utf8Path;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;

/// A user of the local system (chat/dashboard side), as the mapping editor
/// sees it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalUser {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub nickname: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub is_admin: bool,
}

/// Read-only lookup into the local identity system.
pub trait UserDirectory: Send + Sync {
    fn get(&self, id: &str) -> Option<LocalUser>;
    fn all(&self) -> Vec<LocalUser>;
}

/// Directory backed by a JSON user file, standing in for the external
/// identity service.
#[derive(Debug, Default)]
pub struct StaticDirectory {
    by_id: HashMap<String, LocalUser>,
}

impl StaticDirectory {
    pub fn new(users: Vec<LocalUser>) -> Self {
        let by_id = users.into_iter().map(|u| (u.id.clone(), u)).collect();
        Self { by_id }
    }

    /// Load a JSON array of users from `path`.
    pub fn load(path: &Utf8Path) -> Result<Self> {
        let content = fs::read_to_string(path.as_std_path())
            .with_context(|| format!("failed to read user file at {}", path))?;
        let users: Vec<LocalUser> = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse user file at {}", path))?;
        Ok(Self::new(users))
    }
}

impl UserDirectory for StaticDirectory {
    fn get(&self, id: &str) -> Option<LocalUser> {
        self.by_id.get(id).cloned()
    }

    fn all(&self) -> Vec<LocalUser> {
        let mut users: Vec<LocalUser> = self.by_id.values().cloned().collect();
        users.sort_by(|a, b| a.username.cmp(&b.username));
        users
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedIdentity {
    pub id: String,
    pub username: String,
    pub name: String,
}

/// Resolve an upstream login to a local display identity.
///
/// Mapped and found: display name is "first last" (trimmed) when either part
/// is non-empty, else nickname, else username, else the local id itself.
/// Unmapped logins, or mapped ids missing from the directory, fall back to the
/// raw login with empty id and username.
pub fn resolve(
    login: &str,
    mappings: &HashMap<String, String>,
    directory: &dyn UserDirectory,
) -> ResolvedIdentity {
    let fallback = || ResolvedIdentity {
        id: String::new(),
        username: String::new(),
        name: login.to_string(),
    };

    let Some(local_id) = mappings.get(login) else {
        return fallback();
    };
    let Some(user) = directory.get(local_id) else {
        return fallback();
    };

    let full_name = format!("{} {}", user.first_name, user.last_name)
        .trim()
        .to_string();
    let name = if !full_name.is_empty() {
        full_name
    } else if !user.nickname.is_empty() {
        user.nickname.clone()
    } else if !user.username.is_empty() {
        user.username.clone()
    } else {
        local_id.clone()
    };

    ResolvedIdentity {
        id: local_id.clone(),
        username: user.username,
        name,
    }
}
