// Copyright (c) The github-activity-stats Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Service configuration.

use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::sync::{Arc, RwLock};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    /// GitHub access token. Requests that need upstream access are rejected
    /// when this is empty.
    #[serde(default)]
    pub github_token: String,

    /// Comma-separated `org/repo` identifiers.
    #[serde(default)]
    pub repositories: String,

    /// JSON object mapping GitHub login to local user id.
    #[serde(default)]
    pub user_mappings: String,

    /// Optional JSON file holding the local identity directory.
    #[serde(default)]
    pub users_file: Option<Utf8PathBuf>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: &Utf8Path) -> Result<Self> {
        let content = fs::read_to_string(path.as_std_path())
            .with_context(|| format!("failed to read config file at {}", path))?;
        toml::from_str(&content)
            .with_context(|| format!("failed to parse config file at {}", path))
    }

    /// The repository list, trimmed, blanks dropped.
    pub fn repo_list(&self) -> Vec<String> {
        self.repositories
            .split(',')
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(String::from)
            .collect()
    }

    /// The decoded mapping table. An empty or unparseable `user_mappings`
    /// value degrades to an empty table rather than failing the request.
    pub fn mappings(&self) -> HashMap<String, String> {
        if self.user_mappings.is_empty() {
            return HashMap::new();
        }
        serde_json::from_str(&self.user_mappings).unwrap_or_default()
    }
}

/// Shared handle to the current configuration snapshot: many readers, one
/// writer, atomic swap. Handlers read one immutable snapshot per request.
#[derive(Clone)]
pub struct ConfigHandle {
    inner: Arc<RwLock<Arc<Config>>>,
}

impl ConfigHandle {
    pub fn new(config: Config) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(config))),
        }
    }

    /// The current snapshot. Later swaps do not affect it.
    pub fn current(&self) -> Arc<Config> {
        Arc::clone(&self.inner.read().expect("config lock poisoned"))
    }

    /// Swap in a modified copy of the current configuration.
    pub fn update(&self, mutate: impl FnOnce(&mut Config)) {
        let mut guard = self.inner.write().expect("config lock poisoned");
        let mut config = (**guard).clone();
        mutate(&mut config);
        *guard = Arc::new(config);
    }
}
