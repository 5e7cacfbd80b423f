// Copyright (c) The github-activity-stats Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Command implementations.

use crate::cache::WeekCache;
use crate::config::{Config, ConfigHandle};
use crate::github::GithubClient;
use crate::identity::{StaticDirectory, UserDirectory};
use crate::server::{self, AppState, MAPPINGS_KV_KEY};
use crate::stats;
use anyhow::{Context, Result, bail};
use camino::Utf8Path;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

/// Run the HTTP service.
pub async fn run_serve(database: &Utf8Path, config_path: &Utf8Path, addr: SocketAddr) -> Result<()> {
    let mut config = Config::load(config_path).context("failed to load configuration")?;
    let cache = WeekCache::open(database).context("failed to open cache database")?;

    // Mappings saved through the admin endpoint override the file copy.
    if let Some(saved) = cache.get_kv(MAPPINGS_KV_KEY).await? {
        config.user_mappings = saved;
    }

    let directory = load_directory(&config)?;
    let state = Arc::new(AppState {
        config: ConfigHandle::new(config),
        cache,
        directory,
    });

    server::serve(addr, state).await
}

/// One-shot aggregation printed to stdout.
pub async fn run_stats(
    database: &Utf8Path,
    config_path: &Utf8Path,
    week_start: Option<String>,
    week_end: Option<String>,
) -> Result<()> {
    let config = Config::load(config_path).context("failed to load configuration")?;
    if config.github_token.is_empty() {
        bail!("GitHub token not configured");
    }

    let cache = WeekCache::open(database).context("failed to open cache database")?;
    let directory = load_directory(&config)?;
    let client = GithubClient::new(config.github_token.clone(), Duration::from_secs(10));

    let response = stats::compute_stats(
        &client,
        &cache,
        directory.as_ref(),
        &config.repo_list(),
        &config.mappings(),
        week_start.as_deref(),
        week_end.as_deref(),
    )
    .await?;

    println!(
        "\nCommit activity {} .. {}",
        response.week_start, response.week_end
    );
    println!("\n{:<24} {:>8} {:>8} {:>8}", "User", "Commits", "Added", "Removed");
    println!("{}", "=".repeat(52));
    for user in &response.users {
        println!(
            "{:<24} {:>8} {:>8} {:>8}",
            user.name, user.commits, user.added, user.removed
        );
    }

    if response.repos.is_empty() {
        println!("\nNo active repositories in range.");
    } else {
        println!("\nActive repositories: {}", response.repos.join(", "));
    }
    Ok(())
}

fn load_directory(config: &Config) -> Result<Box<dyn UserDirectory>> {
    match &config.users_file {
        Some(path) => Ok(Box::new(
            StaticDirectory::load(path).context("failed to load user directory")?,
        )),
        None => Ok(Box::new(StaticDirectory::default())),
    }
}
