// Copyright (c) The github-activity-stats Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Weekly GitHub commit-activity aggregation for a team dashboard.

use anyhow::Result;
use env_logger::Env;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    github_activity_stats::dispatch::dispatch().await
}
