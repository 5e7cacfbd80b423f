// Copyright (c) The github-activity-stats Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Weekly aggregation of commit activity.
//!
//! Turns a repository list and a week range into a per-user summary, reading
//! completed weeks through the cache and always refetching the current one.
//! Any single (repo, week) failure is logged and skipped; the summary is a
//! best-effort merge of whatever cells succeeded.

use crate::cache::WeekCache;
use crate::github::{self, CommitHost, GithubError};
use crate::identity::{self, UserDirectory};
use crate::week::{self, IsoWeek};
use anyhow::{Context, Result};
use chrono::{NaiveTime, Utc};
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// How far the default query range reaches back from the current week.
const DEFAULT_RANGE_WEEKS: u32 = 4;

/// Per-contributor activity within one week. Merging is pointwise addition,
/// so aggregation order never affects totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContributorStat {
    pub commits: u64,
    pub added: u64,
    pub removed: u64,
}

impl ContributorStat {
    pub fn merge(&mut self, other: &ContributorStat) {
        self.commits += other.commits;
        self.added += other.added;
        self.removed += other.removed;
    }
}

/// The cacheable unit: everything known about one repository in one week.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoWeekRecord {
    pub week: String,
    pub repo: String,
    /// GitHub login -> stats. Only logins with at least one commit appear.
    pub users: HashMap<String, ContributorStat>,
    pub fetched_at: String,
}

impl RepoWeekRecord {
    pub fn total_commits(&self) -> u64 {
        self.users.values().map(|s| s.commits).sum()
    }
}

/// One row of the aggregated summary.
#[derive(Debug, Clone, Serialize)]
pub struct UserStats {
    pub id: String,
    pub username: String,
    pub name: String,
    pub commits: u64,
    pub added: u64,
    pub removed: u64,
    pub by_repo: HashMap<String, u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    pub users: Vec<UserStats>,
    pub repos: Vec<String>,
    pub week_start: String,
    pub week_end: String,
    pub last_updated: String,
}

/// Aggregate commit activity for `repos` over the requested week range.
///
/// Both labels default to the `current - 4 ..= current` window when either is
/// missing. Malformed labels fail the request; every upstream failure past
/// that point is absorbed per (repo, week) cell.
pub async fn compute_stats(
    host: &dyn CommitHost,
    cache: &WeekCache,
    directory: &dyn UserDirectory,
    repos: &[String],
    mappings: &HashMap<String, String>,
    week_start: Option<&str>,
    week_end: Option<&str>,
) -> Result<StatsResponse> {
    let current = IsoWeek::current();
    let (start, end) = match (week_start, week_end) {
        (Some(start), Some(end)) => (
            IsoWeek::parse(start).context("invalid week_start")?,
            IsoWeek::parse(end).context("invalid week_end")?,
        ),
        _ => (current.minus_weeks(DEFAULT_RANGE_WEEKS), current),
    };
    let weeks = week::range(start, end);

    // Logins in discovery order, so the final sort has a stable tie-break.
    let mut order: Vec<String> = Vec::new();
    let mut totals: HashMap<String, ContributorStat> = HashMap::new();
    let mut by_repo: HashMap<String, HashMap<String, u64>> = HashMap::new();
    let mut active_repos: Vec<String> = Vec::new();

    for repo in repos {
        let repo = repo.trim();
        if repo.is_empty() {
            continue;
        }
        let short = github::short_name(repo);

        for &wk in &weeks {
            let Some(record) = load_week(host, cache, repo, wk, current).await else {
                continue;
            };

            for (login, stat) in &record.users {
                if stat.commits > 0 && !active_repos.iter().any(|r| r == short) {
                    active_repos.push(short.to_string());
                }
                if !totals.contains_key(login) {
                    order.push(login.clone());
                }
                totals.entry(login.clone()).or_default().merge(stat);
                *by_repo
                    .entry(login.clone())
                    .or_default()
                    .entry(short.to_string())
                    .or_insert(0) += stat.commits;
            }
        }
    }

    let mut users = Vec::new();
    for login in &order {
        let stat = &totals[login];
        if stat.commits == 0 {
            continue;
        }
        let ident = identity::resolve(login, mappings, directory);
        users.push(UserStats {
            id: ident.id,
            username: ident.username,
            name: ident.name,
            commits: stat.commits,
            added: stat.added,
            removed: stat.removed,
            by_repo: by_repo.remove(login).unwrap_or_default(),
        });
    }
    // sort_by is stable: equal counts keep discovery order.
    users.sort_by(|a, b| b.commits.cmp(&a.commits));

    Ok(StatsResponse {
        users,
        repos: active_repos,
        week_start: start.to_string(),
        week_end: end.to_string(),
        last_updated: Utc::now().to_rfc3339(),
    })
}

/// Resolve one (repo, week) cell: cache read-through for completed weeks,
/// always-fresh fetch for the current (or a future) week. Returns `None` when
/// the cell cannot be fetched; the caller skips it.
async fn load_week(
    host: &dyn CommitHost,
    cache: &WeekCache,
    repo: &str,
    wk: IsoWeek,
    current: IsoWeek,
) -> Option<RepoWeekRecord> {
    let completed = wk < current;

    if completed {
        match cache.get(repo, wk).await {
            Ok(Some(record)) => return Some(record),
            Ok(None) => {}
            Err(err) => warn!("cache read failed for {} {}: {:#}", repo, wk, err),
        }
    }

    let record = match fetch_week(host, repo, wk).await {
        Ok(record) => record,
        Err(err) => {
            warn!("skipping {} {}: {}", repo, wk, err);
            return None;
        }
    };

    if completed && record.total_commits() > 0 {
        if let Err(err) = cache.put(&record).await {
            warn!("cache write failed for {} {}: {:#}", repo, wk, err);
        }
    }

    Some(record)
}

/// Fetch one week of commits and bucket them per author login.
///
/// The bulk listing carries no per-commit diff stats, so `added`/`removed`
/// stay zero here; only commit counts are populated.
async fn fetch_week(
    host: &dyn CommitHost,
    repo: &str,
    wk: IsoWeek,
) -> Result<RepoWeekRecord, GithubError> {
    let since = wk.monday().and_time(NaiveTime::MIN).and_utc();
    let until = wk.end_exclusive().and_time(NaiveTime::MIN).and_utc();
    let commits = host.list_commits(repo, Some(since), Some(until)).await?;

    let mut users: HashMap<String, ContributorStat> = HashMap::new();
    for commit in commits {
        let Some(author) = commit.author else {
            continue;
        };
        if author.login.is_empty() {
            continue;
        }
        users.entry(author.login).or_default().commits += 1;
    }

    Ok(RepoWeekRecord {
        week: wk.to_string(),
        repo: repo.to_string(),
        users,
        fetched_at: Utc::now().to_rfc3339(),
    })
}
