// Copyright (c) The github-activity-stats Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Contributor directory for the mapping-configuration UI.
//!
//! A read path independent of the stats pipeline: it lists the people known
//! to the configured repositories, optionally decorated with a small sample
//! of their recent commits. Per-repo failures are logged and skipped.

use crate::github::{self, CommitHost, Contributor};
use chrono::{DateTime, Utc};
use log::warn;
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// Commits retained per (contributor, repository).
const RECENT_COMMITS_PER_REPO: usize = 3;

/// Commit messages are cut to the first line and at most this many chars.
const MESSAGE_LIMIT: usize = 80;

#[derive(Debug, Clone, Serialize)]
pub struct RecentCommit {
    pub sha: String,
    pub message: String,
    pub date: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ContributorActivity {
    pub login: String,
    pub avatar_url: String,
    /// Short repo name -> up to 3 most recent commits.
    pub repos: HashMap<String, Vec<RecentCommit>>,
}

/// Contributors of the configured repositories, deduplicated by login
/// (last write wins on conflicting metadata).
pub async fn list_repo_contributors(host: &dyn CommitHost, repos: &[String]) -> Vec<Contributor> {
    let mut merged: HashMap<String, Contributor> = HashMap::new();
    collect_repo_contributors(host, repos, &mut merged).await;
    sorted_by_login(merged)
}

/// Repository contributors plus the members of every organization implied by
/// the repo identifiers.
pub async fn list_all(host: &dyn CommitHost, repos: &[String]) -> Vec<Contributor> {
    let mut merged: HashMap<String, Contributor> = HashMap::new();
    collect_repo_contributors(host, repos, &mut merged).await;

    let mut orgs_seen: HashSet<&str> = HashSet::new();
    for repo in trimmed(repos) {
        let Some(org) = github::org_of(repo) else {
            continue;
        };
        if !orgs_seen.insert(org) {
            continue;
        }
        match host.list_org_members(org).await {
            Ok(members) => {
                for member in members {
                    if !member.login.is_empty() {
                        merged.insert(member.login.clone(), member);
                    }
                }
            }
            Err(err) => warn!("failed to fetch members of org {}: {}", org, err),
        }
    }

    sorted_by_login(merged)
}

/// Contributors grouped with their most recent commits per repository.
///
/// One bulk commit listing per repo (up to 100 commits), grouped client-side
/// by author. When the repo is a fork, the listing is bounded to commits after
/// the fork's creation so upstream history is not attributed to it; a
/// metadata failure does not block the listing.
pub async fn list_with_recent_commits(
    host: &dyn CommitHost,
    repos: &[String],
) -> Vec<ContributorActivity> {
    let mut merged: HashMap<String, ContributorActivity> = HashMap::new();

    for repo in trimmed(repos) {
        let short = github::short_name(repo);

        let since = match host.repo_info(repo).await {
            Ok(info) if info.fork => parse_rfc3339(&info.created_at),
            Ok(_) => None,
            Err(err) => {
                warn!("failed to fetch metadata for {}: {}", repo, err);
                None
            }
        };

        let commits = match host.list_commits(repo, since, None).await {
            Ok(commits) => commits,
            Err(err) => {
                warn!("failed to fetch commits for {}: {}", repo, err);
                continue;
            }
        };

        for commit in commits {
            let Some(author) = commit.author else {
                continue;
            };
            if author.login.is_empty() {
                continue;
            }

            let entry = merged
                .entry(author.login.clone())
                .or_insert_with(|| ContributorActivity {
                    login: author.login.clone(),
                    avatar_url: author.avatar_url.clone(),
                    repos: HashMap::new(),
                });
            let recent = entry.repos.entry(short.to_string()).or_default();
            if recent.len() >= RECENT_COMMITS_PER_REPO {
                continue;
            }
            recent.push(RecentCommit {
                sha: commit.sha.chars().take(7).collect(),
                message: summarize(&commit.commit.message),
                date: commit.commit.author.date.chars().take(10).collect(),
            });
        }
    }

    let mut result: Vec<ContributorActivity> = merged.into_values().collect();
    result.sort_by(|a, b| a.login.cmp(&b.login));
    result
}

async fn collect_repo_contributors(
    host: &dyn CommitHost,
    repos: &[String],
    merged: &mut HashMap<String, Contributor>,
) {
    for repo in trimmed(repos) {
        match host.list_contributors(repo).await {
            Ok(contributors) => {
                for contributor in contributors {
                    if !contributor.login.is_empty() {
                        merged.insert(contributor.login.clone(), contributor);
                    }
                }
            }
            Err(err) => warn!("failed to fetch contributors for {}: {}", repo, err),
        }
    }
}

fn trimmed(repos: &[String]) -> impl Iterator<Item = &str> {
    repos.iter().map(|r| r.trim()).filter(|r| !r.is_empty())
}

fn sorted_by_login(merged: HashMap<String, Contributor>) -> Vec<Contributor> {
    let mut result: Vec<Contributor> = merged.into_values().collect();
    result.sort_by(|a, b| a.login.cmp(&b.login));
    result
}

/// First line of a commit message, ellipsized past the display limit.
fn summarize(message: &str) -> String {
    let first = message.lines().next().unwrap_or("");
    if first.chars().count() > MESSAGE_LIMIT {
        let truncated: String = first.chars().take(MESSAGE_LIMIT - 3).collect();
        format!("{}...", truncated)
    } else {
        first.to_string()
    }
}

fn parse_rfc3339(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|d| d.with_timezone(&Utc))
}
