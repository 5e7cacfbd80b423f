// Copyright (c) The github-activity-stats Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! GitHub API client for commit, contributor and repository lookups.
//!
//! Responses are decoded into partial structures carrying only the fields the
//! aggregation pipeline consumes; unknown fields are ignored. The [`CommitHost`]
//! trait is the seam the aggregator and directory builder are written against.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

const GITHUB_API_BASE: &str = "https://api.github.com";
const USER_AGENT: &str = "github-activity-stats";
const PAGE_SIZE: u32 = 100;

/// Commit listings get a fixed, generous timeout; everything else uses the
/// client's default.
const COMMIT_LIST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum GithubError {
    #[error("not found")]
    NotFound,
    #[error("access denied")]
    AccessDenied,
    #[error("GitHub unavailable: {0}")]
    Unavailable(#[source] reqwest::Error),
    #[error("GitHub API request failed with status {status}: {body}")]
    Upstream { status: u16, body: String },
    #[error("failed to decode GitHub API response: {0}")]
    Decode(#[source] reqwest::Error),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Commit {
    pub sha: String,
    /// Absent when the commit author has no GitHub account association.
    pub author: Option<CommitAuthor>,
    pub commit: CommitDetail,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommitAuthor {
    pub login: String,
    #[serde(default)]
    pub avatar_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommitDetail {
    #[serde(default)]
    pub message: String,
    pub author: CommitSignature,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommitSignature {
    /// RFC3339 author date as reported by GitHub.
    #[serde(default)]
    pub date: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contributor {
    pub login: String,
    #[serde(default)]
    pub avatar_url: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RepoInfo {
    pub full_name: String,
    pub private: bool,
    #[serde(default)]
    pub fork: bool,
    #[serde(default)]
    pub created_at: String,
}

/// The upstream host the pipeline fetches from. Implemented by
/// [`GithubClient`]; tests substitute a fixture.
#[async_trait]
pub trait CommitHost: Send + Sync {
    /// List commits in a repository, newest first, optionally bounded to
    /// `[since, until)`. A single page of up to 100 commits; repos busier than
    /// that per window undercount.
    async fn list_commits(
        &self,
        repo: &str,
        since: Option<DateTime<Utc>>,
        until: Option<DateTime<Utc>>,
    ) -> Result<Vec<Commit>, GithubError>;

    /// List up to 100 contributors of a repository.
    async fn list_contributors(&self, repo: &str) -> Result<Vec<Contributor>, GithubError>;

    /// List up to 100 members of an organization.
    async fn list_org_members(&self, org: &str) -> Result<Vec<Contributor>, GithubError>;

    /// Repository metadata: full name, visibility, fork flag, creation date.
    async fn repo_info(&self, repo: &str) -> Result<RepoInfo, GithubError>;
}

#[derive(Debug)]
pub struct GithubClient {
    http: reqwest::Client,
    token: String,
    default_timeout: Duration,
}

impl GithubClient {
    pub fn new(token: impl Into<String>, default_timeout: Duration) -> Self {
        Self {
            http: reqwest::Client::new(),
            token: token.into(),
            default_timeout,
        }
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        url: &str,
        timeout: Duration,
    ) -> Result<T, GithubError> {
        let response = self
            .http
            .get(url)
            .timeout(timeout)
            .header("User-Agent", USER_AGENT)
            .header("Accept", "application/vnd.github+json")
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(GithubError::Unavailable)?;

        let status = response.status();
        match status {
            s if s.is_success() => response.json().await.map_err(GithubError::Decode),
            StatusCode::NOT_FOUND => Err(GithubError::NotFound),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(GithubError::AccessDenied),
            _ => {
                let body = response.text().await.unwrap_or_default();
                Err(GithubError::Upstream {
                    status: status.as_u16(),
                    body,
                })
            }
        }
    }
}

#[async_trait]
impl CommitHost for GithubClient {
    async fn list_commits(
        &self,
        repo: &str,
        since: Option<DateTime<Utc>>,
        until: Option<DateTime<Utc>>,
    ) -> Result<Vec<Commit>, GithubError> {
        let url = commits_url(repo, since, until);
        self.get_json(&url, COMMIT_LIST_TIMEOUT).await
    }

    async fn list_contributors(&self, repo: &str) -> Result<Vec<Contributor>, GithubError> {
        let url = format!(
            "{}/repos/{}/contributors?per_page={}",
            GITHUB_API_BASE, repo, PAGE_SIZE
        );
        self.get_json(&url, self.default_timeout).await
    }

    async fn list_org_members(&self, org: &str) -> Result<Vec<Contributor>, GithubError> {
        let url = format!(
            "{}/orgs/{}/members?per_page={}",
            GITHUB_API_BASE, org, PAGE_SIZE
        );
        self.get_json(&url, self.default_timeout).await
    }

    async fn repo_info(&self, repo: &str) -> Result<RepoInfo, GithubError> {
        let url = format!("{}/repos/{}", GITHUB_API_BASE, repo);
        self.get_json(&url, self.default_timeout).await
    }
}

fn commits_url(repo: &str, since: Option<DateTime<Utc>>, until: Option<DateTime<Utc>>) -> String {
    let mut url = format!(
        "{}/repos/{}/commits?per_page={}",
        GITHUB_API_BASE, repo, PAGE_SIZE
    );
    // Z-suffixed RFC3339 keeps '+' out of the query string.
    if let Some(since) = since {
        url.push_str("&since=");
        url.push_str(&since.to_rfc3339_opts(SecondsFormat::Secs, true));
    }
    if let Some(until) = until {
        url.push_str("&until=");
        url.push_str(&until.to_rfc3339_opts(SecondsFormat::Secs, true));
    }
    url
}

/// The repository-name segment of an `org/repo` identifier, used for display
/// grouping. Full `org/repo` is used for all upstream calls.
pub fn short_name(repo: &str) -> &str {
    repo.rsplit('/').next().unwrap_or(repo)
}

/// The organization segment of an `org/repo` identifier.
pub fn org_of(repo: &str) -> Option<&str> {
    repo.split('/').next().filter(|org| !org.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_name() {
        assert_eq!(short_name("acme/app"), "app");
        assert_eq!(short_name("app"), "app");
        assert_eq!(short_name("a/b/c"), "c");
    }

    #[test]
    fn test_org_of() {
        assert_eq!(org_of("acme/app"), Some("acme"));
        assert_eq!(org_of("app"), Some("app"));
        assert_eq!(org_of("/app"), None);
    }

    #[test]
    fn test_commits_url_window() {
        let since = DateTime::parse_from_rfc3339("2026-01-26T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let until = since + chrono::Duration::days(7);
        let url = commits_url("acme/app", Some(since), Some(until));
        assert_eq!(
            url,
            "https://api.github.com/repos/acme/app/commits?per_page=100\
             &since=2026-01-26T00:00:00Z&until=2026-02-02T00:00:00Z"
        );
        assert!(!url.contains('+'));
    }

    #[test]
    fn test_commits_url_unbounded() {
        let url = commits_url("acme/app", None, None);
        assert_eq!(url, "https://api.github.com/repos/acme/app/commits?per_page=100");
    }
}
