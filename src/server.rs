// Copyright (c) The github-activity-stats Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP API consumed by the dashboard widget and the mapping editor.
//!
//! Every route requires an established caller identity via the
//! `Mattermost-User-Id` header; the service itself does no session handling.

use crate::cache::WeekCache;
use crate::config::ConfigHandle;
use crate::contributors;
use crate::github::{CommitHost, GithubClient, GithubError};
use crate::identity::UserDirectory;
use crate::stats;
use anyhow::{Context, Result};
use axum::{
    Json, Router,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

const USER_ID_HEADER: &str = "Mattermost-User-Id";

/// Default timeout for upstream calls other than commit listings.
const DEFAULT_UPSTREAM_TIMEOUT: Duration = Duration::from_secs(10);

/// Cache key under which the admin-saved mapping table is persisted.
pub const MAPPINGS_KV_KEY: &str = "user_mappings";

pub struct AppState {
    pub config: ConfigHandle,
    pub cache: WeekCache,
    pub directory: Box<dyn UserDirectory>,
}

pub type SharedState = Arc<AppState>;

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/api/v1/config", get(get_config))
        .route("/api/v1/stats", get(get_stats))
        .route("/api/v1/users", get(get_mapped_users))
        .route("/api/v1/mappings", get(get_mappings).post(save_mappings))
        .route("/api/v1/github/contributors", get(get_contributors))
        .route("/api/v1/github/all-contributors", get(get_all_contributors))
        .route(
            "/api/v1/github/contributors-with-commits",
            get(get_contributors_with_commits),
        )
        .route("/api/v1/github/repo/validate", get(validate_repo))
        .route("/api/v1/mattermost/users", get(get_local_users))
        .with_state(state)
}

/// Bind and serve until the process is stopped.
pub async fn serve(addr: SocketAddr, state: SharedState) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("listening on {}", addr);
    axum::serve(listener, router(state))
        .await
        .context("server error")?;
    Ok(())
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(serde_json::json!({ "error": message }))).into_response()
}

/// The caller identity the front end forwards. Missing or empty -> 401.
fn caller_id(headers: &HeaderMap) -> Result<String, Response> {
    match headers.get(USER_ID_HEADER).and_then(|v| v.to_str().ok()) {
        Some(id) if !id.is_empty() => Ok(id.to_string()),
        _ => Err(error_response(StatusCode::UNAUTHORIZED, "unauthorized")),
    }
}

/// Reject requests that need upstream access before any network call is made.
fn require_token(config: &crate::config::Config) -> Result<GithubClient, Response> {
    if config.github_token.is_empty() {
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            "GitHub token not configured",
        ));
    }
    Ok(GithubClient::new(
        config.github_token.clone(),
        DEFAULT_UPSTREAM_TIMEOUT,
    ))
}

#[derive(Debug, Deserialize)]
struct StatsQuery {
    week_start: Option<String>,
    week_end: Option<String>,
}

async fn get_stats(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Query(query): Query<StatsQuery>,
) -> Response {
    if let Err(response) = caller_id(&headers) {
        return response;
    }
    let config = state.config.current();
    let client = match require_token(&config) {
        Ok(client) => client,
        Err(response) => return response,
    };

    let result = stats::compute_stats(
        &client,
        &state.cache,
        state.directory.as_ref(),
        &config.repo_list(),
        &config.mappings(),
        query.week_start.as_deref(),
        query.week_end.as_deref(),
    )
    .await;

    match result {
        Ok(response) => Json(response).into_response(),
        Err(err) => {
            warn!("stats computation failed: {:#}", err);
            error_response(StatusCode::BAD_REQUEST, &format!("{:#}", err))
        }
    }
}

#[derive(Debug, Serialize)]
struct ConfigResponse {
    repositories: String,
    mappings: HashMap<String, String>,
}

async fn get_config(State(state): State<SharedState>, headers: HeaderMap) -> Response {
    if let Err(response) = caller_id(&headers) {
        return response;
    }
    let config = state.config.current();
    Json(ConfigResponse {
        repositories: config.repositories.clone(),
        mappings: config.mappings(),
    })
    .into_response()
}

async fn get_mappings(State(state): State<SharedState>, headers: HeaderMap) -> Response {
    if let Err(response) = caller_id(&headers) {
        return response;
    }
    Json(state.config.current().mappings()).into_response()
}

async fn save_mappings(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Json(mappings): Json<HashMap<String, String>>,
) -> Response {
    let caller = match caller_id(&headers) {
        Ok(caller) => caller,
        Err(response) => return response,
    };
    let is_admin = state
        .directory
        .get(&caller)
        .map(|user| user.is_admin)
        .unwrap_or(false);
    if !is_admin {
        return error_response(StatusCode::FORBIDDEN, "admin only");
    }

    let encoded = match serde_json::to_string(&mappings) {
        Ok(encoded) => encoded,
        Err(err) => {
            return error_response(StatusCode::BAD_REQUEST, &format!("invalid mappings: {}", err));
        }
    };

    if let Err(err) = state.cache.put_kv(MAPPINGS_KV_KEY, &encoded).await {
        warn!("failed to persist mappings: {:#}", err);
        return error_response(StatusCode::INTERNAL_SERVER_ERROR, "failed to save");
    }
    state
        .config
        .update(move |config| config.user_mappings = encoded);

    Json(serde_json::json!({ "status": "ok" })).into_response()
}

#[derive(Debug, Serialize)]
struct MappedUser {
    id: String,
    username: String,
    nickname: String,
    email: String,
}

/// Local users currently referenced by the mapping table.
async fn get_mapped_users(State(state): State<SharedState>, headers: HeaderMap) -> Response {
    if let Err(response) = caller_id(&headers) {
        return response;
    }
    let mappings = state.config.current().mappings();

    let mut users: Vec<MappedUser> = Vec::new();
    for local_id in mappings.values() {
        if let Some(user) = state.directory.get(local_id) {
            users.push(MappedUser {
                id: user.id,
                username: user.username,
                nickname: user.nickname,
                email: user.email,
            });
        }
    }
    users.sort_by(|a, b| a.username.cmp(&b.username));
    users.dedup_by(|a, b| a.id == b.id);

    Json(users).into_response()
}

async fn get_local_users(State(state): State<SharedState>, headers: HeaderMap) -> Response {
    if let Err(response) = caller_id(&headers) {
        return response;
    }
    Json(state.directory.all()).into_response()
}

async fn get_contributors(State(state): State<SharedState>, headers: HeaderMap) -> Response {
    if let Err(response) = caller_id(&headers) {
        return response;
    }
    let config = state.config.current();
    let client = match require_token(&config) {
        Ok(client) => client,
        Err(response) => return response,
    };
    Json(contributors::list_repo_contributors(&client, &config.repo_list()).await).into_response()
}

async fn get_all_contributors(State(state): State<SharedState>, headers: HeaderMap) -> Response {
    if let Err(response) = caller_id(&headers) {
        return response;
    }
    let config = state.config.current();
    let client = match require_token(&config) {
        Ok(client) => client,
        Err(response) => return response,
    };
    Json(contributors::list_all(&client, &config.repo_list()).await).into_response()
}

async fn get_contributors_with_commits(
    State(state): State<SharedState>,
    headers: HeaderMap,
) -> Response {
    if let Err(response) = caller_id(&headers) {
        return response;
    }
    let config = state.config.current();
    let client = match require_token(&config) {
        Ok(client) => client,
        Err(response) => return response,
    };
    Json(contributors::list_with_recent_commits(&client, &config.repo_list()).await).into_response()
}

#[derive(Debug, Deserialize)]
struct ValidateQuery {
    repo: Option<String>,
}

/// Validate a single repository identifier. Always answers 200; problems are
/// reported in the body so the admin console can show them inline.
async fn validate_repo(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Query(query): Query<ValidateQuery>,
) -> Response {
    if let Err(response) = caller_id(&headers) {
        return response;
    }
    let config = state.config.current();
    let client = match require_token(&config) {
        Ok(client) => client,
        Err(response) => return response,
    };
    let Some(repo) = query.repo.filter(|r| !r.is_empty()) else {
        return Json(serde_json::json!({ "error": "repo parameter required" })).into_response();
    };

    match client.repo_info(&repo).await {
        Ok(info) => Json(serde_json::json!({
            "name": info.full_name,
            "private": info.private,
        }))
        .into_response(),
        Err(GithubError::NotFound) => {
            Json(serde_json::json!({ "error": "Repository not found" })).into_response()
        }
        Err(GithubError::AccessDenied) => {
            Json(serde_json::json!({ "error": "No access to repository" })).into_response()
        }
        Err(GithubError::Unavailable(_)) => {
            Json(serde_json::json!({ "error": "Failed to connect to GitHub" })).into_response()
        }
        Err(err) => {
            Json(serde_json::json!({ "error": format!("GitHub API error: {}", err) })).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_caller_id_present() {
        let mut headers = HeaderMap::new();
        headers.insert(USER_ID_HEADER, HeaderValue::from_static("u1"));
        assert_eq!(caller_id(&headers).unwrap(), "u1");
    }

    #[test]
    fn test_caller_id_missing_or_empty_is_unauthorized() {
        let headers = HeaderMap::new();
        let response = caller_id(&headers).unwrap_err();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let mut headers = HeaderMap::new();
        headers.insert(USER_ID_HEADER, HeaderValue::from_static(""));
        let response = caller_id(&headers).unwrap_err();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_require_token_rejects_blank_token() {
        let config = crate::config::Config::default();
        let response = require_token(&config).unwrap_err();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let config = crate::config::Config {
            github_token: "ghp_secret".to_string(),
            ..Default::default()
        };
        assert!(require_token(&config).is_ok());
    }
}
