// Copyright (c) The github-activity-stats Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite-backed cache of per-week commit stats.
//!
//! Completed weeks are immutable, so records are written once and kept
//! forever; there is no eviction or expiry path. The current week is never
//! stored (callers always recompute it), and neither are empty weeks, so a
//! transient fetch failure can still be healed by a later request.

use crate::stats::RepoWeekRecord;
use crate::week::IsoWeek;
use anyhow::{Context, Result};
use camino::Utf8Path;
use rusqlite::{Connection, OptionalExtension, params};
use tokio::sync::Mutex;

pub struct WeekCache {
    conn: Mutex<Connection>,
}

impl WeekCache {
    /// Open (and if needed create) the cache database at `path`.
    pub fn open(path: &Utf8Path) -> Result<Self> {
        let conn = Connection::open(path.as_std_path())
            .with_context(|| format!("failed to open cache database at {}", path))?;
        Self::init(conn)
    }

    /// An in-memory cache, used by tests and by the one-shot CLI when no
    /// database persistence is wanted.
    pub fn open_in_memory() -> Result<Self> {
        let conn =
            Connection::open_in_memory().context("failed to open in-memory cache database")?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            r#"
            -- WAL allows concurrent readers while a request writes back a week.
            PRAGMA journal_mode = WAL;

            -- NORMAL is safe with WAL and much faster than FULL.
            PRAGMA synchronous = NORMAL;
            "#,
        )
        .context("failed to set cache database pragmas")?;

        conn.execute_batch(
            r#"
            -- One record per (repository, completed ISO week), JSON-encoded.
            CREATE TABLE IF NOT EXISTS week_stats (
                cache_key TEXT NOT NULL,
                value TEXT NOT NULL,
                PRIMARY KEY (cache_key)
            ) WITHOUT ROWID;

            -- Small key/value side table (persisted mapping overlay).
            CREATE TABLE IF NOT EXISTS kv (
                key TEXT NOT NULL,
                value TEXT NOT NULL,
                PRIMARY KEY (key)
            ) WITHOUT ROWID;
            "#,
        )
        .context("failed to initialize cache database schema")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Look up the stored record for a (repository, week) cell.
    pub async fn get(&self, repo: &str, week: IsoWeek) -> Result<Option<RepoWeekRecord>> {
        let key = cache_key(repo, week);
        let conn = self.conn.lock().await;
        let value: Option<String> = conn
            .query_row("SELECT value FROM week_stats WHERE cache_key = ?1", [&key], |row| {
                row.get(0)
            })
            .optional()
            .context("failed to read week record")?;

        match value {
            Some(json) => {
                let record = serde_json::from_str(&json)
                    .with_context(|| format!("failed to decode cached record '{}'", key))?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    /// Store a record. Callers only invoke this for weeks strictly before the
    /// current one and with at least one non-zero commit count; the cache
    /// itself just writes what it is given (last write wins).
    pub async fn put(&self, record: &RepoWeekRecord) -> Result<()> {
        let week = IsoWeek::parse(&record.week)
            .with_context(|| format!("record carries malformed week '{}'", record.week))?;
        let key = cache_key(&record.repo, week);
        let json = serde_json::to_string(record).context("failed to encode week record")?;

        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT OR REPLACE INTO week_stats (cache_key, value) VALUES (?1, ?2)",
            params![key, json],
        )
        .context("failed to write week record")?;
        Ok(())
    }

    /// Read a value from the side key/value table.
    pub async fn get_kv(&self, key: &str) -> Result<Option<String>> {
        let conn = self.conn.lock().await;
        conn.query_row("SELECT value FROM kv WHERE key = ?1", [key], |row| row.get(0))
            .optional()
            .context("failed to read kv entry")
    }

    /// Write a value to the side key/value table.
    pub async fn put_kv(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )
        .context("failed to write kv entry")?;
        Ok(())
    }
}

fn cache_key(repo: &str, week: IsoWeek) -> String {
    format!("gh_stats_{}_{}", repo.replace('/', "_"), week)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::ContributorStat;
    use std::collections::HashMap;

    fn record(repo: &str, week: &str, commits: u64) -> RepoWeekRecord {
        let mut users = HashMap::new();
        users.insert(
            "octocat".to_string(),
            ContributorStat {
                commits,
                added: 0,
                removed: 0,
            },
        );
        RepoWeekRecord {
            week: week.to_string(),
            repo: repo.to_string(),
            users,
            fetched_at: "2026-02-02T00:00:00Z".to_string(),
        }
    }

    #[test]
    fn test_cache_key_format() {
        let week = IsoWeek::parse("2026-W05").unwrap();
        assert_eq!(cache_key("acme/app", week), "gh_stats_acme_app_2026-W05");
    }

    #[tokio::test]
    async fn test_get_absent() {
        let cache = WeekCache::open_in_memory().unwrap();
        let week = IsoWeek::parse("2026-W01").unwrap();
        assert!(cache.get("acme/app", week).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_put_then_get_roundtrip() {
        let cache = WeekCache::open_in_memory().unwrap();
        let stored = record("acme/app", "2026-W01", 4);
        cache.put(&stored).await.unwrap();

        let week = IsoWeek::parse("2026-W01").unwrap();
        let loaded = cache.get("acme/app", week).await.unwrap().unwrap();
        assert_eq!(loaded.repo, stored.repo);
        assert_eq!(loaded.week, stored.week);
        assert_eq!(loaded.fetched_at, stored.fetched_at);
        assert_eq!(loaded.users["octocat"].commits, 4);
    }

    #[tokio::test]
    async fn test_put_overwrites() {
        let cache = WeekCache::open_in_memory().unwrap();
        cache.put(&record("acme/app", "2026-W01", 1)).await.unwrap();
        cache.put(&record("acme/app", "2026-W01", 2)).await.unwrap();

        let week = IsoWeek::parse("2026-W01").unwrap();
        let loaded = cache.get("acme/app", week).await.unwrap().unwrap();
        assert_eq!(loaded.users["octocat"].commits, 2);
    }

    #[tokio::test]
    async fn test_cells_are_independent() {
        let cache = WeekCache::open_in_memory().unwrap();
        cache.put(&record("acme/app", "2026-W01", 1)).await.unwrap();
        cache.put(&record("acme/lib", "2026-W01", 2)).await.unwrap();

        let week = IsoWeek::parse("2026-W01").unwrap();
        assert_eq!(
            cache.get("acme/app", week).await.unwrap().unwrap().users["octocat"].commits,
            1
        );
        assert_eq!(
            cache.get("acme/lib", week).await.unwrap().unwrap().users["octocat"].commits,
            2
        );
        assert!(
            cache
                .get("acme/app", IsoWeek::parse("2026-W02").unwrap())
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_kv_roundtrip() {
        let cache = WeekCache::open_in_memory().unwrap();
        assert!(cache.get_kv("user_mappings").await.unwrap().is_none());
        cache.put_kv("user_mappings", r#"{"octocat":"u1"}"#).await.unwrap();
        assert_eq!(
            cache.get_kv("user_mappings").await.unwrap().unwrap(),
            r#"{"octocat":"u1"}"#
        );
    }

    #[tokio::test]
    async fn test_on_disk_persistence() {
        let dir = tempfile::tempdir().unwrap();
        let path = camino::Utf8PathBuf::from_path_buf(dir.path().join("cache.db")).unwrap();

        {
            let cache = WeekCache::open(&path).unwrap();
            cache.put(&record("acme/app", "2026-W01", 7)).await.unwrap();
        }

        let cache = WeekCache::open(&path).unwrap();
        let week = IsoWeek::parse("2026-W01").unwrap();
        let loaded = cache.get("acme/app", week).await.unwrap().unwrap();
        assert_eq!(loaded.users["octocat"].commits, 7);
    }
}
