//! SQLite-backed memoization store that survives process restarts.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};

use super::key::CacheKey;
use super::store::{CacheEntry, CacheStore};
use crate::error::CacheError;

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS memo_cache (
    input_key   TEXT PRIMARY KEY NOT NULL,
    value       TEXT NOT NULL,
    created_at  TEXT NOT NULL
);
"#;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: u64,
    pub oldest: Option<DateTime<Utc>>,
    pub newest: Option<DateTime<Utc>>,
}

#[derive(Clone)]
pub struct SqliteCacheStore {
    pool: SqlitePool,
}

impl std::fmt::Debug for SqliteCacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SqliteCacheStore")
    }
}

impl SqliteCacheStore {
    pub async fn open(path: &str) -> Result<Self, CacheError> {
        let opts = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(opts)
            .await?;

        sqlx::query(SCHEMA_SQL).execute(&pool).await?;

        tracing::info!(path = path, "Memo cache opened");
        Ok(Self { pool })
    }

    pub async fn stats(&self) -> Result<CacheStats, CacheError> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS entries, MIN(created_at) AS oldest, MAX(created_at) AS newest
             FROM memo_cache",
        )
        .fetch_one(&self.pool)
        .await?;

        let entries: i64 = row.try_get("entries")?;
        let oldest: Option<String> = row.try_get("oldest")?;
        let newest: Option<String> = row.try_get("newest")?;

        Ok(CacheStats {
            entries: entries.max(0) as u64,
            oldest: oldest.as_deref().and_then(parse_timestamp),
            newest: newest.as_deref().and_then(parse_timestamp),
        })
    }
}

#[async_trait]
impl CacheStore for SqliteCacheStore {
    async fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>, CacheError> {
        let row = sqlx::query("SELECT value, created_at FROM memo_cache WHERE input_key = ?1")
            .bind(key.as_str())
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let value: String = row.try_get("value")?;
        let created_at: String = row.try_get("created_at")?;

        let created_at = parse_timestamp(&created_at).ok_or_else(|| CacheError::Corrupt {
            key: key.to_string(),
            reason: format!("invalid created_at '{created_at}'"),
        })?;

        Ok(Some(CacheEntry {
            input_key: key.clone(),
            value: serde_json::from_str(&value)?,
            created_at,
        }))
    }

    async fn put(&self, entry: &CacheEntry) -> Result<(), CacheError> {
        // Fixed-width UTC timestamps sort lexicographically, so MIN/MAX work on the text column.
        sqlx::query(
            "INSERT INTO memo_cache (input_key, value, created_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(input_key) DO UPDATE SET value = excluded.value",
        )
        .bind(entry.input_key.as_str())
        .bind(serde_json::to_string(&entry.value)?)
        .bind(entry.created_at.to_rfc3339_opts(SecondsFormat::Micros, true))
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_open_get_put() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("memo.db");
        let store = SqliteCacheStore::open(db_path.to_str().unwrap()).await.unwrap();

        let key = CacheKey::for_call("fetch_detail", &[("identifier", "goblin")]);
        assert!(store.get(&key).await.unwrap().is_none());

        let entry = CacheEntry::new(key.clone(), json!({"name": "Goblin", "hit_points": 7}));
        store.put(&entry).await.unwrap();

        let got = store.get(&key).await.unwrap().expect("entry present");
        assert_eq!(got.value, entry.value);
        assert_eq!(got.input_key, key);
        assert_eq!(got.created_at.timestamp(), entry.created_at.timestamp());
    }

    #[tokio::test]
    async fn test_entries_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("memo.db");
        let key = CacheKey::for_call("fetch_detail", &[("identifier", "lich")]);

        {
            let store = SqliteCacheStore::open(db_path.to_str().unwrap()).await.unwrap();
            store
                .put(&CacheEntry::new(key.clone(), json!({"name": "Lich"})))
                .await
                .unwrap();
        }

        let reopened = SqliteCacheStore::open(db_path.to_str().unwrap()).await.unwrap();
        let got = reopened.get(&key).await.unwrap().expect("persisted entry");
        assert_eq!(got.value, json!({"name": "Lich"}));
    }

    #[tokio::test]
    async fn test_path_with_url_characters_is_a_plain_filename() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("memo#1?mode=ro.db");
        let store = SqliteCacheStore::open(db_path.to_str().unwrap()).await.unwrap();

        let key = CacheKey::for_call("fetch_detail", &[("identifier", "kobold")]);
        store
            .put(&CacheEntry::new(key.clone(), json!({"name": "Kobold"})))
            .await
            .unwrap();

        assert!(db_path.exists());
        assert!(!dir.path().join("memo").exists());
        assert!(store.get(&key).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_put_same_key_keeps_single_entry() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("memo.db");
        let store = SqliteCacheStore::open(db_path.to_str().unwrap()).await.unwrap();

        let key = CacheKey::for_call("fetch_detail", &[("identifier", "orc")]);
        let entry = CacheEntry::new(key.clone(), json!({"name": "Orc"}));
        store.put(&entry).await.unwrap();
        store.put(&entry).await.unwrap();

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.entries, 1);
        assert!(stats.oldest.is_some());
        assert_eq!(stats.oldest, stats.newest);
    }

    #[tokio::test]
    async fn test_stats_empty() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("memo.db");
        let store = SqliteCacheStore::open(db_path.to_str().unwrap()).await.unwrap();

        let stats = store.stats().await.unwrap();
        assert_eq!(stats, CacheStats::default());
    }
}
