//! Cache store seam and the in-memory implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;

use super::key::CacheKey;
use crate::collectors::RawRecord;
use crate::error::CacheError;

/// A memoized call result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub input_key: CacheKey,
    pub value: RawRecord,
    pub created_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn new(input_key: CacheKey, value: RawRecord) -> Self {
        Self {
            input_key,
            value,
            created_at: Utc::now(),
        }
    }
}

/// Persistent key-value store for memoized results.
///
/// Implementations must tolerate concurrent readers. Writing the same key
/// twice with the same value must be harmless.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>, CacheError>;

    async fn put(&self, entry: &CacheEntry) -> Result<(), CacheError>;
}

/// Process-local store, used in tests and for `--no-cache` style runs.
#[derive(Debug, Default)]
pub struct InMemoryCacheStore {
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
}

impl InMemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl CacheStore for InMemoryCacheStore {
    async fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>, CacheError> {
        let entries = self.entries.read().map_err(|_| CacheError::Corrupt {
            key: key.to_string(),
            reason: "lock poisoned".to_string(),
        })?;
        Ok(entries.get(key).cloned())
    }

    async fn put(&self, entry: &CacheEntry) -> Result<(), CacheError> {
        let mut entries = self.entries.write().map_err(|_| CacheError::Corrupt {
            key: entry.input_key.to_string(),
            reason: "lock poisoned".to_string(),
        })?;
        entries.insert(entry.input_key.clone(), entry.clone());
        Ok(())
    }
}
