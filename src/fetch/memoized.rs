//! Memoized detail fetcher.
//!
//! Looks up the call's input key in the cache store before touching the
//! network. Successful results are stored before being returned; failures
//! are never stored, so the next run tries the network again.

use std::sync::Arc;

use crate::cache::{CacheEntry, CacheKey, CacheStore};
use crate::collectors::{CatalogSource, RawRecord};
use crate::error::SourceResult;
use crate::metrics::{CacheOutcome, MetricsCollector};

/// Operation name under which detail calls are memoized.
pub const FETCH_DETAIL_OPERATION: &str = "fetch_detail";

/// Fetches item details through a durable memoization layer.
pub struct MemoizedFetcher {
    source: Arc<dyn CatalogSource>,
    cache: Arc<dyn CacheStore>,
    metrics: MetricsCollector,
}

impl MemoizedFetcher {
    /// `source` is typically a [`super::RetryingSource`], so only cache misses
    /// are retried.
    pub fn new(source: Arc<dyn CatalogSource>, cache: Arc<dyn CacheStore>) -> Self {
        Self {
            source,
            cache,
            metrics: MetricsCollector::new(),
        }
    }

    /// Input key for a detail call: the source identity plus the identifier.
    pub fn input_key(&self, identifier: &str) -> CacheKey {
        CacheKey::for_call(
            FETCH_DETAIL_OPERATION,
            &[
                ("source", self.source.source_id()),
                ("identifier", identifier),
            ],
        )
    }

    pub async fn fetch_detail(&self, identifier: &str) -> SourceResult<RawRecord> {
        let key = self.input_key(identifier);

        match self.cache.get(&key).await {
            Ok(Some(entry)) => {
                tracing::debug!(identifier = %identifier, key = %key, "Cache hit");
                self.metrics
                    .record_cache_lookup(FETCH_DETAIL_OPERATION, CacheOutcome::Hit);
                return Ok(entry.value);
            }
            Ok(None) => {
                self.metrics
                    .record_cache_lookup(FETCH_DETAIL_OPERATION, CacheOutcome::Miss);
            }
            Err(e) => {
                tracing::warn!(
                    identifier = %identifier,
                    error = %e,
                    "Cache read failed, fetching from source"
                );
                self.metrics
                    .record_cache_lookup(FETCH_DETAIL_OPERATION, CacheOutcome::Error);
            }
        }

        let record = self.source.fetch_detail(identifier).await?;

        let entry = CacheEntry::new(key, record);
        if let Err(e) = self.cache.put(&entry).await {
            tracing::warn!(identifier = %identifier, error = %e, "Cache write failed");
        }

        Ok(entry.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::InMemoryCacheStore;
    use crate::collectors::CatalogPage;
    use crate::error::{CacheError, SourceError};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingSource {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl CatalogSource for CountingSource {
        fn source_id(&self) -> &str {
            "counting"
        }

        async fn list_page(&self, _cursor: Option<&str>) -> SourceResult<CatalogPage> {
            Ok(CatalogPage::default())
        }

        async fn fetch_detail(&self, identifier: &str) -> SourceResult<RawRecord> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match identifier {
                "missing" => Err(SourceError::NotFound(identifier.to_string())),
                _ => Ok(json!({"index": identifier, "name": identifier.to_uppercase()})),
            }
        }
    }

    /// Store whose every operation fails.
    struct BrokenStore;

    #[async_trait]
    impl CacheStore for BrokenStore {
        async fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>, CacheError> {
            Err(CacheError::Corrupt {
                key: key.to_string(),
                reason: "disk on fire".to_string(),
            })
        }

        async fn put(&self, entry: &CacheEntry) -> Result<(), CacheError> {
            Err(CacheError::Corrupt {
                key: entry.input_key.to_string(),
                reason: "disk on fire".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn test_second_fetch_is_served_from_cache() {
        let source = Arc::new(CountingSource::default());
        let fetcher = MemoizedFetcher::new(source.clone(), Arc::new(InMemoryCacheStore::new()));

        let first = fetcher.fetch_detail("goblin").await.unwrap();
        let second = fetcher.fetch_detail("goblin").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failures_are_not_cached() {
        let source = Arc::new(CountingSource::default());
        let cache = Arc::new(InMemoryCacheStore::new());
        let fetcher = MemoizedFetcher::new(source.clone(), cache.clone());

        assert!(fetcher.fetch_detail("missing").await.is_err());
        assert!(fetcher.fetch_detail("missing").await.is_err());

        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_cache_errors_fail_open() {
        let source = Arc::new(CountingSource::default());
        let fetcher = MemoizedFetcher::new(source.clone(), Arc::new(BrokenStore));

        let record = fetcher.fetch_detail("orc").await.unwrap();
        assert_eq!(record["name"], "ORC");
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_input_key_depends_on_source_and_identifier() {
        let fetcher = MemoizedFetcher::new(
            Arc::new(CountingSource::default()),
            Arc::new(InMemoryCacheStore::new()),
        );
        assert_eq!(fetcher.input_key("goblin"), fetcher.input_key("goblin"));
        assert_ne!(fetcher.input_key("goblin"), fetcher.input_key("orc"));
        assert_ne!(
            fetcher.input_key("goblin"),
            CacheKey::for_call(FETCH_DETAIL_OPERATION, &[("identifier", "goblin")])
        );
    }
}
