//! Catalog lister: one complete, flattened catalog from a paginated source.

use chrono::NaiveDate;
use std::collections::HashSet;
use std::sync::Arc;

use super::types::{CatalogEntry, CatalogSource};
use crate::cache::{CacheEntry, CacheKey, CacheStore};
use crate::error::{SourceError, SourceResult};
use crate::metrics::{CacheOutcome, MetricsCollector};
use crate::sampling::canonical_date;

/// Upper bound on followed pages, guarding against cursor loops.
pub const DEFAULT_MAX_PAGES: usize = 100;

/// Operation name under which daily catalog snapshots are memoized.
const LIST_OPERATION: &str = "list_all";

/// Lists the whole catalog, following pagination.
///
/// When constructed with a cache store, [`CatalogLister::list_for_day`]
/// memoizes the listing per calendar day, so reruns on the same day reuse
/// the snapshot and the next day picks up upstream changes.
pub struct CatalogLister {
    source: Arc<dyn CatalogSource>,
    cache: Option<Arc<dyn CacheStore>>,
    max_pages: usize,
    metrics: MetricsCollector,
}

impl CatalogLister {
    pub fn new(source: Arc<dyn CatalogSource>) -> Self {
        Self {
            source,
            cache: None,
            max_pages: DEFAULT_MAX_PAGES,
            metrics: MetricsCollector::new(),
        }
    }

    pub fn with_cache(mut self, cache: Arc<dyn CacheStore>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages.max(1);
        self
    }

    /// Fetch every page and return the flattened catalog.
    ///
    /// # Errors
    ///
    /// - `SourceUnavailable` if any page cannot be fetched
    /// - `MalformedResponse` if a page has the wrong shape, pagination does
    ///   not terminate within `max_pages`, or the flattened list disagrees
    ///   with the total the source reported
    pub async fn list_all(&self) -> SourceResult<Vec<CatalogEntry>> {
        let mut entries = Vec::new();
        let mut reported_total = None;
        let mut seen_cursors = HashSet::new();
        let mut cursor: Option<String> = None;
        let mut pages = 0usize;

        loop {
            let page = self.source.list_page(cursor.as_deref()).await?;
            pages += 1;

            if reported_total.is_none() {
                reported_total = page.total;
            }
            entries.extend(page.entries);

            let Some(next) = page.next else {
                break;
            };
            if !seen_cursors.insert(next.clone()) {
                return Err(SourceError::MalformedResponse(format!(
                    "pagination cursor '{next}' repeated"
                )));
            }
            if pages >= self.max_pages {
                return Err(SourceError::MalformedResponse(format!(
                    "pagination did not end within {} pages",
                    self.max_pages
                )));
            }
            cursor = Some(next);
        }

        if let Some(total) = reported_total {
            if total != entries.len() {
                return Err(SourceError::MalformedResponse(format!(
                    "source reported {total} entries but listed {}",
                    entries.len()
                )));
            }
        }

        tracing::info!(entries = entries.len(), pages = pages, "Catalog listed");
        Ok(entries)
    }

    /// Input key of the catalog snapshot for `date`.
    pub fn snapshot_key(&self, date: NaiveDate) -> CacheKey {
        CacheKey::for_call(
            LIST_OPERATION,
            &[
                ("source", self.source.source_id()),
                ("date", &canonical_date(date)),
            ],
        )
    }

    /// List the catalog, reusing the snapshot memoized for `date` if any.
    pub async fn list_for_day(&self, date: NaiveDate) -> SourceResult<Vec<CatalogEntry>> {
        let Some(cache) = &self.cache else {
            return self.list_all().await;
        };

        let key = self.snapshot_key(date);
        match cache.get(&key).await {
            Ok(Some(entry)) => match serde_json::from_value::<Vec<CatalogEntry>>(entry.value) {
                Ok(catalog) => {
                    tracing::info!(
                        entries = catalog.len(),
                        date = %date,
                        "Catalog served from daily snapshot"
                    );
                    self.metrics
                        .record_cache_lookup(LIST_OPERATION, CacheOutcome::Hit);
                    return Ok(catalog);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Catalog snapshot unreadable, listing again");
                    self.metrics
                        .record_cache_lookup(LIST_OPERATION, CacheOutcome::Error);
                }
            },
            Ok(None) => {
                self.metrics
                    .record_cache_lookup(LIST_OPERATION, CacheOutcome::Miss);
            }
            Err(e) => {
                tracing::warn!(error = %e, "Catalog snapshot lookup failed, listing again");
                self.metrics
                    .record_cache_lookup(LIST_OPERATION, CacheOutcome::Error);
            }
        }

        let catalog = self.list_all().await?;

        match serde_json::to_value(&catalog) {
            Ok(value) => {
                if let Err(e) = cache.put(&CacheEntry::new(key, value)).await {
                    tracing::warn!(error = %e, "Failed to store catalog snapshot");
                }
            }
            Err(e) => tracing::warn!(error = %e, "Failed to encode catalog snapshot"),
        }

        Ok(catalog)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::InMemoryCacheStore;
    use crate::collectors::{CatalogPage, RawRecord};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Source serving fixed pages addressed by "page-N" cursors.
    struct PagedSource {
        pages: Vec<CatalogPage>,
        calls: AtomicUsize,
    }

    impl PagedSource {
        fn new(pages: Vec<CatalogPage>) -> Self {
            Self {
                pages,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl CatalogSource for PagedSource {
        fn source_id(&self) -> &str {
            "paged"
        }

        async fn list_page(&self, cursor: Option<&str>) -> SourceResult<CatalogPage> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let index = match cursor {
                None => 0,
                Some(c) => c
                    .trim_start_matches("page-")
                    .parse::<usize>()
                    .map_err(|_| SourceError::MalformedResponse(c.to_string()))?,
            };
            self.pages
                .get(index)
                .cloned()
                .ok_or_else(|| SourceError::SourceUnavailable("no such page".into()))
        }

        async fn fetch_detail(&self, identifier: &str) -> SourceResult<RawRecord> {
            Err(SourceError::NotFound(identifier.to_string()))
        }
    }

    fn entries(ids: &[&str]) -> Vec<CatalogEntry> {
        ids.iter().map(|id| CatalogEntry::new(*id, id.to_uppercase())).collect()
    }

    fn page(ids: &[&str], next: Option<&str>, total: Option<usize>) -> CatalogPage {
        CatalogPage {
            entries: entries(ids),
            next: next.map(str::to_string),
            total,
        }
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, d).unwrap()
    }

    #[tokio::test]
    async fn test_single_page() {
        let lister = CatalogLister::new(Arc::new(PagedSource::new(vec![page(
            &["a", "b"],
            None,
            Some(2),
        )])));
        let catalog = lister.list_all().await.unwrap();
        assert_eq!(catalog, entries(&["a", "b"]));
    }

    #[tokio::test]
    async fn test_follows_pagination_and_flattens() {
        let source = Arc::new(PagedSource::new(vec![
            page(&["a", "b"], Some("page-1"), Some(5)),
            page(&["c", "d"], Some("page-2"), Some(5)),
            page(&["e"], None, Some(5)),
        ]));
        let lister = CatalogLister::new(source.clone());

        let catalog = lister.list_all().await.unwrap();
        assert_eq!(catalog, entries(&["a", "b", "c", "d", "e"]));
        assert_eq!(source.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_total_mismatch_is_malformed() {
        let lister = CatalogLister::new(Arc::new(PagedSource::new(vec![page(
            &["a", "b"],
            None,
            Some(3),
        )])));
        let err = lister.list_all().await.unwrap_err();
        assert!(matches!(err, SourceError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn test_repeated_cursor_is_malformed() {
        let lister = CatalogLister::new(Arc::new(PagedSource::new(vec![
            page(&["a"], Some("page-1"), None),
            page(&["b"], Some("page-1"), None),
        ])));
        let err = lister.list_all().await.unwrap_err();
        assert!(matches!(err, SourceError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn test_page_limit_enforced() {
        let lister = CatalogLister::new(Arc::new(PagedSource::new(vec![
            page(&["a"], Some("page-1"), None),
            page(&["b"], Some("page-2"), None),
            page(&["c"], None, None),
        ])))
        .with_max_pages(2);
        let err = lister.list_all().await.unwrap_err();
        assert!(matches!(err, SourceError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn test_unavailable_source_propagates() {
        let lister = CatalogLister::new(Arc::new(PagedSource::new(Vec::new())));
        let err = lister.list_all().await.unwrap_err();
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_daily_snapshot_reused_same_day_only() {
        let source = Arc::new(PagedSource::new(vec![page(&["a", "b"], None, None)]));
        let lister = CatalogLister::new(source.clone()).with_cache(Arc::new(InMemoryCacheStore::new()));

        let first = lister.list_for_day(day(19)).await.unwrap();
        let again = lister.list_for_day(day(19)).await.unwrap();
        assert_eq!(first, again);
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);

        lister.list_for_day(day(20)).await.unwrap();
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_without_cache_always_lists() {
        let source = Arc::new(PagedSource::new(vec![page(&["a"], None, None)]));
        let lister = CatalogLister::new(source.clone());

        lister.list_for_day(day(19)).await.unwrap();
        lister.list_for_day(day(19)).await.unwrap();
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }
}
