//! Common types shared by catalog sources.
//!
//! Raw detail payloads are kept as untyped JSON at this boundary; all shape
//! enforcement happens in [`crate::validation`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::SourceResult;

/// An untyped detail payload exactly as the source returned it.
pub type RawRecord = serde_json::Value;

/// One item of the enumerable catalog.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Stable identifier used for detail lookups (e.g. "adult-black-dragon").
    pub identifier: String,

    /// Human readable name.
    pub display_name: String,

    /// Upstream detail path, if the source advertises one. Informational only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl CatalogEntry {
    pub fn new(identifier: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            display_name: display_name.into(),
            url: None,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }
}

/// A single page of a catalog listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogPage {
    /// Entries on this page.
    pub entries: Vec<CatalogEntry>,

    /// Cursor for the next page, if the source paginates.
    pub next: Option<String>,

    /// Total number of entries across all pages, when the source reports it.
    pub total: Option<usize>,
}

impl CatalogPage {
    /// A page that is the whole catalog.
    pub fn last_page(entries: Vec<CatalogEntry>) -> Self {
        let total = Some(entries.len());
        Self {
            entries,
            next: None,
            total,
        }
    }
}

/// Read-only provider of a list endpoint and a detail-by-identifier endpoint.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Identity of the source, part of every memoization key.
    fn source_id(&self) -> &str;

    /// Fetch one page of the catalog. `cursor` is `None` for the first page
    /// and the previous page's `next` afterwards.
    async fn list_page(&self, cursor: Option<&str>) -> SourceResult<CatalogPage>;

    /// Fetch the full record of one item.
    async fn fetch_detail(&self, identifier: &str) -> SourceResult<RawRecord>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_entry_skips_missing_url() {
        let entry = CatalogEntry::new("aboleth", "Aboleth");
        let json = serde_json::to_value(&entry).expect("serialize");
        assert_eq!(
            json,
            serde_json::json!({"identifier": "aboleth", "display_name": "Aboleth"})
        );
    }

    #[test]
    fn test_last_page_reports_total() {
        let page = CatalogPage::last_page(vec![
            CatalogEntry::new("a", "A"),
            CatalogEntry::new("b", "B"),
        ]);
        assert_eq!(page.total, Some(2));
        assert!(page.next.is_none());
    }
}
