//! D&D 5e SRD API client.
//!
//! Lists the monster catalog from `/api/monsters` and fetches individual
//! stat blocks from `/api/monsters/{index}`. The list endpoint currently
//! returns the whole catalog in a single envelope; a `next` link is followed
//! if the API ever starts paginating.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;

use super::types::{CatalogEntry, CatalogPage, CatalogSource, RawRecord};
use crate::error::{SourceError, SourceResult};

/// Public D&D 5e SRD API.
pub const DEFAULT_BASE_URL: &str = "https://www.dnd5eapi.co";

/// Path of the monster collection.
const MONSTERS_PATH: &str = "/api/monsters";

/// Request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 30;

const USER_AGENT: &str = "monster-forge/0.1";

/// List envelope returned by `/api/monsters`.
#[derive(Debug, Deserialize)]
struct ListEnvelope {
    #[serde(default)]
    count: Option<usize>,
    results: Vec<ListItem>,
    #[serde(default)]
    next: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ListItem {
    index: String,
    name: String,
    #[serde(default)]
    url: Option<String>,
}

/// HTTP client for the D&D 5e SRD API.
pub struct Dnd5eClient {
    http_client: Client,
    base_url: String,
}

impl Dnd5eClient {
    /// Create a client against the public API with the default timeout.
    pub fn new() -> SourceResult<Self> {
        Self::with_base_url(DEFAULT_BASE_URL, Duration::from_secs(REQUEST_TIMEOUT_SECS))
    }

    /// Create a client against a custom base URL (mirrors, local proxies).
    pub fn with_base_url(base_url: impl Into<String>, timeout: Duration) -> SourceResult<Self> {
        let http_client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| {
                SourceError::SourceUnavailable(format!("failed to build HTTP client: {e}"))
            })?;

        Ok(Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Resolve a pagination cursor, which may be absolute or a path.
    fn resolve(&self, cursor: &str) -> String {
        if cursor.starts_with("http://") || cursor.starts_with("https://") {
            cursor.to_string()
        } else {
            format!("{}/{}", self.base_url, cursor.trim_start_matches('/'))
        }
    }

    fn detail_url(&self, identifier: &str) -> String {
        format!(
            "{}{}/{}",
            self.base_url,
            MONSTERS_PATH,
            urlencoding::encode(identifier)
        )
    }

    /// GET a URL and decode the body as JSON, mapping failures onto the
    /// source error taxonomy.
    async fn get_json(&self, url: &str, identifier: Option<&str>) -> SourceResult<RawRecord> {
        let response = self
            .http_client
            .get(url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| transport_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(status_error(status, url, identifier));
        }

        response.json::<RawRecord>().await.map_err(|e| {
            if e.is_decode() {
                SourceError::MalformedResponse(format!("{url}: body is not JSON: {e}"))
            } else {
                transport_error(url, e)
            }
        })
    }
}

#[async_trait]
impl CatalogSource for Dnd5eClient {
    fn source_id(&self) -> &str {
        &self.base_url
    }

    async fn list_page(&self, cursor: Option<&str>) -> SourceResult<CatalogPage> {
        let url = match cursor {
            Some(c) => self.resolve(c),
            None => format!("{}{}", self.base_url, MONSTERS_PATH),
        };

        tracing::debug!(url = %url, "Fetching monster list page");
        let body = self.get_json(&url, None).await?;
        parse_list_page(body)
    }

    async fn fetch_detail(&self, identifier: &str) -> SourceResult<RawRecord> {
        let url = self.detail_url(identifier);
        tracing::debug!(identifier = %identifier, url = %url, "Fetching monster details");

        let body = self.get_json(&url, Some(identifier)).await?;
        if !body.is_object() {
            return Err(SourceError::MalformedResponse(format!(
                "{url}: expected a JSON object"
            )));
        }
        Ok(body)
    }
}

/// Decode a list envelope into a catalog page.
fn parse_list_page(body: RawRecord) -> SourceResult<CatalogPage> {
    let envelope: ListEnvelope = serde_json::from_value(body).map_err(|e| {
        SourceError::MalformedResponse(format!("unexpected monster list shape: {e}"))
    })?;

    let entries = envelope
        .results
        .into_iter()
        .map(|item| {
            let entry = CatalogEntry::new(item.index, item.name);
            match item.url {
                Some(url) => entry.with_url(url),
                None => entry,
            }
        })
        .collect();

    Ok(CatalogPage {
        entries,
        next: envelope.next.filter(|n| !n.is_empty()),
        total: envelope.count,
    })
}

fn transport_error(url: &str, err: reqwest::Error) -> SourceError {
    if err.is_timeout() {
        SourceError::SourceUnavailable(format!("{url}: request timed out"))
    } else {
        SourceError::SourceUnavailable(format!("{url}: {err}"))
    }
}

fn status_error(status: StatusCode, url: &str, identifier: Option<&str>) -> SourceError {
    match (status, identifier) {
        (StatusCode::NOT_FOUND, Some(id)) => SourceError::NotFound(id.to_string()),
        (s, _)
            if s.is_server_error()
                || s == StatusCode::TOO_MANY_REQUESTS
                || s == StatusCode::REQUEST_TIMEOUT =>
        {
            SourceError::SourceUnavailable(format!("{url}: API returned status {s}"))
        }
        (s, _) => SourceError::MalformedResponse(format!("{url}: API returned status {s}")),
    }
}
