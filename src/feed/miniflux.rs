//! Miniflux client.

use super::{Direction, EntryQuery, FeedSource};
use crate::models::{Entry, EntryId, EntryStatus, FeedId};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// HTTP client configuration for the Miniflux API.
#[derive(Debug, Clone, Copy)]
pub struct MinifluxHttpConfig {
    /// Request timeout in milliseconds (0 to disable).
    pub timeout_ms: u64,
    /// Connect timeout in milliseconds (0 to disable).
    pub connect_timeout_ms: u64,
}

impl Default for MinifluxHttpConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 30_000,
            connect_timeout_ms: 5_000,
        }
    }
}

/// Builds a blocking HTTP client with configured timeouts.
#[must_use]
pub fn build_http_client(config: MinifluxHttpConfig) -> reqwest::blocking::Client {
    let mut builder = reqwest::blocking::Client::builder();
    if config.timeout_ms > 0 {
        builder = builder.timeout(Duration::from_millis(config.timeout_ms));
    }
    if config.connect_timeout_ms > 0 {
        builder = builder.connect_timeout(Duration::from_millis(config.connect_timeout_ms));
    }

    builder.build().unwrap_or_else(|err| {
        tracing::warn!("Failed to build Miniflux HTTP client: {err}");
        reqwest::blocking::Client::new()
    })
}

/// Miniflux REST API client.
#[derive(Debug)]
pub struct MinifluxClient {
    /// Base URL without the `/v1` suffix.
    base_url: String,
    /// API token sent as `X-Auth-Token`.
    api_key: SecretString,
    /// Entries requested per page.
    page_size: usize,
    /// HTTP client.
    client: reqwest::blocking::Client,
}

impl MinifluxClient {
    /// Default number of entries per page.
    pub const DEFAULT_PAGE_SIZE: usize = 250;

    /// Creates a client for `base_url` (with or without `/v1`).
    #[must_use]
    pub fn new(base_url: &str, api_key: SecretString) -> Self {
        Self {
            base_url: super::normalize_base_url(base_url),
            api_key,
            page_size: Self::DEFAULT_PAGE_SIZE,
            client: build_http_client(MinifluxHttpConfig::default()),
        }
    }

    /// Sets the page size for entry listings.
    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Sets HTTP client timeouts.
    #[must_use]
    pub fn with_http_config(mut self, config: MinifluxHttpConfig) -> Self {
        self.client = build_http_client(config);
        self
    }

    /// Returns the normalized base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/v1/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn send(
        &self,
        operation: &str,
        request: reqwest::blocking::RequestBuilder,
    ) -> Result<reqwest::blocking::Response> {
        let response = request
            .header("X-Auth-Token", self.api_key.expose_secret())
            .send()
            .map_err(|e| {
                let error_kind = if e.is_timeout() {
                    "timeout"
                } else if e.is_connect() {
                    "connect"
                } else if e.is_request() {
                    "request"
                } else {
                    "unknown"
                };
                tracing::error!(
                    source = "miniflux",
                    operation = operation,
                    error = %e,
                    error_kind = error_kind,
                    "Miniflux request failed"
                );
                Error::FeedSource {
                    operation: operation.to_string(),
                    cause: format!("{error_kind} error: {e}"),
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            tracing::error!(
                source = "miniflux",
                operation = operation,
                status = %status,
                body = %body,
                "Miniflux API returned error status"
            );
            return Err(Error::FeedSource {
                operation: operation.to_string(),
                cause: format!("API returned status: {status} - {body}"),
            });
        }
        Ok(response)
    }

    fn fetch_page(
        &self,
        feed: FeedId,
        query: &EntryQuery,
        offset: usize,
    ) -> Result<EntriesResponse> {
        let limit = self.page_size.to_string();
        let offset = offset.to_string();
        let mut request = self
            .client
            .get(self.endpoint(&format!("feeds/{feed}/entries")))
            .query(&[
                ("status", query.status.as_str()),
                ("order", query.order.as_str()),
                ("direction", query.direction.as_str()),
                ("limit", limit.as_str()),
                ("offset", offset.as_str()),
            ]);
        if let Some(after) = after_param(query) {
            request = request.query(&[("after", after)]);
        }

        self.send("fetch_entries", request)?
            .json::<EntriesResponse>()
            .map_err(|e| Error::FeedSource {
                operation: "fetch_entries".to_string(),
                cause: format!("unreadable entry page: {e}"),
            })
    }
}

impl FeedSource for MinifluxClient {
    fn name(&self) -> &'static str {
        "miniflux"
    }

    fn fetch_entries(&self, feed: FeedId, query: &EntryQuery) -> Result<Vec<Entry>> {
        let entries = collect_pages(query, |offset| self.fetch_page(feed, query, offset))?;

        tracing::debug!(
            feed = %feed,
            status = %query.status,
            count = entries.len(),
            "Fetched entries"
        );
        Ok(entries)
    }

    fn update_status(&self, ids: &[EntryId], status: EntryStatus) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let body = UpdateEntriesRequest {
            entry_ids: ids,
            status,
        };
        let request = self.client.put(self.endpoint("entries")).json(&body);
        self.send("update_entries", request)?;

        tracing::debug!(count = ids.len(), status = %status, "Updated entry status");
        Ok(())
    }

    fn check_connection(&self) -> Result<()> {
        let request = self.client.get(self.endpoint("me"));
        self.send("check_connection", request)?;
        Ok(())
    }
}

/// Value of the `after` filter. Miniflux compares strictly, so the cutoff
/// second itself is included by asking for one second earlier.
fn after_param(query: &EntryQuery) -> Option<String> {
    query
        .published_after
        .map(|cutoff| cutoff.timestamp().saturating_sub(1).to_string())
}

/// Pulls pages from `fetch_page(offset)` until the listing is exhausted.
///
/// Stops on an empty page, once `total` entries are held, or, for a
/// newest-first listing with a cutoff, once a page reaches past the cutoff.
fn collect_pages(
    query: &EntryQuery,
    mut fetch_page: impl FnMut(usize) -> Result<EntriesResponse>,
) -> Result<Vec<Entry>> {
    let mut entries: Vec<Entry> = Vec::new();
    loop {
        let page = fetch_page(entries.len())?;
        let received = page.entries.len();
        entries.extend(page.entries);

        if received == 0 || entries.len() >= page.total {
            break;
        }
        if query.direction == Direction::Desc
            && let Some(cutoff) = query.published_after
            && entries.last().is_some_and(|last| published_before(last, cutoff))
        {
            break;
        }
    }
    Ok(entries)
}

fn published_before(entry: &Entry, cutoff: DateTime<Utc>) -> bool {
    entry
        .published_at
        .as_deref()
        .and_then(|value| DateTime::parse_from_rfc3339(value.trim()).ok())
        .is_some_and(|published| published.with_timezone(&Utc) < cutoff)
}

/// One page of `GET /v1/feeds/{id}/entries`.
#[derive(Debug, Deserialize)]
struct EntriesResponse {
    #[serde(default)]
    total: usize,
    #[serde(default)]
    entries: Vec<Entry>,
}

/// Body of `PUT /v1/entries`.
#[derive(Debug, Serialize)]
struct UpdateEntriesRequest<'a> {
    entry_ids: &'a [EntryId],
    status: EntryStatus,
}
