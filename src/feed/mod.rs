//! Feed service access.
//!
//! The sweep talks to the feed reader only through [`FeedSource`]; the
//! Miniflux HTTP client is the production implementation.

mod credentials;
mod miniflux;

pub use credentials::{SecretResolver, normalize_base_url};
pub use miniflux::{MinifluxClient, MinifluxHttpConfig, build_http_client};

use crate::Result;
use crate::models::{Entry, EntryId, EntryStatus, FeedId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Sort direction for entry listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Oldest first.
    #[default]
    Asc,
    /// Newest first.
    Desc,
}

impl Direction {
    /// Returns the query parameter value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which entries of a feed to list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryQuery {
    /// Read state to filter on.
    pub status: EntryStatus,
    /// Field to order by.
    pub order: String,
    /// Sort direction.
    pub direction: Direction,
    /// Only entries published at or after this instant.
    pub published_after: Option<DateTime<Utc>>,
}

impl EntryQuery {
    /// Unread entries, oldest first.
    #[must_use]
    pub fn unread_oldest_first() -> Self {
        Self {
            status: EntryStatus::Unread,
            order: "published_at".to_string(),
            direction: Direction::Asc,
            published_after: None,
        }
    }

    /// Read entries, newest first.
    #[must_use]
    pub fn read_newest_first() -> Self {
        Self {
            status: EntryStatus::Read,
            order: "published_at".to_string(),
            direction: Direction::Desc,
            published_after: None,
        }
    }

    /// Restricts the listing to entries published at or after `cutoff`.
    #[must_use]
    pub fn published_since(mut self, cutoff: DateTime<Utc>) -> Self {
        self.published_after = Some(cutoff);
        self
    }
}

/// A feed reader that can list entries and change their read state.
///
/// Implementations handle paging and transport; callers invoke
/// `fetch_entries` once per feed and status, and `update_status` once per
/// run.
pub trait FeedSource: Send + Sync {
    /// The source name, for logs.
    fn name(&self) -> &'static str;

    /// Lists every entry of `feed` matching `query`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FeedSource`](crate::Error::FeedSource) if the
    /// request fails or the response cannot be decoded.
    fn fetch_entries(&self, feed: FeedId, query: &EntryQuery) -> Result<Vec<Entry>>;

    /// Sets the read state of `ids` in one request.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FeedSource`](crate::Error::FeedSource) if the
    /// service rejects the update.
    fn update_status(&self, ids: &[EntryId], status: EntryStatus) -> Result<()>;

    /// Checks that the service is reachable and the credentials work.
    ///
    /// # Errors
    ///
    /// Returns an error if the check fails. The default implementation
    /// always succeeds.
    fn check_connection(&self) -> Result<()> {
        Ok(())
    }
}
