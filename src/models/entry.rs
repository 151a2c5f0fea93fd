//! Feed entries.

use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Identifier of a feed entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(i64);

impl EntryId {
    /// Creates a new entry ID.
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Returns the raw identifier.
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for EntryId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// Identifier of a feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeedId(i64);

impl FeedId {
    /// Creates a new feed ID.
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Returns the raw identifier.
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for FeedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for FeedId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// Read state of an entry on the feed service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    /// Not yet read.
    #[default]
    Unread,
    /// Read (consumed).
    Read,
    /// Removed from the reader.
    Removed,
}

impl EntryStatus {
    /// Returns the wire name of the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unread => "unread",
            Self::Read => "read",
            Self::Removed => "removed",
        }
    }

    /// Parses a status string.
    ///
    /// `consumed` is accepted as an alias for `read`.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "unread" => Some(Self::Unread),
            "read" | "consumed" => Some(Self::Read),
            "removed" => Some(Self::Removed),
            _ => None,
        }
    }
}

impl fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An entry as delivered by the feed service.
///
/// Every field is optional so that a single malformed entry never fails
/// deserialization of a whole page. Use [`Item::try_from`] to validate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// Entry identifier.
    #[serde(default)]
    pub id: Option<EntryId>,
    /// Entry title.
    #[serde(default)]
    pub title: Option<String>,
    /// Feed the entry belongs to.
    #[serde(default)]
    pub feed_id: Option<FeedId>,
    /// Publication timestamp (RFC 3339).
    #[serde(default)]
    pub published_at: Option<String>,
    /// Read state.
    #[serde(default)]
    pub status: Option<EntryStatus>,
}

/// A validated entry that can take part in duplicate detection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Entry identifier.
    pub id: EntryId,
    /// Raw title.
    pub title: String,
    /// Feed the entry belongs to.
    pub feed_id: FeedId,
    /// Publication timestamp.
    pub published_at: DateTime<Utc>,
    /// Read state.
    pub status: EntryStatus,
}

impl Item {
    /// Creates an unread item.
    #[must_use]
    pub fn new(
        id: EntryId,
        title: impl Into<String>,
        feed_id: FeedId,
        published_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            title: title.into(),
            feed_id,
            published_at,
            status: EntryStatus::Unread,
        }
    }

    /// Sets the read state.
    #[must_use]
    pub const fn with_status(mut self, status: EntryStatus) -> Self {
        self.status = status;
        self
    }

    /// Orders items by publication time, then by id.
    ///
    /// Sorting a batch with this before grouping makes the result
    /// independent of the order in which feeds were fetched.
    #[must_use]
    pub fn chronological_cmp(&self, other: &Self) -> Ordering {
        self.published_at
            .cmp(&other.published_at)
            .then_with(|| self.id.cmp(&other.id))
    }
}

impl TryFrom<Entry> for Item {
    type Error = Error;

    fn try_from(entry: Entry) -> Result<Self> {
        let Some(id) = entry.id else {
            return Err(invalid_entry("<unknown>", "missing id"));
        };
        let Some(title) = entry.title else {
            return Err(invalid_entry(id, "missing title"));
        };
        let Some(feed_id) = entry.feed_id else {
            return Err(invalid_entry(id, "missing feed_id"));
        };
        let Some(published_at) = entry.published_at else {
            return Err(invalid_entry(id, "missing published_at"));
        };
        let published_at = DateTime::parse_from_rfc3339(published_at.trim())
            .map_err(|e| invalid_entry(id, &format!("unparseable published_at: {e}")))?
            .with_timezone(&Utc);

        Ok(Self {
            id,
            title,
            feed_id,
            published_at,
            status: entry.status.unwrap_or_default(),
        })
    }
}

fn invalid_entry(entry: impl fmt::Display, reason: &str) -> Error {
    Error::InvalidEntry {
        entry: entry.to_string(),
        reason: reason.to_string(),
    }
}
