//! Already-seen index.
//!
//! Catches stories that come back as new unread entries in a later run
//! than their original. The index holds the order-preserving keys of
//! entries already read within a trailing window.

use super::normalizer::TitleNormalizer;
use crate::models::{EntryId, Item};
use chrono::{DateTime, TimeDelta, Utc};
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use tracing::instrument;

/// Exact title keys of recently read entries.
///
/// # How it works
///
/// 1. `build` keeps every read entry with `now - window <= published_at <= now`
///    (both bounds inclusive) and a non-empty key
/// 2. `flag` returns the unread entries whose key is in the index
///
/// The index is built once per run and dropped with it; nothing carries
/// over between runs.
///
/// # Example
///
/// ```rust
/// use chrono::{TimeDelta, TimeZone, Utc};
/// use feedsweep::models::{EntryId, EntryStatus, FeedId, Item};
/// use feedsweep::services::deduplication::AlreadySeenIndex;
///
/// let now = Utc.with_ymd_and_hms(2025, 3, 2, 12, 0, 0).unwrap();
/// let read = vec![
///     Item::new(EntryId::new(1), "Storm hits coast", FeedId::new(1), now - TimeDelta::hours(3))
///         .with_status(EntryStatus::Read),
/// ];
/// let index = AlreadySeenIndex::build(&read, now, TimeDelta::hours(24));
///
/// let unread = vec![Item::new(EntryId::new(2), "Storm hits coast!", FeedId::new(2), now)];
/// assert_eq!(index.flag(&unread).len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct AlreadySeenIndex {
    /// Exact key to the first read entry that produced it.
    keys: HashMap<String, EntryId>,
}

impl AlreadySeenIndex {
    /// Builds the index from read entries published within `window` of `now`.
    #[must_use]
    #[instrument(
        skip(consumed),
        fields(operation = "build_already_seen", consumed = consumed.len())
    )]
    pub fn build(consumed: &[Item], now: DateTime<Utc>, window: TimeDelta) -> Self {
        let oldest = now
            .checked_sub_signed(window)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let mut keys = HashMap::new();

        for item in consumed {
            if item.published_at < oldest || item.published_at > now {
                continue;
            }
            let key = TitleNormalizer::exact_key(&item.title);
            if key.is_empty() {
                continue;
            }
            if let Entry::Vacant(slot) = keys.entry(key) {
                slot.insert(item.id);
            }
        }

        tracing::debug!(keys = keys.len(), "Built already-seen index");
        Self { keys }
    }

    /// Returns true if `key` (an exact key) is in the index.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains_key(key)
    }

    /// Returns the read entry a title matches, if any.
    #[must_use]
    pub fn matched_by(&self, title: &str) -> Option<EntryId> {
        let key = TitleNormalizer::exact_key(title);
        if key.is_empty() {
            return None;
        }
        self.keys.get(&key).copied()
    }

    /// Returns the unread items whose title was already seen, in input order.
    #[must_use]
    pub fn flag<'a>(&self, unread: &'a [Item]) -> Vec<&'a Item> {
        unread
            .iter()
            .filter(|item| self.matched_by(&item.title).is_some())
            .collect()
    }

    /// Returns the number of distinct keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Returns true if the index holds no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}
