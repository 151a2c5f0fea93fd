//! Duplicate grouping.
//!
//! Greedy first-match clustering: each item joins the earliest open group
//! whose representative it matches, or opens a new group. Results depend
//! on input order, so callers that merge several feeds should sort with
//! [`Item::chronological_cmp`] first.

use super::normalizer::TitleNormalizer;
use super::similarity::SimilarityMatcher;
use super::types::DuplicateGroup;
use crate::models::{Item, MatchPolicy};

/// Partitions a batch of items into duplicate groups.
///
/// # Example
///
/// ```rust
/// use chrono::Utc;
/// use feedsweep::models::{EntryId, FeedId, Item, MatchPolicy};
/// use feedsweep::services::deduplication::DuplicateGrouper;
///
/// let now = Utc::now();
/// let items = vec![
///     Item::new(EntryId::new(1), "Storm hits coast", FeedId::new(1), now),
///     Item::new(EntryId::new(2), "Markets rally", FeedId::new(1), now),
///     Item::new(EntryId::new(3), "Storm hits coast!", FeedId::new(2), now),
/// ];
///
/// let groups = DuplicateGrouper::group(&items, &MatchPolicy::exact());
/// assert_eq!(groups.len(), 1);
/// assert_eq!(groups[0].len(), 2);
/// ```
pub struct DuplicateGrouper;

impl DuplicateGrouper {
    /// Groups `items` under `policy`, dropping single-member groups.
    ///
    /// Items whose key is empty for the active mode are left out
    /// entirely. Group order follows the position of each group's
    /// representative; members keep input order.
    #[must_use]
    pub fn group(items: &[Item], policy: &MatchPolicy) -> Vec<DuplicateGroup> {
        let mode = policy.mode;
        let mut open: Vec<DuplicateGroup> = Vec::new();

        for item in items {
            let key = TitleNormalizer::normalize(&item.title);
            if key.is_empty_for(mode) {
                tracing::trace!(entry = %item.id, "Empty title key, not grouped");
                continue;
            }

            match open
                .iter_mut()
                .find(|g| SimilarityMatcher::similar(g.key(), &key, mode))
            {
                Some(group) => group.push(item.clone()),
                None => open.push(DuplicateGroup::new(item.clone(), key)),
            }
        }

        open.retain(DuplicateGroup::is_duplicate);
        open
    }
}
