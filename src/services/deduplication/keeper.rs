//! Keeper selection.

use super::types::{DuplicateGroup, Resolution};
use crate::models::MatchPolicy;

/// Picks the item of a group that stays unread.
///
/// 1. If the policy names a keep feed and a member comes from it, only
///    those members are candidates.
/// 2. Otherwise every member is a candidate.
///
/// The earliest-published candidate wins; ties go to the one that joined
/// the group first.
pub struct KeeperResolver;

impl KeeperResolver {
    /// Splits `group` into keeper and losers.
    ///
    /// Losers keep their group order.
    #[must_use]
    pub fn resolve(group: &DuplicateGroup, policy: &MatchPolicy) -> Resolution {
        let members = group.members();
        let preferred = policy
            .keep_feed
            .filter(|feed| members.iter().any(|m| m.feed_id == *feed));

        let keeper_index = members
            .iter()
            .enumerate()
            .filter(|(_, m)| preferred.is_none_or(|feed| m.feed_id == feed))
            .min_by_key(|(index, m)| (m.published_at, *index))
            .map_or(0, |(index, _)| index);

        let mut losers = members.to_vec();
        let keeper = losers.remove(keeper_index);
        Resolution { keeper, losers }
    }
}
