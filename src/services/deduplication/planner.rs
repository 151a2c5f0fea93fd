//! Action planner.
//!
//! Composes grouping, keeper resolution and the already-seen index into
//! one [`ActionPlan`]:
//! 1. **Group losers**: tagged cross-feed or same-feed, filtered by scope
//! 2. **Already seen**: unread items matching a read title in the window
//!
//! Group losers come first, in group order. An item keeps the first
//! reason it was planned with, and no group keeper is ever planned.

use super::grouper::DuplicateGrouper;
use super::keeper::KeeperResolver;
use super::recent::AlreadySeenIndex;
use crate::models::{ActionPlan, DuplicateReason, EntryId, Item, MatchPolicy, PlannedAction};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::time::Instant;
use tracing::instrument;

/// Builds action plans under one policy.
///
/// # Example
///
/// ```rust
/// use chrono::{TimeDelta, TimeZone, Utc};
/// use feedsweep::models::{DuplicateReason, EntryId, FeedId, Item, MatchPolicy};
/// use feedsweep::services::deduplication::ActionPlanner;
///
/// let t = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
/// let unread = vec![
///     Item::new(EntryId::new(1), "Liverpool beat Chelsea 3-1", FeedId::new(1), t),
///     Item::new(EntryId::new(2), "liverpool beat chelsea 31", FeedId::new(2), t + TimeDelta::minutes(5)),
/// ];
///
/// let planner = ActionPlanner::new(MatchPolicy::exact().with_keep_feed(FeedId::new(1)));
/// let plan = planner.plan(&unread, &[], t);
///
/// assert_eq!(plan.ids(), vec![EntryId::new(2)]);
/// assert_eq!(plan.reason(EntryId::new(2)), Some(DuplicateReason::CrossFeedDuplicate));
/// ```
#[derive(Debug, Clone)]
pub struct ActionPlanner {
    policy: MatchPolicy,
}

impl ActionPlanner {
    /// Creates a planner for `policy`.
    #[must_use]
    pub const fn new(policy: MatchPolicy) -> Self {
        Self { policy }
    }

    /// Returns the policy in use.
    #[must_use]
    pub const fn policy(&self) -> &MatchPolicy {
        &self.policy
    }

    /// Plans which unread items to mark as read.
    ///
    /// `consumed` is only consulted when the policy has a window; `now`
    /// is the upper bound of that window.
    #[allow(clippy::cast_precision_loss)]
    #[instrument(
        skip(self, unread, consumed),
        fields(
            operation = "plan",
            mode = self.policy.mode.as_str(),
            unread = unread.len(),
            consumed = consumed.len()
        )
    )]
    pub fn plan(&self, unread: &[Item], consumed: &[Item], now: DateTime<Utc>) -> ActionPlan {
        let start = Instant::now();
        let mut plan = ActionPlan::new();

        let keepers = self.plan_group_losers(unread, &mut plan);
        self.plan_already_seen(unread, consumed, now, &keepers, &mut plan);

        let duration_ms = start.elapsed().as_secs_f64() * 1000.0;
        metrics::histogram!(
            "feedsweep_plan_duration_ms",
            "mode" => self.policy.mode.as_str()
        )
        .record(duration_ms);

        tracing::debug!(
            planned = plan.len(),
            cross_feed = plan.count_by_reason(DuplicateReason::CrossFeedDuplicate),
            same_feed = plan.count_by_reason(DuplicateReason::SameFeedDuplicate),
            already_seen = plan.count_by_reason(DuplicateReason::AlreadySeenInWindow),
            duration_ms = duration_ms,
            "Plan complete"
        );
        plan
    }

    /// Adds group losers to the plan and returns every keeper's id.
    fn plan_group_losers(&self, unread: &[Item], plan: &mut ActionPlan) -> HashSet<EntryId> {
        let groups = DuplicateGrouper::group(unread, &self.policy);
        let mut keepers = HashSet::with_capacity(groups.len());

        for group in &groups {
            let resolution = KeeperResolver::resolve(group, &self.policy);
            keepers.insert(resolution.keeper.id);

            for loser in &resolution.losers {
                let cross_feed = resolution.is_cross_feed(loser);
                if !self.policy.scope.admits(cross_feed) {
                    tracing::trace!(
                        entry = %loser.id,
                        keeper = %resolution.keeper.id,
                        "Loser outside duplicate scope, left unread"
                    );
                    continue;
                }
                let reason = if cross_feed {
                    DuplicateReason::CrossFeedDuplicate
                } else {
                    DuplicateReason::SameFeedDuplicate
                };
                plan.push(PlannedAction {
                    item: loser.clone(),
                    reason,
                    kept: Some(resolution.keeper.id),
                });
            }
        }

        tracing::debug!(groups = groups.len(), "Grouped unread entries");
        keepers
    }

    fn plan_already_seen(
        &self,
        unread: &[Item],
        consumed: &[Item],
        now: DateTime<Utc>,
        keepers: &HashSet<EntryId>,
        plan: &mut ActionPlan,
    ) {
        let Some(window) = self.policy.window else {
            return;
        };

        let index = AlreadySeenIndex::build(consumed, now, window);
        if index.is_empty() {
            return;
        }

        for item in index.flag(unread) {
            if keepers.contains(&item.id) || plan.contains(item.id) {
                continue;
            }
            plan.push(PlannedAction {
                item: item.clone(),
                reason: DuplicateReason::AlreadySeenInWindow,
                kept: index.matched_by(&item.title),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DuplicateScope, EntryStatus, FeedId};
    use chrono::{TimeDelta, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
    }

    fn item(id: i64, title: &str, feed: i64, minutes: i64) -> Item {
        Item::new(
            EntryId::new(id),
            title,
            FeedId::new(feed),
            t0() + TimeDelta::minutes(minutes),
        )
    }

    fn read(id: i64, title: &str, hours_ago: i64) -> Item {
        Item::new(
            EntryId::new(id),
            title,
            FeedId::new(9),
            t0() - TimeDelta::hours(hours_ago),
        )
        .with_status(EntryStatus::Read)
    }

    #[test]
    fn test_same_and_cross_feed_reasons() {
        let unread = vec![
            item(1, "Story", 1, 0),
            item(2, "story", 1, 1),
            item(3, "STORY!", 2, 2),
        ];
        let plan = ActionPlanner::new(MatchPolicy::exact()).plan(&unread, &[], t0());

        assert_eq!(plan.ids(), vec![EntryId::new(2), EntryId::new(3)]);
        assert_eq!(
            plan.reason(EntryId::new(2)),
            Some(DuplicateReason::SameFeedDuplicate)
        );
        assert_eq!(
            plan.reason(EntryId::new(3)),
            Some(DuplicateReason::CrossFeedDuplicate)
        );
        assert_eq!(plan.actions()[0].kept, Some(EntryId::new(1)));
    }

    #[test]
    fn test_scope_filters_losers() {
        let unread = vec![
            item(1, "Story", 1, 0),
            item(2, "story", 1, 1),
            item(3, "STORY!", 2, 2),
        ];

        let cross = MatchPolicy::exact().with_scope(DuplicateScope::CrossFeed);
        let plan = ActionPlanner::new(cross).plan(&unread, &[], t0());
        assert_eq!(plan.ids(), vec![EntryId::new(3)]);

        let same = MatchPolicy::exact().with_scope(DuplicateScope::SameFeed);
        let plan = ActionPlanner::new(same).plan(&unread, &[], t0());
        assert_eq!(plan.ids(), vec![EntryId::new(2)]);
    }

    #[test]
    fn test_group_reason_wins_over_already_seen() {
        let unread = vec![item(1, "Story", 1, 0), item(2, "Story", 2, 1)];
        let consumed = vec![read(50, "story", 2)];
        let policy = MatchPolicy::exact().with_window_hours(24);
        let plan = ActionPlanner::new(policy).plan(&unread, &consumed, t0());

        assert_eq!(plan.len(), 1);
        assert_eq!(
            plan.reason(EntryId::new(2)),
            Some(DuplicateReason::CrossFeedDuplicate)
        );
    }

    #[test]
    fn test_keeper_never_flagged_already_seen() {
        let unread = vec![item(1, "Story", 1, 0), item(2, "Story", 2, 1)];
        let consumed = vec![read(50, "story", 2)];
        let policy = MatchPolicy::exact().with_window_hours(24);
        let plan = ActionPlanner::new(policy).plan(&unread, &consumed, t0());

        assert!(!plan.contains(EntryId::new(1)));
    }

    #[test]
    fn test_already_seen_flags_after_group_losers() {
        let unread = vec![
            item(1, "Repeat", 3, 0),
            item(2, "Pair", 1, 1),
            item(3, "pair", 2, 2),
        ];
        let consumed = vec![read(50, "repeat", 1)];
        let policy = MatchPolicy::exact().with_window_hours(24);
        let plan = ActionPlanner::new(policy).plan(&unread, &consumed, t0());

        assert_eq!(plan.ids(), vec![EntryId::new(3), EntryId::new(1)]);
        assert_eq!(
            plan.reason(EntryId::new(1)),
            Some(DuplicateReason::AlreadySeenInWindow)
        );
    }

    #[test]
    fn test_no_window_ignores_consumed() {
        let unread = vec![item(1, "Repeat", 3, 0)];
        let consumed = vec![read(50, "repeat", 1)];
        let plan = ActionPlanner::new(MatchPolicy::exact()).plan(&unread, &consumed, t0());
        assert!(plan.is_empty());
    }

    #[test]
    fn test_scope_filtered_loser_can_still_be_already_seen() {
        let unread = vec![item(1, "Story", 1, 0), item(2, "story", 1, 1)];
        let consumed = vec![read(50, "story", 1)];
        let policy = MatchPolicy::exact()
            .with_scope(DuplicateScope::CrossFeed)
            .with_window_hours(24);
        let plan = ActionPlanner::new(policy).plan(&unread, &consumed, t0());

        assert_eq!(plan.ids(), vec![EntryId::new(2)]);
        assert_eq!(
            plan.reason(EntryId::new(2)),
            Some(DuplicateReason::AlreadySeenInWindow)
        );
    }

    #[test]
    fn test_rerun_after_apply_is_empty() {
        let unread = vec![
            item(1, "Story", 1, 0),
            item(2, "story", 2, 1),
            item(3, "Other", 1, 2),
        ];
        let planner = ActionPlanner::new(MatchPolicy::exact());
        let plan = planner.plan(&unread, &[], t0());

        let remaining: Vec<Item> = unread
            .into_iter()
            .filter(|i| !plan.contains(i.id))
            .collect();
        assert!(planner.plan(&remaining, &[], t0()).is_empty());
    }
}
