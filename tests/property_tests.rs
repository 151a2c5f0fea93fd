//! Property-based tests for the deduplication engine.
//!
//! Uses proptest to verify invariants across random inputs:
//! - Title normalization is idempotent
//! - Similarity is symmetric and monotone in the threshold
//! - Planning is deterministic
//! - Plans never mark an entry twice or mark a keeper
//! - Re-running exact matching after applying a plan finds nothing

// Property tests use expect/unwrap for simplicity - panics are acceptable in tests
#![allow(clippy::expect_used, clippy::unwrap_used)]

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use feedsweep::models::{EntryId, EntryStatus, FeedId, Item, MatchMode, MatchPolicy};
use feedsweep::services::deduplication::{
    ActionPlanner, DuplicateGrouper, KeeperResolver, SimilarityMatcher, TitleNormalizer,
};
use proptest::prelude::*;
use std::collections::HashSet;

const WORDS: &[&str] = &[
    "the", "united", "manager", "sacked", "after", "defeat", "liverpool", "chelsea", "beat",
    "31", "storm", "bridge", "closes", "rates", "held", "a", "of", "City", "WIN",
];

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

fn title_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec(prop::sample::select(WORDS), 0..5).prop_map(|words| words.join(" "))
}

fn items_strategy() -> impl Strategy<Value = Vec<Item>> {
    prop::collection::vec((title_strategy(), 1i64..4, 0i64..600), 0..25).prop_map(|rows| {
        let mut items: Vec<Item> = rows
            .into_iter()
            .enumerate()
            .map(|(i, (title, feed, minutes))| {
                Item::new(
                    EntryId::new(i64::try_from(i).unwrap() + 1),
                    title,
                    FeedId::new(feed),
                    t0() + TimeDelta::minutes(minutes),
                )
            })
            .collect();
        items.sort_by(Item::chronological_cmp);
        items
    })
}

fn consumed_strategy() -> impl Strategy<Value = Vec<Item>> {
    prop::collection::vec((title_strategy(), 0i64..48), 0..10).prop_map(|rows| {
        rows.into_iter()
            .enumerate()
            .map(|(i, (title, hours))| {
                Item::new(
                    EntryId::new(i64::try_from(i).unwrap() + 10_000),
                    title,
                    FeedId::new(1),
                    t0() - TimeDelta::hours(hours),
                )
                .with_status(EntryStatus::Read)
            })
            .collect()
    })
}

fn policy_strategy() -> impl Strategy<Value = MatchPolicy> {
    (
        prop_oneof![Just(None), (1u8..=100).prop_map(Some)],
        prop::option::of(1i64..4),
        prop::option::of(1u32..48),
    )
        .prop_map(|(threshold, keep_feed, window)| {
            let mut policy = threshold.map_or_else(MatchPolicy::exact, MatchPolicy::fuzzy);
            if let Some(feed) = keep_feed {
                policy = policy.with_keep_feed(FeedId::new(feed));
            }
            if let Some(hours) = window {
                policy = policy.with_window_hours(hours);
            }
            policy
        })
}

proptest! {
    /// Property: normalizing a normalized key changes nothing.
    #[test]
    fn prop_normalize_idempotent(title in "[a-zA-Z0-9 ,.!?'%-]{0,60}") {
        let key = TitleNormalizer::normalize(&title);
        prop_assert_eq!(TitleNormalizer::exact_key(key.exact()), key.exact());
        prop_assert_eq!(TitleNormalizer::bag_key(key.bag()), key.bag());
    }

    /// Property: similarity does not depend on argument order.
    #[test]
    fn prop_similarity_symmetric(
        a in title_strategy(),
        b in title_strategy(),
        threshold in 1u8..=100,
    ) {
        let ka = TitleNormalizer::normalize(&a);
        let kb = TitleNormalizer::normalize(&b);
        for mode in [MatchMode::Exact, MatchMode::Fuzzy { threshold }] {
            prop_assert_eq!(
                SimilarityMatcher::similar(&ka, &kb, mode),
                SimilarityMatcher::similar(&kb, &ka, mode)
            );
        }
    }

    /// Property: a pair similar at a high threshold is similar at any lower one.
    #[test]
    fn prop_threshold_monotone(
        a in title_strategy(),
        b in title_strategy(),
        low in 1u8..=100,
        high in 1u8..=100,
    ) {
        prop_assume!(high > low);
        let ka = TitleNormalizer::normalize(&a);
        let kb = TitleNormalizer::normalize(&b);
        if SimilarityMatcher::similar(&ka, &kb, MatchMode::Fuzzy { threshold: high }) {
            let lower = SimilarityMatcher::similar(&ka, &kb, MatchMode::Fuzzy { threshold: low });
            prop_assert!(lower);
        }
    }

    /// Property: the score stays within 0 to 100.
    #[test]
    fn prop_score_bounded(a in title_strategy(), b in title_strategy()) {
        let ka = TitleNormalizer::normalize(&a);
        let kb = TitleNormalizer::normalize(&b);
        let score = SimilarityMatcher::score(&ka, &kb, MatchMode::Fuzzy { threshold: 1 });
        prop_assert!((0.0..=100.0).contains(&score));
    }

    /// Property: the same input and policy always give the same plan.
    #[test]
    fn prop_plan_deterministic(
        unread in items_strategy(),
        consumed in consumed_strategy(),
        policy in policy_strategy(),
    ) {
        let planner = ActionPlanner::new(policy);
        let first = planner.plan(&unread, &consumed, t0());
        let second = planner.plan(&unread, &consumed, t0());
        prop_assert_eq!(first.actions(), second.actions());
    }

    /// Property: no entry is planned twice and no keeper is planned.
    #[test]
    fn prop_no_double_counting(
        unread in items_strategy(),
        consumed in consumed_strategy(),
        policy in policy_strategy(),
    ) {
        let plan = ActionPlanner::new(policy.clone()).plan(&unread, &consumed, t0());

        let ids = plan.ids();
        let unique: HashSet<_> = ids.iter().collect();
        prop_assert_eq!(unique.len(), ids.len());

        for group in DuplicateGrouper::group(&unread, &policy) {
            let keeper = KeeperResolver::resolve(&group, &policy).keeper;
            prop_assert!(!plan.contains(keeper.id));
        }
    }

    /// Property: empty titles are never planned.
    #[test]
    fn prop_empty_titles_never_planned(
        unread in items_strategy(),
        consumed in consumed_strategy(),
        policy in policy_strategy(),
    ) {
        let plan = ActionPlanner::new(policy).plan(&unread, &consumed, t0());
        for action in plan.actions() {
            prop_assert!(!TitleNormalizer::exact_key(&action.item.title).is_empty());
        }
    }

    /// Property: after applying an exact-mode plan, a re-run finds no duplicates.
    #[test]
    fn prop_exact_plan_idempotent(
        unread in items_strategy(),
        keep_feed in prop::option::of(1i64..4),
    ) {
        let mut policy = MatchPolicy::exact();
        if let Some(feed) = keep_feed {
            policy = policy.with_keep_feed(FeedId::new(feed));
        }
        let planner = ActionPlanner::new(policy);

        let plan = planner.plan(&unread, &[], t0());
        let remaining: Vec<Item> = unread
            .into_iter()
            .filter(|item| !plan.contains(item.id))
            .collect();

        prop_assert!(planner.plan(&remaining, &[], t0()).is_empty());
    }
}
