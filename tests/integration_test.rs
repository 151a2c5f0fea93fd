//! Integration tests for feedsweep.
#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::panic,
    clippy::too_many_lines,
    clippy::doc_markdown
)]

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use feedsweep::feed::{EntryQuery, FeedSource};
use feedsweep::models::{
    DuplicateReason, Entry, EntryId, EntryStatus, FeedId, Item, MatchMode, MatchPolicy,
};
use feedsweep::services::deduplication::{
    ActionPlanner, SimilarityMatcher, TitleNormalizer,
};
use feedsweep::services::{ApplyOutcome, SweepJob, SweepService};
use feedsweep::{Error, Result};
use std::collections::HashMap;
use std::sync::Mutex;

const FOOTBALL: FeedId = FeedId::new(482);
const SPORT: FeedId = FeedId::new(621);

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 9, 18, 0, 0).unwrap()
}

fn item(id: i64, title: &str, feed: FeedId, published_at: DateTime<Utc>) -> Item {
    Item::new(EntryId::new(id), title, feed, published_at)
}

fn entry(id: i64, title: &str, feed: FeedId, published_at: DateTime<Utc>) -> Entry {
    Entry {
        id: Some(EntryId::new(id)),
        title: Some(title.to_string()),
        feed_id: Some(feed),
        published_at: Some(published_at.to_rfc3339()),
        status: None,
    }
}

// ============================================================================
// Engine scenarios
// ============================================================================

#[test]
fn test_exact_cross_feed_duplicate_is_marked() {
    let unread = vec![
        item(1, "Liverpool beat Chelsea 3-1", FOOTBALL, t0()),
        item(2, "liverpool beat chelsea 31", SPORT, t0() + TimeDelta::minutes(5)),
    ];
    let policy = MatchPolicy::exact().with_keep_feed(FOOTBALL);

    let plan = ActionPlanner::new(policy).plan(&unread, &[], t0());

    assert_eq!(plan.ids(), vec![EntryId::new(2)]);
    assert_eq!(
        plan.reason(EntryId::new(2)),
        Some(DuplicateReason::CrossFeedDuplicate)
    );
    assert_eq!(plan.actions()[0].kept, Some(EntryId::new(1)));
}

#[test]
fn test_keep_feed_wins_over_earlier_item() {
    let unread = vec![
        item(1, "Liverpool beat Chelsea 3-1", SPORT, t0()),
        item(2, "Liverpool beat Chelsea 3-1", FOOTBALL, t0() + TimeDelta::minutes(5)),
    ];
    let policy = MatchPolicy::exact().with_keep_feed(FOOTBALL);

    let plan = ActionPlanner::new(policy).plan(&unread, &[], t0());

    assert_eq!(plan.ids(), vec![EntryId::new(1)]);
}

#[test]
fn test_fuzzy_threshold_decides_similarity() {
    let a = TitleNormalizer::normalize("Man United sack manager after defeat");
    let b = TitleNormalizer::normalize("Manchester United sack manager following defeat");

    assert!(SimilarityMatcher::similar(
        &a,
        &b,
        MatchMode::Fuzzy { threshold: 88 }
    ));
    assert!(!SimilarityMatcher::similar(
        &a,
        &b,
        MatchMode::Fuzzy { threshold: 97 }
    ));

    let unread = vec![
        item(1, "Man United sack manager after defeat", FOOTBALL, t0()),
        item(
            2,
            "Manchester United sack manager following defeat",
            FOOTBALL,
            t0() + TimeDelta::minutes(1),
        ),
    ];
    let loose = ActionPlanner::new(MatchPolicy::fuzzy(88)).plan(&unread, &[], t0());
    assert_eq!(loose.ids(), vec![EntryId::new(2)]);
    assert_eq!(
        loose.reason(EntryId::new(2)),
        Some(DuplicateReason::SameFeedDuplicate)
    );

    let strict = ActionPlanner::new(MatchPolicy::fuzzy(97)).plan(&unread, &[], t0());
    assert!(strict.is_empty());
}

#[test]
fn test_window_boundary_is_inclusive() {
    let now = t0();
    let unread = vec![item(10, "Storm closes bridge", FOOTBALL, now)];
    let policy = MatchPolicy::exact().with_window_hours(24);

    let at_edge = vec![
        item(1, "storm closes bridge", SPORT, now - TimeDelta::hours(24))
            .with_status(EntryStatus::Read),
    ];
    let plan = ActionPlanner::new(policy.clone()).plan(&unread, &at_edge, now);
    assert_eq!(
        plan.reason(EntryId::new(10)),
        Some(DuplicateReason::AlreadySeenInWindow)
    );
    assert_eq!(plan.actions()[0].kept, Some(EntryId::new(1)));

    let past_edge = vec![
        item(
            1,
            "storm closes bridge",
            SPORT,
            now - TimeDelta::hours(24) - TimeDelta::seconds(1),
        )
        .with_status(EntryStatus::Read),
    ];
    let plan = ActionPlanner::new(policy).plan(&unread, &past_edge, now);
    assert!(plan.is_empty());
}

#[test]
fn test_empty_title_never_grouped_or_flagged() {
    let now = t0();
    let unread = vec![
        item(1, "", FOOTBALL, now),
        item(2, "", SPORT, now),
        item(3, "the and of", SPORT, now),
    ];
    let consumed = vec![item(9, "", FOOTBALL, now).with_status(EntryStatus::Read)];

    for policy in [
        MatchPolicy::exact().with_window_hours(24),
        MatchPolicy::fuzzy(50).with_window_hours(24),
    ] {
        let plan = ActionPlanner::new(policy).plan(&unread, &consumed, now);
        assert!(!plan.contains(EntryId::new(1)));
        assert!(!plan.contains(EntryId::new(2)));
    }
}

#[test]
fn test_group_loser_not_double_counted_by_window() {
    let now = t0();
    let unread = vec![
        item(1, "Rates held at 5%", FOOTBALL, now - TimeDelta::hours(2)),
        item(2, "Rates held at 5%", SPORT, now - TimeDelta::hours(1)),
    ];
    let consumed = vec![
        item(9, "rates held at 5", FOOTBALL, now - TimeDelta::hours(3))
            .with_status(EntryStatus::Read),
    ];
    let policy = MatchPolicy::exact().with_window_hours(24);

    let plan = ActionPlanner::new(policy).plan(&unread, &consumed, now);

    assert_eq!(plan.len(), 1);
    assert_eq!(
        plan.reason(EntryId::new(2)),
        Some(DuplicateReason::CrossFeedDuplicate)
    );
    // The keeper stays unread even though a read copy exists.
    assert!(!plan.contains(EntryId::new(1)));
}

// ============================================================================
// Sweep runs against an in-memory feed source
// ============================================================================

#[derive(Default)]
struct MemorySource {
    unread: HashMap<FeedId, Vec<Entry>>,
    read: HashMap<FeedId, Vec<Entry>>,
    fail_fetch: bool,
    fail_update: bool,
    updates: Mutex<Vec<(Vec<EntryId>, EntryStatus)>>,
    queries: Mutex<Vec<(FeedId, EntryQuery)>>,
}

impl MemorySource {
    fn with_unread(mut self, feed: FeedId, entries: Vec<Entry>) -> Self {
        self.unread.insert(feed, entries);
        self
    }

    fn with_read(mut self, feed: FeedId, entries: Vec<Entry>) -> Self {
        self.read.insert(feed, entries);
        self
    }
}

impl FeedSource for MemorySource {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn fetch_entries(&self, feed: FeedId, query: &EntryQuery) -> Result<Vec<Entry>> {
        self.queries.lock().unwrap().push((feed, query.clone()));
        if self.fail_fetch {
            return Err(Error::FeedSource {
                operation: "list_entries".to_string(),
                cause: "connection refused".to_string(),
            });
        }
        let store = match query.status {
            EntryStatus::Unread => &self.unread,
            _ => &self.read,
        };
        Ok(store.get(&feed).cloned().unwrap_or_default())
    }

    fn update_status(&self, ids: &[EntryId], status: EntryStatus) -> Result<()> {
        if self.fail_update {
            return Err(Error::FeedSource {
                operation: "update_entries".to_string(),
                cause: "HTTP 500".to_string(),
            });
        }
        self.updates.lock().unwrap().push((ids.to_vec(), status));
        Ok(())
    }
}

fn football_source() -> MemorySource {
    MemorySource::default()
        .with_unread(
            SPORT,
            vec![entry(
                2,
                "liverpool beat chelsea 31",
                SPORT,
                t0() + TimeDelta::minutes(5),
            )],
        )
        .with_unread(
            FOOTBALL,
            vec![
                entry(1, "Liverpool beat Chelsea 3-1", FOOTBALL, t0()),
                entry(3, "Arsenal draw at Villa", FOOTBALL, t0()),
            ],
        )
}

fn football_job() -> SweepJob {
    SweepJob::new(
        "football",
        vec![FOOTBALL, SPORT],
        MatchPolicy::exact().with_keep_feed(FOOTBALL),
    )
}

#[test]
fn test_sweep_applies_one_bulk_update() {
    let service = SweepService::new(football_source());

    let report = service.run(&football_job(), t0()).unwrap();

    assert!(report.is_success());
    assert_eq!(report.fetched_unread, 3);
    assert_eq!(report.fetched_read, 0);
    assert_eq!(
        report.apply,
        ApplyOutcome::Applied {
            status: EntryStatus::Read,
            count: 1
        }
    );
    let updates = service.source().updates.lock().unwrap();
    assert_eq!(
        *updates,
        vec![(vec![EntryId::new(2)], EntryStatus::Read)]
    );
}

#[test]
fn test_sweep_without_window_skips_read_fetch() {
    let service = SweepService::new(football_source());
    service.run(&football_job(), t0()).unwrap();

    let queries = service.source().queries.lock().unwrap();
    assert_eq!(queries.len(), 2);
    assert!(queries.iter().all(|(_, query)| query.status == EntryStatus::Unread));
}

#[test]
fn test_sweep_dry_run_updates_nothing() {
    let service = SweepService::new(football_source());
    let job = football_job().with_dry_run(true);

    let report = service.run(&job, t0()).unwrap();

    assert_eq!(report.apply, ApplyOutcome::DryRun { count: 1 });
    assert_eq!(report.plan.ids(), vec![EntryId::new(2)]);
    assert!(service.source().updates.lock().unwrap().is_empty());
}

#[test]
fn test_sweep_update_failure_keeps_plan() {
    let mut source = football_source();
    source.fail_update = true;
    let service = SweepService::new(source);

    let report = service.run(&football_job(), t0()).unwrap();

    assert!(!report.is_success());
    assert!(matches!(report.apply, ApplyOutcome::Failed { .. }));
    assert_eq!(report.plan.ids(), vec![EntryId::new(2)]);
}

#[test]
fn test_sweep_fetch_failure_aborts() {
    let mut source = football_source();
    source.fail_fetch = true;
    let service = SweepService::new(source);

    let err = service.run(&football_job(), t0()).unwrap_err();

    assert!(matches!(err, Error::FeedSource { .. }));
    assert!(service.source().updates.lock().unwrap().is_empty());
}

#[test]
fn test_sweep_invalid_job_fetches_nothing() {
    let service = SweepService::new(football_source());
    let job = SweepJob::new("broken", vec![FOOTBALL], MatchPolicy::fuzzy(0));

    let err = service.run(&job, t0()).unwrap_err();

    assert!(matches!(err, Error::InvalidConfig(_)));
    assert!(service.source().queries.lock().unwrap().is_empty());
}

#[test]
fn test_sweep_skips_malformed_entries() {
    let mut no_title = entry(7, "x", FOOTBALL, t0());
    no_title.title = None;
    let mut bad_date = entry(8, "Liverpool beat Chelsea 3-1", FOOTBALL, t0());
    bad_date.published_at = Some("yesterday".to_string());

    let mut source = football_source();
    source
        .unread
        .get_mut(&FOOTBALL)
        .unwrap()
        .extend([no_title, bad_date]);
    let service = SweepService::new(source);

    let report = service.run(&football_job(), t0()).unwrap();

    assert_eq!(report.fetched_unread, 5);
    assert_eq!(report.skipped.len(), 2);
    assert_eq!(report.skipped[0].entry, "7");
    assert_eq!(report.plan.ids(), vec![EntryId::new(2)]);
}

#[test]
fn test_sweep_window_uses_read_entries() {
    let now = t0() + TimeDelta::hours(1);
    let source = football_source().with_read(
        SPORT,
        vec![entry(50, "Arsenal draw at Villa", SPORT, t0() - TimeDelta::hours(3))],
    );
    let service = SweepService::new(source);
    let mut job = football_job();
    job.policy = job.policy.with_window_hours(24);

    let report = service.run(&job, now).unwrap();

    assert_eq!(report.fetched_read, 1);
    assert_eq!(
        report.plan.reason(EntryId::new(3)),
        Some(DuplicateReason::AlreadySeenInWindow)
    );
    assert_eq!(
        report.plan.reason(EntryId::new(2)),
        Some(DuplicateReason::CrossFeedDuplicate)
    );
    let updates = service.source().updates.lock().unwrap();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].0.len(), 2);
}

#[test]
fn test_sweep_read_fetch_limited_to_window() {
    let now = t0() + TimeDelta::hours(1);
    let service = SweepService::new(football_source());
    let mut job = football_job();
    job.policy = job.policy.with_window_hours(24);

    service.run(&job, now).unwrap();

    let queries = service.source().queries.lock().unwrap();
    let read: Vec<&EntryQuery> = queries
        .iter()
        .map(|(_, query)| query)
        .filter(|query| query.status == EntryStatus::Read)
        .collect();
    assert_eq!(read.len(), 2);
    assert!(
        read.iter()
            .all(|query| query.published_after == Some(now - TimeDelta::hours(24)))
    );
    assert!(
        queries
            .iter()
            .filter(|(_, query)| query.status == EntryStatus::Unread)
            .all(|(_, query)| query.published_after.is_none())
    );
}

#[test]
fn test_unbounded_window_plans_without_overflow() {
    let unread = vec![item(1, "Arsenal draw at Villa", FOOTBALL, t0())];
    let consumed = vec![
        item(50, "arsenal draw at villa", SPORT, DateTime::<Utc>::MIN_UTC)
            .with_status(EntryStatus::Read),
    ];
    let policy = MatchPolicy::exact().with_window(TimeDelta::MAX);

    let plan = ActionPlanner::new(policy.clone()).plan(&unread, &consumed, t0());

    assert_eq!(
        plan.reason(EntryId::new(1)),
        Some(DuplicateReason::AlreadySeenInWindow)
    );
    assert!(matches!(policy.validate(), Err(Error::InvalidConfig(_))));
}

#[test]
fn test_sweep_rejects_oversized_window_before_fetching() {
    let service = SweepService::new(football_source());
    let mut job = football_job();
    job.policy = job.policy.with_window_hours(u32::MAX);

    let err = service.run(&job, t0()).unwrap_err();

    assert!(matches!(err, Error::InvalidConfig(_)));
    assert!(service.source().queries.lock().unwrap().is_empty());
}

#[test]
fn test_sweep_nothing_to_apply() {
    let source = MemorySource::default().with_unread(
        FOOTBALL,
        vec![entry(1, "Only story", FOOTBALL, t0())],
    );
    let service = SweepService::new(source);

    let report = service.run(&football_job(), t0()).unwrap();

    assert_eq!(report.apply, ApplyOutcome::NothingToApply);
    assert!(service.source().updates.lock().unwrap().is_empty());
    assert!(report.summary().contains("nothing to apply"));
}

#[test]
fn test_sweep_removed_action() {
    let service = SweepService::new(football_source());
    let job = football_job().with_action(EntryStatus::Removed);

    service.run(&job, t0()).unwrap();

    let updates = service.source().updates.lock().unwrap();
    assert_eq!(updates[0].1, EntryStatus::Removed);
}

#[test]
fn test_error_classification() {
    let entry_err = Error::InvalidEntry {
        entry: "1".to_string(),
        reason: "missing title".to_string(),
    };
    assert!(entry_err.is_entry_error());
    assert!(!Error::InvalidConfig("x".to_string()).is_entry_error());

    let err = Error::FeedSource {
        operation: "list_entries".to_string(),
        cause: "timeout".to_string(),
    };
    assert!(err.to_string().contains("list_entries"));
}
