//! Sweep service.
//!
//! Runs one configured job against a feed source: fetch, plan, apply.

use crate::feed::{EntryQuery, FeedSource};
use crate::models::{
    ActionPlan, DuplicateReason, Entry, EntryStatus, FeedId, Item, MatchPolicy, PlannedAction,
};
use crate::services::deduplication::ActionPlanner;
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use tracing::instrument;

/// A validated unit of work: which feeds to sweep and how.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepJob {
    /// Job name, used in logs and metric labels.
    pub name: String,
    /// Feeds whose entries are compared with each other.
    pub feeds: Vec<FeedId>,
    /// Matching and resolution policy.
    pub policy: MatchPolicy,
    /// Compute and log the plan without updating anything.
    pub dry_run: bool,
    /// Status given to planned entries.
    pub action: EntryStatus,
}

impl SweepJob {
    /// Creates a job that marks duplicates as read.
    #[must_use]
    pub fn new(name: impl Into<String>, feeds: Vec<FeedId>, policy: MatchPolicy) -> Self {
        Self {
            name: name.into(),
            feeds,
            policy,
            dry_run: false,
            action: EntryStatus::Read,
        }
    }

    /// Enables or disables dry-run.
    #[must_use]
    pub const fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Sets the status applied to planned entries.
    #[must_use]
    pub const fn with_action(mut self, action: EntryStatus) -> Self {
        self.action = action;
        self
    }

    /// Checks the job before anything is fetched.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if the feed list is empty or has
    /// repeats, the keep feed is not one of the feeds, the policy is
    /// invalid, or the action would mark entries unread.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::InvalidConfig("job name must not be empty".to_string()));
        }
        if self.feeds.is_empty() {
            return Err(Error::InvalidConfig(format!(
                "job '{}' has no feeds",
                self.name
            )));
        }
        let unique: HashSet<_> = self.feeds.iter().collect();
        if unique.len() != self.feeds.len() {
            return Err(Error::InvalidConfig(format!(
                "job '{}' lists a feed more than once",
                self.name
            )));
        }
        if let Some(keep) = self.policy.keep_feed {
            if !self.feeds.contains(&keep) {
                return Err(Error::InvalidConfig(format!(
                    "job '{}': keep feed {keep} is not one of its feeds",
                    self.name
                )));
            }
        }
        if self.action == EntryStatus::Unread {
            return Err(Error::InvalidConfig(format!(
                "job '{}': action must be 'read' or 'removed'",
                self.name
            )));
        }
        self.policy.validate().map_err(|e| match e {
            Error::InvalidConfig(msg) => Error::InvalidConfig(format!("job '{}': {msg}", self.name)),
            other => other,
        })
    }
}

/// An entry left out of a run because it was malformed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedEntry {
    /// Entry id, or `<unknown>`.
    pub entry: String,
    /// Why it was skipped.
    pub reason: String,
}

/// What happened to the plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ApplyOutcome {
    /// The plan was empty.
    NothingToApply,
    /// Dry-run: the plan was logged, nothing was updated.
    DryRun {
        /// Entries that would have been updated.
        count: usize,
    },
    /// The bulk update succeeded.
    Applied {
        /// Status set on the entries.
        status: EntryStatus,
        /// Entries updated.
        count: usize,
    },
    /// The bulk update failed; nothing is known to be applied.
    Failed {
        /// The feed source error.
        cause: String,
    },
}

impl ApplyOutcome {
    /// Returns true unless the update failed.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        !matches!(self, Self::Failed { .. })
    }
}

impl fmt::Display for ApplyOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NothingToApply => f.write_str("nothing to apply"),
            Self::DryRun { count } => write!(f, "dry run, {count} entries would be updated"),
            Self::Applied { status, count } => write!(f, "{count} entries marked {status}"),
            Self::Failed { cause } => write!(f, "update failed: {cause}"),
        }
    }
}

/// Result of one job run.
#[derive(Debug, Clone, Serialize)]
pub struct SweepReport {
    /// Job name.
    pub job: String,
    /// Unread entries fetched.
    pub fetched_unread: usize,
    /// Read entries fetched for the already-seen window.
    pub fetched_read: usize,
    /// Malformed entries left out.
    pub skipped: Vec<SkippedEntry>,
    /// The computed plan, intact even when applying it failed.
    pub plan: ActionPlan,
    /// What happened to the plan.
    pub apply: ApplyOutcome,
}

impl SweepReport {
    /// Returns true unless the update failed.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.apply.is_success()
    }

    /// One-line summary for terminal output.
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "{}: {} unread, {} read in window, {} skipped, {} planned \
             ({} cross-feed, {} same-feed, {} already seen); {}",
            self.job,
            self.fetched_unread,
            self.fetched_read,
            self.skipped.len(),
            self.plan.len(),
            self.plan.count_by_reason(DuplicateReason::CrossFeedDuplicate),
            self.plan.count_by_reason(DuplicateReason::SameFeedDuplicate),
            self.plan.count_by_reason(DuplicateReason::AlreadySeenInWindow),
            self.apply
        )
    }
}

/// Converts raw entries into items, setting aside the malformed ones.
#[must_use]
pub fn prepare_items(entries: Vec<Entry>) -> (Vec<Item>, Vec<SkippedEntry>) {
    let mut items = Vec::with_capacity(entries.len());
    let mut skipped = Vec::new();

    for entry in entries {
        match Item::try_from(entry) {
            Ok(item) => items.push(item),
            Err(Error::InvalidEntry { entry, reason }) => {
                tracing::warn!(entry = %entry, reason = %reason, "Skipping malformed entry");
                skipped.push(SkippedEntry { entry, reason });
            },
            Err(other) => {
                tracing::warn!(error = %other, "Skipping entry");
                skipped.push(SkippedEntry {
                    entry: "<unknown>".to_string(),
                    reason: other.to_string(),
                });
            },
        }
    }
    (items, skipped)
}

/// Runs sweep jobs against a feed source.
pub struct SweepService<S: FeedSource> {
    source: S,
}

impl<S: FeedSource> SweepService<S> {
    /// Creates a service over `source`.
    #[must_use]
    pub const fn new(source: S) -> Self {
        Self { source }
    }

    /// Returns the feed source.
    #[must_use]
    pub const fn source(&self) -> &S {
        &self.source
    }

    /// Runs `job` with `now` as the end of the already-seen window.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if the job is invalid and
    /// [`Error::FeedSource`] if any fetch fails. A failed update is not
    /// an error here: it is reported in [`SweepReport::apply`].
    #[instrument(
        skip(self, job),
        fields(
            operation = "sweep",
            job = %job.name,
            feeds = job.feeds.len(),
            dry_run = job.dry_run
        )
    )]
    pub fn run(&self, job: &SweepJob, now: DateTime<Utc>) -> Result<SweepReport> {
        job.validate()?;

        let unread_entries = self.fetch_all(&job.feeds, &EntryQuery::unread_oldest_first())?;
        let read_entries = if let Some(window) = job.policy.window {
            let cutoff = now
                .checked_sub_signed(window)
                .unwrap_or(DateTime::<Utc>::MIN_UTC);
            let query = EntryQuery::read_newest_first().published_since(cutoff);
            self.fetch_all(&job.feeds, &query)?
        } else {
            Vec::new()
        };
        let fetched_unread = unread_entries.len();
        let fetched_read = read_entries.len();

        let (mut unread, mut skipped) = prepare_items(unread_entries);
        let (read, skipped_read) = prepare_items(read_entries);
        skipped.extend(skipped_read);
        unread.sort_by(Item::chronological_cmp);

        if !skipped.is_empty() {
            metrics::counter!(
                "feedsweep_entries_skipped_total",
                "job" => job.name.clone()
            )
            .increment(skipped.len() as u64);
        }

        let plan = ActionPlanner::new(job.policy.clone()).plan(&unread, &read, now);
        let apply = self.apply(job, &plan);

        let report = SweepReport {
            job: job.name.clone(),
            fetched_unread,
            fetched_read,
            skipped,
            plan,
            apply,
        };
        tracing::info!(summary = %report.summary(), "Sweep finished");
        Ok(report)
    }

    fn fetch_all(&self, feeds: &[FeedId], query: &EntryQuery) -> Result<Vec<Entry>> {
        let mut entries = Vec::new();
        for feed in feeds {
            entries.extend(self.source.fetch_entries(*feed, query)?);
        }
        Ok(entries)
    }

    fn apply(&self, job: &SweepJob, plan: &ActionPlan) -> ApplyOutcome {
        if plan.is_empty() {
            tracing::info!("No duplicates found");
            return ApplyOutcome::NothingToApply;
        }

        if job.dry_run {
            for action in plan.actions() {
                log_action(action, job.action, true);
            }
            return ApplyOutcome::DryRun { count: plan.len() };
        }

        if let Err(e) = self.source.update_status(&plan.ids(), job.action) {
            tracing::error!(
                source = self.source.name(),
                error = %e,
                planned = plan.len(),
                "Bulk status update failed"
            );
            return ApplyOutcome::Failed {
                cause: e.to_string(),
            };
        }

        for action in plan.actions() {
            log_action(action, job.action, false);
            metrics::counter!(
                "feedsweep_entries_marked_total",
                "job" => job.name.clone(),
                "reason" => action.reason.as_str()
            )
            .increment(1);
        }
        ApplyOutcome::Applied {
            status: job.action,
            count: plan.len(),
        }
    }
}

fn log_action(action: &PlannedAction, status: EntryStatus, dry_run: bool) {
    let published = action.item.published_at.format("%Y-%m-%d %H:%M");
    let kept = action.kept.map(|id| id.to_string());
    if dry_run {
        tracing::info!(
            entry = %action.item.id,
            feed = %action.item.feed_id,
            published = %published,
            reason = %action.reason,
            kept = kept.as_deref(),
            title = %action.item.title,
            "Dry run: would mark entry {status}"
        );
    } else {
        tracing::info!(
            entry = %action.item.id,
            feed = %action.item.feed_id,
            published = %published,
            reason = %action.reason,
            kept = kept.as_deref(),
            title = %action.item.title,
            "Marked entry {status}"
        );
    }
}
