//! Data models for feedsweep.
//!
//! This module contains the entry, policy and plan types shared by the
//! deduplication engine, the feed source and the CLI.

mod entry;
mod plan;
mod policy;

pub use entry::{Entry, EntryId, EntryStatus, FeedId, Item};
pub use plan::{ActionPlan, DuplicateReason, PlannedAction};
pub use policy::{
    DEFAULT_FUZZY_THRESHOLD, DEFAULT_WINDOW_HOURS, DuplicateScope, MAX_WINDOW_HOURS, MatchMode,
    MatchPolicy,
};
