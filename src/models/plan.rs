//! Action plans.
//!
//! An [`ActionPlan`] lists the entries a run intends to mark as read,
//! each tagged with why.

use super::{EntryId, Item};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Why an entry is scheduled to be marked as read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DuplicateReason {
    /// Duplicate of a keeper in another feed.
    CrossFeedDuplicate,
    /// Duplicate of a keeper in the same feed.
    SameFeedDuplicate,
    /// Matches a title that was already read inside the window.
    AlreadySeenInWindow,
}

impl DuplicateReason {
    /// Returns the reason as a label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CrossFeedDuplicate => "cross-feed-duplicate",
            Self::SameFeedDuplicate => "same-feed-duplicate",
            Self::AlreadySeenInWindow => "already-seen-in-window",
        }
    }
}

impl fmt::Display for DuplicateReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry to mark, with its cause.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedAction {
    /// The entry to mark.
    pub item: Item,
    /// Why it is marked.
    pub reason: DuplicateReason,
    /// The keeper it duplicates, or the read entry it was already seen as.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kept: Option<EntryId>,
}

/// Ordered, duplicate-free list of entries to mark as read.
///
/// # Example
///
/// ```rust
/// use chrono::Utc;
/// use feedsweep::models::{ActionPlan, DuplicateReason, EntryId, FeedId, Item, PlannedAction};
///
/// let item = Item::new(EntryId::new(2), "Title", FeedId::new(1), Utc::now());
/// let mut plan = ActionPlan::new();
///
/// let action = PlannedAction { item, reason: DuplicateReason::AlreadySeenInWindow, kept: None };
/// assert!(plan.push(action.clone()));
/// assert!(!plan.push(action));
/// assert_eq!(plan.len(), 1);
/// ```
#[derive(Debug, Clone, Default, Serialize)]
pub struct ActionPlan {
    actions: Vec<PlannedAction>,
    #[serde(skip)]
    seen: HashSet<EntryId>,
}

impl ActionPlan {
    /// Creates an empty plan.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an action unless its entry is already planned.
    ///
    /// Returns false (and keeps the earlier reason) when the entry is
    /// already present.
    pub fn push(&mut self, action: PlannedAction) -> bool {
        if !self.seen.insert(action.item.id) {
            return false;
        }
        self.actions.push(action);
        true
    }

    /// Returns true if the entry is already planned.
    #[must_use]
    pub fn contains(&self, id: EntryId) -> bool {
        self.seen.contains(&id)
    }

    /// Returns the planned actions in order.
    #[must_use]
    pub fn actions(&self) -> &[PlannedAction] {
        &self.actions
    }

    /// Returns the entries to mark, in plan order.
    pub fn to_mark_consumed(&self) -> impl Iterator<Item = &Item> {
        self.actions.iter().map(|a| &a.item)
    }

    /// Returns the entry ids to mark, in plan order.
    #[must_use]
    pub fn ids(&self) -> Vec<EntryId> {
        self.actions.iter().map(|a| a.item.id).collect()
    }

    /// Returns the reason an entry is planned, if it is.
    #[must_use]
    pub fn reason(&self, id: EntryId) -> Option<DuplicateReason> {
        self.actions
            .iter()
            .find(|a| a.item.id == id)
            .map(|a| a.reason)
    }

    /// Counts planned actions with the given reason.
    #[must_use]
    pub fn count_by_reason(&self, reason: DuplicateReason) -> usize {
        self.actions.iter().filter(|a| a.reason == reason).count()
    }

    /// Returns the number of planned actions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Returns true if nothing is planned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}
