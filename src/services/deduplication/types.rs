//! Grouping result types.

use super::normalizer::NormalizedKey;
use crate::models::Item;
use serde::Serialize;

/// A cluster of items judged to be the same story.
///
/// The first member is the representative: later items are compared
/// against its key only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateGroup {
    members: Vec<Item>,
    #[serde(skip)]
    key: NormalizedKey,
}

impl DuplicateGroup {
    /// Starts a group with its representative.
    #[must_use]
    pub fn new(representative: Item, key: NormalizedKey) -> Self {
        Self {
            members: vec![representative],
            key,
        }
    }

    /// Adds a member after the existing ones.
    pub fn push(&mut self, item: Item) {
        self.members.push(item);
    }

    /// The representative (first) member.
    #[must_use]
    pub fn representative(&self) -> &Item {
        &self.members[0]
    }

    /// The representative's key.
    #[must_use]
    pub const fn key(&self) -> &NormalizedKey {
        &self.key
    }

    /// Members in the order they joined.
    #[must_use]
    pub fn members(&self) -> &[Item] {
        &self.members
    }

    /// Returns the number of members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Always false; a group has at least its representative.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Returns true if the group holds more than one item.
    #[must_use]
    pub fn is_duplicate(&self) -> bool {
        self.members.len() > 1
    }
}

/// Keeper and losers of one group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolution {
    /// The item left unread.
    pub keeper: Item,
    /// The other members, in their group order.
    pub losers: Vec<Item>,
}

impl Resolution {
    /// Returns true if `loser` comes from a different feed than the keeper.
    #[must_use]
    pub fn is_cross_feed(&self, loser: &Item) -> bool {
        loser.feed_id != self.keeper.feed_id
    }
}
