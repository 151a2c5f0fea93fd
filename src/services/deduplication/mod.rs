//! Duplicate detection and resolution engine.
//!
//! Decides, for a batch of unread feed entries, which ones repeat a story
//! that is already covered and should be marked as read:
//! 1. **Normalize**: each title becomes an exact key and a bag key
//! 2. **Group**: first-match clustering by exact equality or token-set ratio
//! 3. **Resolve**: one keeper per group, preferring a configured feed
//! 4. **Already seen**: unread titles matching entries read within a window
//!
//! The engine is synchronous and pure: no I/O, no shared state, and every
//! setting arrives through [`MatchPolicy`](crate::models::MatchPolicy).
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                          ActionPlanner                            │
//! │  ┌────────────────┐  ┌────────────────┐  ┌─────────────────────┐  │
//! │  │ DuplicateGroup │  │ KeeperResolver │  │ AlreadySeenIndex    │  │
//! │  │ er             │  │                │  │                     │  │
//! │  │ first-match    │  │ keep feed, then│  │ exact keys of read  │  │
//! │  │ clustering     │  │ earliest       │  │ entries in window   │  │
//! │  └───────┬────────┘  └────────────────┘  └─────────────────────┘  │
//! │          │                                                        │
//! │  ┌───────┴────────┐  ┌────────────────┐                           │
//! │  │ Similarity     │──│ TitleNormalizer│                           │
//! │  │ Matcher        │  │                │                           │
//! │  └────────────────┘  └────────────────┘                           │
//! └───────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust
//! use chrono::Utc;
//! use feedsweep::models::{EntryId, FeedId, Item, MatchPolicy};
//! use feedsweep::services::deduplication::ActionPlanner;
//!
//! let now = Utc::now();
//! let unread = vec![
//!     Item::new(EntryId::new(1), "Man United sack manager after defeat", FeedId::new(1), now),
//!     Item::new(EntryId::new(2), "Manchester United sack manager following defeat", FeedId::new(2), now),
//! ];
//!
//! let plan = ActionPlanner::new(MatchPolicy::fuzzy(88)).plan(&unread, &[], now);
//! assert_eq!(plan.ids(), vec![EntryId::new(2)]);
//! ```

mod grouper;
mod keeper;
mod normalizer;
mod planner;
mod recent;
mod similarity;
mod types;

pub use grouper::DuplicateGrouper;
pub use keeper::KeeperResolver;
pub use normalizer::{NormalizedKey, TitleNormalizer};
pub use planner::ActionPlanner;
pub use recent::AlreadySeenIndex;
pub use similarity::{SimilarityMatcher, indel_ratio, token_set_ratio};
pub use types::{DuplicateGroup, Resolution};
