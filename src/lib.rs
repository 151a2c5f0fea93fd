//! # Feedsweep
//!
//! Duplicate story sweeper for Miniflux feeds.
//!
//! Feedsweep pulls unread entries (and, optionally, a trailing window of
//! already-read entries) from one or more feeds, works out which entries
//! describe the same story, keeps one of them unread and marks the rest
//! as read in a single bulk update.
//!
//! ## Features
//!
//! - Exact or fuzzy (token-set) title matching with a tunable threshold
//! - Keeper policy with an optional preferred feed
//! - Already-seen window that catches stories republished in a later run
//! - Dry-run mode that computes the full plan without touching the server
//! - Safe to run repeatedly from cron: resolved entries drop out of the
//!   next run's unread input
//!
//! ## Example
//!
//! ```rust
//! use chrono::{TimeZone, Utc};
//! use feedsweep::models::{EntryId, FeedId, Item, MatchPolicy};
//! use feedsweep::services::deduplication::ActionPlanner;
//!
//! let at = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
//! let unread = vec![
//!     Item::new(EntryId::new(1), "Liverpool beat Chelsea 3-1", FeedId::new(482), at),
//!     Item::new(EntryId::new(2), "liverpool beat chelsea 31", FeedId::new(621), at),
//! ];
//!
//! let policy = MatchPolicy::exact().with_keep_feed(FeedId::new(482));
//! let plan = ActionPlanner::new(policy).plan(&unread, &[], at);
//!
//! assert_eq!(plan.ids(), vec![EntryId::new(2)]);
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]
#![allow(clippy::multiple_crate_versions)]

use thiserror::Error as ThisError;

// Module declarations
pub mod config;
pub mod feed;
pub mod models;
pub mod observability;
pub mod services;

// Re-exports for convenience
pub use config::{FeedsweepConfig, JobConfig};
pub use feed::{FeedSource, MinifluxClient};
pub use models::{
    ActionPlan, DuplicateReason, DuplicateScope, Entry, EntryId, EntryStatus, FeedId, Item,
    MatchMode, MatchPolicy, PlannedAction,
};
pub use services::{ApplyOutcome, SweepJob, SweepReport, SweepService};

/// Error type for feedsweep operations.
///
/// # Error Variant Triggers
///
/// | Variant | Raised When | Effect on a run |
/// |---------|-------------|-----------------|
/// | `InvalidConfig` | Missing feed list, bad threshold/window, unknown mode | Run fails before any fetch |
/// | `InvalidEntry` | An entry lacks `id`, `title` or a usable `published_at` | Entry skipped, run continues |
/// | `FeedSource` | The feed service rejects a fetch or update | Fetch: run aborts. Update: reported with the plan |
/// | `OperationFailed` | Local I/O, config parsing, telemetry setup | Command fails |
#[derive(Debug, ThisError)]
pub enum Error {
    /// Configuration is missing or invalid.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A single entry is malformed and cannot take part in matching.
    #[error("invalid entry {entry}: {reason}")]
    InvalidEntry {
        /// Identifier of the entry, or `<unknown>` when the id itself is missing.
        entry: String,
        /// What is wrong with it.
        reason: String,
    },

    /// The feed service failed a request.
    #[error("feed source '{operation}' failed: {cause}")]
    FeedSource {
        /// The request that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },

    /// A local operation failed.
    #[error("operation '{operation}' failed: {cause}")]
    OperationFailed {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },
}

impl Error {
    /// Returns true if this error only disqualifies a single entry.
    #[must_use]
    pub const fn is_entry_error(&self) -> bool {
        matches!(self, Self::InvalidEntry { .. })
    }
}

/// Result type alias for feedsweep operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::InvalidConfig("feeds must not be empty".to_string());
        assert_eq!(
            err.to_string(),
            "invalid configuration: feeds must not be empty"
        );

        let err = Error::InvalidEntry {
            entry: "42".to_string(),
            reason: "missing title".to_string(),
        };
        assert_eq!(err.to_string(), "invalid entry 42: missing title");

        let err = Error::FeedSource {
            operation: "update_entries".to_string(),
            cause: "503".to_string(),
        };
        assert_eq!(err.to_string(), "feed source 'update_entries' failed: 503");
    }

    #[test]
    fn test_is_entry_error() {
        let err = Error::InvalidEntry {
            entry: "<unknown>".to_string(),
            reason: "missing id".to_string(),
        };
        assert!(err.is_entry_error());
        assert!(!Error::InvalidConfig("x".to_string()).is_entry_error());
    }
}
