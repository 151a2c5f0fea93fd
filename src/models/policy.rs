//! Match policy.
//!
//! A [`MatchPolicy`] is the only configuration the deduplication engine
//! sees. It is built per job and passed in explicitly; the engine keeps
//! no defaults of its own.

use super::FeedId;
use crate::{Error, Result};
use chrono::TimeDelta;
use serde::{Deserialize, Serialize};

/// Fuzzy threshold used when a job does not set one.
pub const DEFAULT_FUZZY_THRESHOLD: u8 = 88;

/// Already-seen window used by the CLI when `--window-hours` is given without a value.
pub const DEFAULT_WINDOW_HOURS: u32 = 24;

/// Longest already-seen window a policy accepts (ten years).
pub const MAX_WINDOW_HOURS: u32 = 87_600;

/// How two titles are compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum MatchMode {
    /// Order-preserving keys must be equal.
    Exact,
    /// Token-set similarity of the bag keys must reach `threshold` (0-100).
    Fuzzy {
        /// Minimum similarity score.
        threshold: u8,
    },
}

impl MatchMode {
    /// Returns the mode name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::Fuzzy { .. } => "fuzzy",
        }
    }
}

/// Which group losers are marked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateScope {
    /// Every loser.
    #[default]
    Any,
    /// Only losers from a different feed than their keeper.
    CrossFeed,
    /// Only losers from the same feed as their keeper.
    SameFeed,
}

impl DuplicateScope {
    /// Parses a scope string.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "any" | "all" => Some(Self::Any),
            "cross_feed" => Some(Self::CrossFeed),
            "same_feed" => Some(Self::SameFeed),
            _ => None,
        }
    }

    /// Returns true if a loser in the given feed relation is marked.
    #[must_use]
    pub const fn admits(self, cross_feed: bool) -> bool {
        match self {
            Self::Any => true,
            Self::CrossFeed => cross_feed,
            Self::SameFeed => !cross_feed,
        }
    }
}

/// Matching and resolution policy for one run.
///
/// # Example
///
/// ```rust
/// use feedsweep::models::{FeedId, MatchMode, MatchPolicy};
///
/// let policy = MatchPolicy::fuzzy(88)
///     .with_keep_feed(FeedId::new(482))
///     .with_window_hours(24);
///
/// assert_eq!(policy.mode, MatchMode::Fuzzy { threshold: 88 });
/// assert!(policy.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchPolicy {
    /// Comparison mode.
    pub mode: MatchMode,
    /// Feed whose copy of a story is preferred as keeper.
    pub keep_feed: Option<FeedId>,
    /// Trailing window for the already-seen check; `None` disables it.
    pub window: Option<TimeDelta>,
    /// Which losers are marked.
    pub scope: DuplicateScope,
}

impl MatchPolicy {
    /// Exact matching, no keep feed, no window.
    #[must_use]
    pub const fn exact() -> Self {
        Self {
            mode: MatchMode::Exact,
            keep_feed: None,
            window: None,
            scope: DuplicateScope::Any,
        }
    }

    /// Fuzzy matching at the given threshold, no keep feed, no window.
    #[must_use]
    pub const fn fuzzy(threshold: u8) -> Self {
        Self {
            mode: MatchMode::Fuzzy { threshold },
            keep_feed: None,
            window: None,
            scope: DuplicateScope::Any,
        }
    }

    /// Sets the preferred keeper feed.
    #[must_use]
    pub const fn with_keep_feed(mut self, feed: FeedId) -> Self {
        self.keep_feed = Some(feed);
        self
    }

    /// Enables the already-seen check over the trailing `hours`.
    #[must_use]
    pub fn with_window_hours(mut self, hours: u32) -> Self {
        self.window = Some(TimeDelta::try_hours(i64::from(hours)).unwrap_or(TimeDelta::MAX));
        self
    }

    /// Enables the already-seen check over an arbitrary window.
    #[must_use]
    pub const fn with_window(mut self, window: TimeDelta) -> Self {
        self.window = Some(window);
        self
    }

    /// Sets the duplicate scope.
    #[must_use]
    pub const fn with_scope(mut self, scope: DuplicateScope) -> Self {
        self.scope = scope;
        self
    }

    /// Checks that the threshold and window are usable.
    pub fn validate(&self) -> Result<()> {
        if let MatchMode::Fuzzy { threshold } = self.mode {
            if threshold == 0 || threshold > 100 {
                return Err(Error::InvalidConfig(format!(
                    "fuzzy threshold must be between 1 and 100, got {threshold}"
                )));
            }
        }
        if let Some(window) = self.window {
            if window <= TimeDelta::zero() {
                return Err(Error::InvalidConfig(format!(
                    "already-seen window must be positive, got {window}"
                )));
            }
            if window > TimeDelta::hours(i64::from(MAX_WINDOW_HOURS)) {
                return Err(Error::InvalidConfig(format!(
                    "already-seen window must be at most {MAX_WINDOW_HOURS} hours, got {window}"
                )));
            }
        }
        Ok(())
    }
}

impl Default for MatchPolicy {
    fn default() -> Self {
        Self::exact()
    }
}
