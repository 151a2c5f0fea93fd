//! Job definitions.

use crate::models::{
    DEFAULT_FUZZY_THRESHOLD, DuplicateScope, EntryStatus, FeedId, MAX_WINDOW_HOURS, MatchPolicy,
};
use crate::services::SweepJob;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Matching mode names accepted in config files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModeSetting {
    /// Exact title keys.
    #[default]
    Exact,
    /// Token-set similarity.
    Fuzzy,
}

/// Status a job gives to duplicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionSetting {
    /// Mark as read.
    #[default]
    Read,
    /// Remove from the reader.
    Removed,
}

impl From<ActionSetting> for EntryStatus {
    fn from(action: ActionSetting) -> Self {
        match action {
            ActionSetting::Read => Self::Read,
            ActionSetting::Removed => Self::Removed,
        }
    }
}

/// One `[[jobs]]` table.
///
/// ```toml
/// [[jobs]]
/// name = "bbc-football"
/// feeds = [482, 621]
/// keep_feed = 482
/// mode = "fuzzy"
/// threshold = 88
/// window_hours = 24
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobConfig {
    /// Job name.
    pub name: String,
    /// Feeds compared with each other.
    #[serde(default)]
    pub feeds: Vec<FeedId>,
    /// Preferred keeper feed; must be one of `feeds`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keep_feed: Option<FeedId>,
    /// Matching mode.
    #[serde(default)]
    pub mode: ModeSetting,
    /// Fuzzy threshold, 1 to 100.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<i64>,
    /// Already-seen window in hours; absent disables the check.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window_hours: Option<i64>,
    /// Which group losers are marked.
    #[serde(default)]
    pub scope: DuplicateScope,
    /// Plan and log only.
    #[serde(default)]
    pub dry_run: bool,
    /// Status given to duplicates.
    #[serde(default)]
    pub action: ActionSetting,
}

impl JobConfig {
    /// Creates an exact-mode job over `feeds`.
    #[must_use]
    pub fn new(name: impl Into<String>, feeds: Vec<FeedId>) -> Self {
        Self {
            name: name.into(),
            feeds,
            keep_feed: None,
            mode: ModeSetting::Exact,
            threshold: None,
            window_hours: None,
            scope: DuplicateScope::Any,
            dry_run: false,
            action: ActionSetting::Read,
        }
    }

    /// Builds the match policy for this job.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if the threshold is outside 1 to
    /// 100 or the window is not a positive number of hours within
    /// [`MAX_WINDOW_HOURS`].
    pub fn policy(&self) -> Result<MatchPolicy> {
        let mut policy = match self.mode {
            ModeSetting::Exact => {
                if self.threshold.is_some() {
                    tracing::warn!(job = %self.name, "threshold is ignored in exact mode");
                }
                MatchPolicy::exact()
            },
            ModeSetting::Fuzzy => {
                let threshold = self
                    .threshold
                    .unwrap_or_else(|| i64::from(DEFAULT_FUZZY_THRESHOLD));
                let threshold = u8::try_from(threshold)
                    .ok()
                    .filter(|t| (1..=100).contains(t))
                    .ok_or_else(|| {
                        Error::InvalidConfig(format!(
                            "job '{}': fuzzy threshold must be between 1 and 100, got {threshold}",
                            self.name
                        ))
                    })?;
                MatchPolicy::fuzzy(threshold)
            },
        }
        .with_scope(self.scope);

        if let Some(feed) = self.keep_feed {
            policy = policy.with_keep_feed(feed);
        }
        if let Some(hours) = self.window_hours {
            let hours = u32::try_from(hours)
                .ok()
                .filter(|h| (1..=MAX_WINDOW_HOURS).contains(h))
                .ok_or_else(|| {
                    Error::InvalidConfig(format!(
                        "job '{}': window_hours must be between 1 and {MAX_WINDOW_HOURS}, got {hours}",
                        self.name
                    ))
                })?;
            policy = policy.with_window_hours(hours);
        }
        Ok(policy)
    }

    /// Converts into a validated sweep job.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if any setting is unusable.
    pub fn to_job(&self) -> Result<SweepJob> {
        let job = SweepJob::new(self.name.clone(), self.feeds.clone(), self.policy()?)
            .with_dry_run(self.dry_run)
            .with_action(self.action.into());
        job.validate()?;
        Ok(job)
    }
}
