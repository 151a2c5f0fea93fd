//! Title similarity.
//!
//! Exact mode compares order-preserving keys for equality. Fuzzy mode
//! scores the bag keys with a token-set ratio:
//!
//! 1. split both keys into token sets;
//! 2. build `common` (shared tokens), `common + only_a` and `common + only_b`,
//!    each sorted and space-joined;
//! 3. take the best indel ratio among the three pairings.
//!
//! The indel ratio of two strings is `200 * lcs / (len_a + len_b)`, where
//! `lcs` is the length of their longest common subsequence in characters.
//! The score is symmetric, lies in `[0, 100]` and is `100` for identical
//! keys. When one token set contains the other the score is `100`.

use super::normalizer::NormalizedKey;
use crate::models::MatchMode;
use std::collections::BTreeSet;

/// Similarity matcher for normalized titles.
///
/// # Example
///
/// ```rust
/// use feedsweep::models::MatchMode;
/// use feedsweep::services::deduplication::{SimilarityMatcher, TitleNormalizer};
///
/// let a = TitleNormalizer::normalize("Man United sack manager after defeat");
/// let b = TitleNormalizer::normalize("Manchester United sack manager following defeat");
///
/// assert!(SimilarityMatcher::similar(&a, &b, MatchMode::Fuzzy { threshold: 88 }));
/// assert!(!SimilarityMatcher::similar(&a, &b, MatchMode::Fuzzy { threshold: 97 }));
/// ```
pub struct SimilarityMatcher;

impl SimilarityMatcher {
    /// Returns true if the two keys match under `mode`.
    ///
    /// A key that is empty under `mode` never matches anything, itself
    /// included.
    #[must_use]
    pub fn similar(a: &NormalizedKey, b: &NormalizedKey, mode: MatchMode) -> bool {
        if a.is_empty_for(mode) || b.is_empty_for(mode) {
            return false;
        }
        match mode {
            MatchMode::Exact => a.exact() == b.exact(),
            MatchMode::Fuzzy { threshold } => {
                token_set_ratio(a.bag(), b.bag()) >= f64::from(threshold)
            },
        }
    }

    /// Scores two keys under `mode` in `[0, 100]`.
    ///
    /// Exact mode scores `100` for equal keys and `0` otherwise.
    #[must_use]
    pub fn score(a: &NormalizedKey, b: &NormalizedKey, mode: MatchMode) -> f64 {
        if a.is_empty_for(mode) || b.is_empty_for(mode) {
            return 0.0;
        }
        match mode {
            MatchMode::Exact => {
                if a.exact() == b.exact() {
                    100.0
                } else {
                    0.0
                }
            },
            MatchMode::Fuzzy { .. } => token_set_ratio(a.bag(), b.bag()),
        }
    }
}

/// Token-set ratio of two whitespace-separated strings, in `[0, 100]`.
#[must_use]
pub fn token_set_ratio(a: &str, b: &str) -> f64 {
    let tokens_a: BTreeSet<&str> = a.split_whitespace().collect();
    let tokens_b: BTreeSet<&str> = b.split_whitespace().collect();
    if tokens_a.is_empty() || tokens_b.is_empty() {
        return 0.0;
    }

    let common = join(tokens_a.intersection(&tokens_b).copied());
    let with_a = extend(&common, &join(tokens_a.difference(&tokens_b).copied()));
    let with_b = extend(&common, &join(tokens_b.difference(&tokens_a).copied()));

    let mut best = indel_ratio(&with_a, &with_b);
    if !common.is_empty() {
        best = best
            .max(indel_ratio(&common, &with_a))
            .max(indel_ratio(&common, &with_b));
    }
    best
}

/// Indel ratio of two strings, in `[0, 100]`.
///
/// Two empty strings score `100`; one empty string scores `0`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn indel_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 100.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    200.0 * lcs_length(&a, &b) as f64 / total as f64
}

/// LCS length using two-row DP.
fn lcs_length(a: &[char], b: &[char]) -> usize {
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];

    for ca in a {
        for (j, cb) in b.iter().enumerate() {
            curr[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                curr[j].max(prev[j + 1])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

fn join<'a>(tokens: impl Iterator<Item = &'a str>) -> String {
    tokens.collect::<Vec<_>>().join(" ")
}

fn extend(common: &str, rest: &str) -> String {
    match (common.is_empty(), rest.is_empty()) {
        (true, _) => rest.to_string(),
        (false, true) => common.to_string(),
        (false, false) => format!("{common} {rest}"),
    }
}
