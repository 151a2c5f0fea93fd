//! Title normalization.
//!
//! Titles are reduced to two comparison keys before any matching:
//!
//! - the **exact key**: lower-cased, everything except letters, digits and
//!   whitespace removed, whitespace collapsed and trimmed;
//! - the **bag key**: the exact key with stop-words dropped and the
//!   remaining tokens sorted.
//!
//! Both are pure functions of the title.

use crate::models::MatchMode;
use std::collections::HashSet;
use std::sync::LazyLock;

/// English stop-words dropped from bag keys.
///
/// Articles, pronouns, auxiliaries, conjunctions and prepositions. Entries
/// are already in exact-key form (no apostrophes).
const STOP_WORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "against", "ain", "all", "am", "an", "and", "any",
    "are", "aren", "as", "at", "be", "because", "been", "before", "being", "below", "between",
    "both", "but", "by", "can", "couldn", "d", "did", "didn", "do", "does", "doesn", "doing",
    "don", "down", "during", "each", "few", "for", "from", "further", "had", "hadn", "has",
    "hasn", "have", "haven", "having", "he", "her", "here", "hers", "herself", "him", "himself",
    "his", "how", "i", "if", "in", "into", "is", "isn", "it", "its", "itself", "just", "ll", "m",
    "ma", "me", "mightn", "more", "most", "mustn", "my", "myself", "needn", "no", "nor", "not",
    "now", "o", "of", "off", "on", "once", "only", "or", "other", "our", "ours", "ourselves",
    "out", "over", "own", "re", "s", "same", "shan", "she", "should", "shouldn", "so", "some",
    "such", "t", "than", "that", "the", "their", "theirs", "them", "themselves", "then",
    "there", "these", "they", "this", "those", "through", "to", "too", "under", "until", "up",
    "ve", "very", "was", "wasn", "we", "were", "weren", "what", "when", "where", "which",
    "while", "who", "whom", "why", "will", "with", "won", "wouldn", "y", "you", "your", "yours",
    "yourself", "yourselves",
];

static STOP_WORD_SET: LazyLock<HashSet<&'static str>> =
    LazyLock::new(|| STOP_WORDS.iter().copied().collect());

/// Comparison keys derived from one title.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct NormalizedKey {
    exact: String,
    bag: String,
}

impl NormalizedKey {
    /// The order-preserving key.
    #[must_use]
    pub fn exact(&self) -> &str {
        &self.exact
    }

    /// The stop-word-free, token-sorted key.
    #[must_use]
    pub fn bag(&self) -> &str {
        &self.bag
    }

    /// The key compared under `mode`.
    #[must_use]
    pub fn for_mode(&self, mode: MatchMode) -> &str {
        match mode {
            MatchMode::Exact => &self.exact,
            MatchMode::Fuzzy { .. } => &self.bag,
        }
    }

    /// Returns true if the key compared under `mode` is empty.
    ///
    /// Items with an empty key never take part in matching.
    #[must_use]
    pub fn is_empty_for(&self, mode: MatchMode) -> bool {
        self.for_mode(mode).is_empty()
    }
}

/// Title normalizer.
///
/// # Example
///
/// ```rust
/// use feedsweep::services::deduplication::TitleNormalizer;
///
/// let key = TitleNormalizer::normalize("Liverpool beat Chelsea 3-1!");
/// assert_eq!(key.exact(), "liverpool beat chelsea 31");
///
/// let key = TitleNormalizer::normalize("The manager is sacked after a defeat");
/// assert_eq!(key.bag(), "defeat manager sacked");
/// ```
pub struct TitleNormalizer;

impl TitleNormalizer {
    /// Computes both keys for a title.
    #[must_use]
    pub fn normalize(title: &str) -> NormalizedKey {
        let exact = Self::exact_key(title);
        let bag = Self::bag_from_exact(&exact);
        NormalizedKey { exact, bag }
    }

    /// Computes the order-preserving key.
    ///
    /// Punctuation is removed rather than replaced, so `3-1` becomes `31`.
    #[must_use]
    pub fn exact_key(title: &str) -> String {
        let stripped: String = title
            .to_lowercase()
            .chars()
            .filter(|c| c.is_alphanumeric() || c.is_whitespace())
            .collect();
        stripped.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    /// Computes the bag key.
    #[must_use]
    pub fn bag_key(title: &str) -> String {
        Self::bag_from_exact(&Self::exact_key(title))
    }

    /// Returns true if `token` is dropped from bag keys.
    #[must_use]
    pub fn is_stop_word(token: &str) -> bool {
        STOP_WORD_SET.contains(token)
    }

    fn bag_from_exact(exact: &str) -> String {
        let mut tokens: Vec<&str> = exact
            .split(' ')
            .filter(|t| !t.is_empty() && !Self::is_stop_word(t))
            .collect();
        tokens.sort_unstable();
        tokens.join(" ")
    }
}
