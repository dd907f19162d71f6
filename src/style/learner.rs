//! Style Learner - folds observed text into the style profile.
//!
//! Learns:
//! - Vocabulary (distinct words longer than 3 characters, FIFO-bounded)
//! - Emoji (symbols in the emoticon/transport block)

use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

use super::StyleProfile;

/// Upper bound on `frequent_phrases`
pub const MAX_FREQUENT_PHRASES: usize = 100;

/// Words must be longer than this (in characters) to be learned
pub const MIN_WORD_CHARS: usize = 3;

/// Emoji recognized by [`StyleLearner::absorb_emojis`]
pub const EMOJI_RANGE: RangeInclusive<char> = '\u{1F600}'..='\u{1F6FF}';

/// Learns vocabulary and emoji from text.
#[derive(Debug, Clone)]
pub struct StyleLearner {
    max_frequent_phrases: usize,
}

/// Result of a batch training run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingSummary {
    /// Messages folded into the profile
    pub messages: usize,
    /// Messages skipped because they were blank
    pub skipped: usize,
    /// New vocabulary entries (before eviction)
    pub new_words: usize,
    /// New emoji
    pub new_emojis: usize,
}

impl Default for StyleLearner {
    fn default() -> Self {
        Self::new(MAX_FREQUENT_PHRASES)
    }
}

impl StyleLearner {
    /// Creates a learner bounding `frequent_phrases` to `max_frequent_phrases`.
    pub fn new(max_frequent_phrases: usize) -> Self {
        Self {
            max_frequent_phrases,
        }
    }

    pub fn max_frequent_phrases(&self) -> usize {
        self.max_frequent_phrases
    }

    /// Learns vocabulary from `text`.
    ///
    /// Tokens are split on whitespace and lower-cased; unknown tokens longer
    /// than [`MIN_WORD_CHARS`] are appended, then the oldest entries are
    /// dropped so at most `max_frequent_phrases` remain. Returns the number
    /// of words appended.
    pub fn absorb(&self, profile: &mut StyleProfile, text: &str) -> usize {
        let mut added = 0;

        for word in text.split_whitespace().map(str::to_lowercase) {
            if word.chars().count() > MIN_WORD_CHARS && !profile.frequent_phrases.contains(&word) {
                profile.frequent_phrases.push(word);
                added += 1;
            }
        }

        let len = profile.frequent_phrases.len();
        if len > self.max_frequent_phrases {
            profile.frequent_phrases.drain(..len - self.max_frequent_phrases);
        }

        added
    }

    /// Learns emoji from `text`. Returns the number of emoji added.
    pub fn absorb_emojis(&self, profile: &mut StyleProfile, text: &str) -> usize {
        let mut buf = [0u8; 4];
        text.chars()
            .filter(|c| EMOJI_RANGE.contains(c))
            .filter(|c| profile.add_emoji(c.encode_utf8(&mut buf)))
            .count()
    }

    /// Applies [`absorb`](Self::absorb) and [`absorb_emojis`](Self::absorb_emojis)
    /// to every message, in order.
    ///
    /// Persisting the result is the caller's job, once per batch.
    pub fn train<I, S>(&self, profile: &mut StyleProfile, messages: I) -> TrainingSummary
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut summary = TrainingSummary::default();

        for message in messages {
            let message = message.as_ref();
            if message.trim().is_empty() {
                summary.skipped += 1;
                continue;
            }

            summary.new_words += self.absorb(profile, message);
            summary.new_emojis += self.absorb_emojis(profile, message);
            summary.messages += 1;
        }

        summary
    }
}
