//! Style - the learned communication style of the bot.
//!
//! A single [`StyleProfile`] is shared by the whole process. It is:
//! - loaded and saved by [`StyleProfileStore`]
//! - grown by [`StyleLearner`]
//! - rendered into prompts by [`PromptBuilder`]
//! - applied to generated text by [`ResponseStylizer`]
//! - owned at runtime by the single-writer [`StyleService`]

pub mod learner;
pub mod prompt;
pub mod service;
pub mod store;
pub mod stylizer;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub use learner::{StyleLearner, TrainingSummary, MAX_FREQUENT_PHRASES};
pub use prompt::PromptBuilder;
pub use service::{LearningSource, StyleService};
pub use store::StyleProfileStore;
pub use stylizer::ResponseStylizer;

/// Tone used when no profile has been persisted yet
pub const DEFAULT_TONE: &str = "Energetic and Casual";

const DEFAULT_EMOJIS: &[&str] = &["🎲", "💥", "🧠", "🎰", "💡", "🎉", "💸"];

const DEFAULT_KEY_PHRASES: &[&str] = &[
    "high rollers",
    "feeling lucky",
    "pro tip",
    "smart betting",
    "responsible gaming",
];

const DEFAULT_TEMPLATES: &[&str] = &[
    "Hey {name}! {message} 🎲",
    "Quick update for you: {message} 💥",
    "Pro tip: {message} 🧠",
];

/// Tone, emoji and signature phrases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommunicationStyle {
    /// Free-text tone descriptor
    pub tone: String,
    /// Candidate emoji pool
    pub emojis: Vec<String>,
    /// Phrases emphasized in output
    pub key_phrases: Vec<String>,
}

/// Persisted style of the bot.
///
/// `emojis`, `key_phrases` and `frequent_phrases` behave as insertion-ordered
/// sets. Use the `add_*` helpers to keep them free of duplicates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleProfile {
    pub communication_style: CommunicationStyle,
    /// Most recently learned distinct words, oldest first
    #[serde(default)]
    pub frequent_phrases: Vec<String>,
    /// Seed vocabulary per mood label
    #[serde(default)]
    pub tone_variations: BTreeMap<String, Vec<String>>,
    /// Seed templates, informational only
    #[serde(default)]
    pub response_templates: Vec<String>,
}

impl Default for StyleProfile {
    fn default() -> Self {
        let mut tone_variations = BTreeMap::new();
        tone_variations.insert(
            "excited".to_string(),
            to_strings(&["epic", "mega", "dropped", "special"]),
        );
        tone_variations.insert(
            "supportive".to_string(),
            to_strings(&["together", "priority", "help", "concern"]),
        );

        Self {
            communication_style: CommunicationStyle {
                tone: DEFAULT_TONE.to_string(),
                emojis: to_strings(DEFAULT_EMOJIS),
                key_phrases: to_strings(DEFAULT_KEY_PHRASES),
            },
            frequent_phrases: Vec::new(),
            tone_variations,
            response_templates: to_strings(DEFAULT_TEMPLATES),
        }
    }
}

impl StyleProfile {
    /// Empty profile with only a tone; mostly useful for tests and resets.
    pub fn with_tone(tone: &str) -> Self {
        Self {
            communication_style: CommunicationStyle {
                tone: tone.to_string(),
                emojis: Vec::new(),
                key_phrases: Vec::new(),
            },
            frequent_phrases: Vec::new(),
            tone_variations: BTreeMap::new(),
            response_templates: Vec::new(),
        }
    }

    pub fn tone(&self) -> &str {
        &self.communication_style.tone
    }

    pub fn emojis(&self) -> &[String] {
        &self.communication_style.emojis
    }

    pub fn key_phrases(&self) -> &[String] {
        &self.communication_style.key_phrases
    }

    /// Adds an emoji unless already known. Returns true when inserted.
    pub fn add_emoji(&mut self, emoji: &str) -> bool {
        push_unique(&mut self.communication_style.emojis, emoji)
    }

    /// Adds a key phrase unless already known. Returns true when inserted.
    pub fn add_key_phrase(&mut self, phrase: &str) -> bool {
        push_unique(&mut self.communication_style.key_phrases, phrase)
    }

    /// Restores the set and bound invariants on a profile read from disk.
    pub fn normalize(&mut self, max_frequent: usize) {
        dedup_in_place(&mut self.communication_style.emojis);
        dedup_in_place(&mut self.communication_style.key_phrases);
        dedup_in_place(&mut self.frequent_phrases);
        let len = self.frequent_phrases.len();
        if len > max_frequent {
            self.frequent_phrases.drain(..len - max_frequent);
        }
    }
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

fn push_unique(items: &mut Vec<String>, value: &str) -> bool {
    if items.iter().any(|existing| existing == value) {
        return false;
    }
    items.push(value.to_string());
    true
}

/// Keeps the first occurrence of every entry.
fn dedup_in_place(items: &mut Vec<String>) {
    let mut seen = std::collections::HashSet::new();
    items.retain(|item| seen.insert(item.clone()));
}
