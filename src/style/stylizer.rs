//! Response Stylizer - applies the learned style to generated text.

use rand::seq::IndexedRandom;
use rand::Rng;
use regex::RegexBuilder;
use tracing::warn;

use crate::errors::{BotError, Result};

use super::StyleProfile;

/// Marker placed on both sides of an emphasized key phrase
pub const EMPHASIS_MARKER: &str = "*";

/// Emphasizes key phrases and appends an emoji.
#[derive(Debug, Clone, Default)]
pub struct ResponseStylizer;

impl ResponseStylizer {
    pub fn new() -> Self {
        Self
    }

    /// Styles `raw` with a randomly chosen emoji from the profile.
    ///
    /// Fails with [`BotError::StyleUnavailable`] when the emoji pool is empty.
    pub fn stylize<R: Rng + ?Sized>(
        &self,
        raw: &str,
        profile: &StyleProfile,
        rng: &mut R,
    ) -> Result<String> {
        let emoji = profile
            .emojis()
            .choose(rng)
            .ok_or(BotError::StyleUnavailable)?;

        Ok(format!("{} {}", self.emphasize(raw, profile), emoji))
    }

    /// Wraps every case-insensitive occurrence of each key phrase in
    /// emphasis markers.
    ///
    /// Phrases are applied in listed order and each one scans the output of
    /// the previous, so overlapping phrases compound.
    pub fn emphasize(&self, raw: &str, profile: &StyleProfile) -> String {
        let replacement = format!("{EMPHASIS_MARKER}${{0}}{EMPHASIS_MARKER}");

        profile
            .key_phrases()
            .iter()
            .filter(|phrase| !phrase.trim().is_empty())
            .fold(raw.to_string(), |text, phrase| {
                match RegexBuilder::new(&regex::escape(phrase))
                    .case_insensitive(true)
                    .build()
                {
                    Ok(re) => re.replace_all(&text, replacement.as_str()).into_owned(),
                    Err(e) => {
                        warn!("Skipping key phrase {:?}: {}", phrase, e);
                        text
                    }
                }
            })
    }
}
