//! Prompt Builder - style-conditioned prompts for the generator.

use crate::conversation::ConversationContext;

use super::StyleProfile;

/// Default instructions appended after the style guidelines
const DEFAULT_INSTRUCTIONS: &[&str] = &[
    "Matches the channel's energetic and casual tone",
    "Includes strategic and responsible messaging",
    "Uses emojis and engaging language",
    "Addresses the user's message directly",
];

/// Renders the prompt sent to the generator.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    instructions: Vec<String>,
    include_tone_variations: bool,
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self {
            instructions: DEFAULT_INSTRUCTIONS.iter().map(|s| (*s).to_string()).collect(),
            include_tone_variations: false,
        }
    }
}

impl PromptBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the numbered "Generate a response that" list.
    pub fn with_instructions(mut self, instructions: Vec<String>) -> Self {
        self.instructions = instructions;
        self
    }

    /// Also list the profile's tone variations in the guideline block.
    pub fn with_tone_variations(mut self, enabled: bool) -> Self {
        self.include_tone_variations = enabled;
        self
    }

    /// Builds the full prompt. Never fails; empty inputs give empty sections.
    pub fn build(&self, context: &ConversationContext, profile: &StyleProfile) -> String {
        let mut out = String::new();

        out.push_str(&format!(
            "Context: {}\n",
            context.conversation_history.join("\n")
        ));
        out.push_str(&format!("Current Message: {}\n\n", context.current_message));

        out.push_str("Communication Style Guidelines:\n");
        out.push_str(&self.style_guidelines(profile));
        out.push('\n');

        if !self.instructions.is_empty() {
            out.push_str("Generate a response that:\n");
            for (i, instruction) in self.instructions.iter().enumerate() {
                out.push_str(&format!("{}. {}\n", i + 1, instruction));
            }
        }

        out
    }

    /// The style-guideline block alone.
    pub fn style_guidelines(&self, profile: &StyleProfile) -> String {
        let mut out = String::from("Preferred Communication Style:\n");
        out.push_str(&format!("Tone: {}\n", profile.tone()));
        out.push_str(&format!("Key Phrases: {}\n", profile.key_phrases().join(", ")));
        out.push_str(&format!(
            "Frequent Phrases: {}\n",
            profile.frequent_phrases.join(", ")
        ));

        if self.include_tone_variations {
            for (mood, words) in &profile.tone_variations {
                out.push_str(&format!("Tone ({mood}): {}\n", words.join(", ")));
            }
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(history: &[&str], current: &str) -> ConversationContext {
        ConversationContext {
            conversation_history: history.iter().map(|s| (*s).to_string()).collect(),
            current_message: current.to_string(),
            user_id: "42".to_string(),
            chat_id: "42".to_string(),
        }
    }

    #[test]
    fn test_build_includes_history_and_style() {
        let mut profile = StyleProfile::with_tone("Energetic");
        profile.add_key_phrase("pro tip");
        profile.add_key_phrase("feeling lucky");
        profile.frequent_phrases = vec!["jackpot".into(), "bonus".into()];

        let prompt = PromptBuilder::new().build(
            &context(&["hi there", "hey! 🎲"], "any tips?"),
            &profile,
        );

        assert!(prompt.contains("Context: hi there\nhey! 🎲\n"));
        assert!(prompt.contains("Current Message: any tips?"));
        assert!(prompt.contains("Tone: Energetic"));
        assert!(prompt.contains("Key Phrases: pro tip, feeling lucky"));
        assert!(prompt.contains("Frequent Phrases: jackpot, bonus"));
        assert!(prompt.contains("4. Addresses the user's message directly"));
    }

    #[test]
    fn test_build_with_empty_inputs() {
        let profile = StyleProfile::with_tone("");

        let prompt = PromptBuilder::new().build(&context(&[], "hello"), &profile);

        assert!(prompt.contains("Current Message: hello"));
        assert!(prompt.contains("Key Phrases: \n"));
        assert!(prompt.contains("Frequent Phrases: \n"));
    }

    #[test]
    fn test_history_order_preserved() {
        let prompt = PromptBuilder::new()
            .with_instructions(Vec::new())
            .build(&context(&["first", "second", "third"], "now"), &StyleProfile::default());

        let first = prompt.find("first").unwrap();
        let second = prompt.find("second").unwrap();
        let third = prompt.find("third").unwrap();
        assert!(first < second && second < third);
        assert!(!prompt.contains("Generate a response that"));
    }

    #[test]
    fn test_tone_variations_opt_in() {
        let profile = StyleProfile::default();

        let plain = PromptBuilder::new().style_guidelines(&profile);
        let rich = PromptBuilder::new().with_tone_variations(true).style_guidelines(&profile);

        assert!(!plain.contains("Tone (excited)"));
        assert!(rich.contains("Tone (excited): epic, mega, dropped, special"));
    }
}
