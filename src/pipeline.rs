//! Response Pipeline
//!
//! Turns one inbound message into one styled reply:
//!
//! ```text
//! Received -> ContextBuilt -> Generating -> Stylizing -> HistoryUpdated -> Delivered
//!                                  \-> GenerationFailed --/
//! ```
//!
//! A failed or timed-out generation is answered with [`APOLOGY`]; the reply
//! is appended to the user's history in every case.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, warn};

use crate::conversation::{ConversationContext, ConversationMemory};
use crate::errors::{BotError, Result};
use crate::providers::Generator;
use crate::style::{LearningSource, PromptBuilder, ResponseStylizer, StyleProfile, StyleService};

/// Sent instead of a styled reply when generation fails
pub const APOLOGY: &str = "I apologize, but I encountered an issue generating a response.";

/// Default bound on one backend call
pub const DEFAULT_GENERATION_TIMEOUT: Duration = Duration::from_secs(60);

/// Pipeline stages, in the order they are entered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Received,
    ContextBuilt,
    Generating,
    Stylizing,
    GenerationFailed,
    HistoryUpdated,
    Delivered,
}

/// How the reply text was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyOutcome {
    /// Key phrases emphasized and emoji appended
    Styled,
    /// Key phrases emphasized, no emoji (empty pool)
    Unstyled,
    /// Generation failed, fixed apology sent
    Apology,
}

/// Final reply plus the stages it went through
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineReply {
    pub text: String,
    pub outcome: ReplyOutcome,
    pub stages: Vec<Stage>,
}

/// Composes memory, prompt building, generation, learning and styling.
pub struct ResponsePipeline {
    generator: Arc<dyn Generator>,
    style: StyleService,
    memory: Arc<ConversationMemory>,
    prompt_builder: PromptBuilder,
    stylizer: ResponseStylizer,
    generation_timeout: Duration,
}

impl ResponsePipeline {
    pub fn new(
        generator: Arc<dyn Generator>,
        style: StyleService,
        memory: Arc<ConversationMemory>,
    ) -> Self {
        Self {
            generator,
            style,
            memory,
            prompt_builder: PromptBuilder::default(),
            stylizer: ResponseStylizer::new(),
            generation_timeout: DEFAULT_GENERATION_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.generation_timeout = timeout;
        self
    }

    pub fn with_prompt_builder(mut self, prompt_builder: PromptBuilder) -> Self {
        self.prompt_builder = prompt_builder;
        self
    }

    pub fn style(&self) -> &StyleService {
        &self.style
    }

    pub fn memory(&self) -> &Arc<ConversationMemory> {
        &self.memory
    }

    /// Produces the reply for `text` from `user_id` in `chat_id`.
    ///
    /// Always returns some text; internal failures never reach the caller.
    pub async fn respond(&self, user_id: &str, chat_id: &str, text: &str) -> PipelineReply {
        let mut stages = Vec::with_capacity(6);
        advance(&mut stages, user_id, Stage::Received);

        if !text.trim().is_empty() {
            if let Err(e) = self.style.learn(LearningSource::Inbound, text).await {
                warn!("Inbound learning skipped: {}", e);
            }
        }

        let context = ConversationContext::new(user_id, chat_id, text)
            .with_history(self.memory.get(user_id).await);
        let profile = self.profile_snapshot().await;
        let prompt = self.prompt_builder.build(&context, &profile);
        advance(&mut stages, user_id, Stage::ContextBuilt);

        advance(&mut stages, user_id, Stage::Generating);
        let (reply, outcome) = match self.generate(&prompt).await {
            Ok(raw) => {
                advance(&mut stages, user_id, Stage::Stylizing);
                if let Err(e) = self.style.learn(LearningSource::Generated, &raw).await {
                    warn!("Style update from generated text skipped: {}", e);
                }
                self.apply_style(&raw, &profile)
            }
            Err(e) => {
                error!("Response generation via {} failed: {}", self.generator.name(), e);
                advance(&mut stages, user_id, Stage::GenerationFailed);
                (APOLOGY.to_string(), ReplyOutcome::Apology)
            }
        };

        self.memory.append(user_id, &[text, reply.as_str()]).await;
        advance(&mut stages, user_id, Stage::HistoryUpdated);
        advance(&mut stages, user_id, Stage::Delivered);

        PipelineReply {
            text: reply,
            outcome,
            stages,
        }
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        match tokio::time::timeout(self.generation_timeout, self.generator.generate(prompt)).await {
            Ok(result) => result,
            Err(_) => Err(BotError::Timeout {
                timeout_seconds: self.generation_timeout.as_secs(),
            }),
        }
    }

    async fn profile_snapshot(&self) -> StyleProfile {
        match self.style.snapshot().await {
            Ok(profile) => profile,
            Err(e) => {
                error!("Style service unavailable, using default profile: {}", e);
                StyleProfile::default()
            }
        }
    }

    fn apply_style(&self, raw: &str, profile: &StyleProfile) -> (String, ReplyOutcome) {
        let mut rng = rand::rng();
        match self.stylizer.stylize(raw, profile, &mut rng) {
            Ok(styled) => (styled, ReplyOutcome::Styled),
            Err(e) => {
                warn!("{}; sending reply without emoji", e);
                (self.stylizer.emphasize(raw, profile), ReplyOutcome::Unstyled)
            }
        }
    }
}

fn advance(stages: &mut Vec<Stage>, user_id: &str, stage: Stage) {
    debug!("[{}] {:?}", user_id, stage);
    stages.push(stage);
}
