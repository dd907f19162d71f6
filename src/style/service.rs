//! Style Service - single owner of the process-wide style profile.
//!
//! The profile lives inside one tokio task. Every other part of the bot holds
//! a cloneable [`StyleService`] handle and talks to the task through a queue,
//! so mutations are applied one at a time and each is written through to the
//! [`StyleProfileStore`] before the next is handled.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::LearningConfig;
use crate::errors::{BotError, Result};

use super::{StyleLearner, StyleProfile, StyleProfileStore, TrainingSummary};

const QUEUE_CAPACITY: usize = 64;

/// Where learned text comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LearningSource {
    /// Messages written by people
    Inbound,
    /// Text produced by the generator
    Generated,
}

/// Result of a single learning step
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LearnOutcome {
    /// False when the learning path for the source is disabled
    pub applied: bool,
    pub new_words: usize,
    pub new_emojis: usize,
}

enum StyleCommand {
    Snapshot(oneshot::Sender<StyleProfile>),
    Learn {
        source: LearningSource,
        text: String,
        reply: oneshot::Sender<LearnOutcome>,
    },
    Train {
        messages: Vec<String>,
        reply: oneshot::Sender<TrainingSummary>,
    },
    Replace {
        profile: StyleProfile,
        reply: oneshot::Sender<()>,
    },
}

/// Handle to the style task.
#[derive(Debug, Clone)]
pub struct StyleService {
    tx: mpsc::Sender<StyleCommand>,
}

impl std::fmt::Debug for StyleCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Snapshot(_) => write!(f, "Snapshot"),
            Self::Learn { source, .. } => write!(f, "Learn({source:?})"),
            Self::Train { messages, .. } => write!(f, "Train({})", messages.len()),
            Self::Replace { .. } => write!(f, "Replace"),
        }
    }
}

impl StyleService {
    /// Loads the profile from `store` and starts the style task.
    pub fn spawn(
        store: StyleProfileStore,
        learner: StyleLearner,
        learning: LearningConfig,
    ) -> (Self, JoinHandle<()>) {
        let profile = store.load();
        Self::spawn_with_profile(profile, store, learner, learning)
    }

    /// Starts the style task with an already loaded profile.
    pub fn spawn_with_profile(
        profile: StyleProfile,
        store: StyleProfileStore,
        learner: StyleLearner,
        learning: LearningConfig,
    ) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(QUEUE_CAPACITY);
        let actor = StyleActor {
            profile,
            store,
            learner,
            learning,
        };
        let handle = tokio::spawn(actor.run(rx));
        (Self { tx }, handle)
    }

    /// Returns a copy of the current profile.
    pub async fn snapshot(&self) -> Result<StyleProfile> {
        let (reply, rx) = oneshot::channel();
        self.send(StyleCommand::Snapshot(reply)).await?;
        rx.await.map_err(closed)
    }

    /// Learns from a single text through the path selected by `source`.
    pub async fn learn(&self, source: LearningSource, text: &str) -> Result<LearnOutcome> {
        let (reply, rx) = oneshot::channel();
        self.send(StyleCommand::Learn {
            source,
            text: text.to_string(),
            reply,
        })
        .await?;
        rx.await.map_err(closed)
    }

    /// Trains on a batch of messages, persisting once at the end.
    pub async fn train(&self, messages: Vec<String>) -> Result<TrainingSummary> {
        let (reply, rx) = oneshot::channel();
        self.send(StyleCommand::Train { messages, reply }).await?;
        rx.await.map_err(closed)
    }

    /// Replaces the whole profile (external reset) and persists it.
    pub async fn replace(&self, profile: StyleProfile) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.send(StyleCommand::Replace { profile, reply }).await?;
        rx.await.map_err(closed)
    }

    async fn send(&self, command: StyleCommand) -> Result<()> {
        self.tx
            .send(command)
            .await
            .map_err(|e| BotError::StyleServiceClosed(Arc::new(format!("{:?} not delivered", e.0))))
    }
}

fn closed(_: oneshot::error::RecvError) -> BotError {
    BotError::StyleServiceClosed(Arc::new("style task dropped the reply".to_string()))
}

struct StyleActor {
    profile: StyleProfile,
    store: StyleProfileStore,
    learner: StyleLearner,
    learning: LearningConfig,
}

impl StyleActor {
    async fn run(mut self, mut rx: mpsc::Receiver<StyleCommand>) {
        info!(
            "Style service started (learn from inbound: {}, from generated: {})",
            self.learning.from_inbound, self.learning.from_generated
        );

        while let Some(command) = rx.recv().await {
            debug!("Style command: {:?}", command);
            match command {
                StyleCommand::Snapshot(reply) => {
                    let _ = reply.send(self.profile.clone());
                }
                StyleCommand::Learn {
                    source,
                    text,
                    reply,
                } => {
                    let outcome = self.learn(source, &text);
                    if outcome.applied {
                        self.persist().await;
                    }
                    let _ = reply.send(outcome);
                }
                StyleCommand::Train { messages, reply } => {
                    let summary = self.learner.train(&mut self.profile, &messages);
                    self.persist().await;
                    info!(
                        "Trained style on {} messages ({} new words, {} new emojis)",
                        summary.messages, summary.new_words, summary.new_emojis
                    );
                    let _ = reply.send(summary);
                }
                StyleCommand::Replace { profile, reply } => {
                    self.profile = profile;
                    self.profile.normalize(self.learner.max_frequent_phrases());
                    self.persist().await;
                    let _ = reply.send(());
                }
            }
        }

        debug!("Style service stopped");
    }

    fn learn(&mut self, source: LearningSource, text: &str) -> LearnOutcome {
        match source {
            LearningSource::Generated if self.learning.from_generated => LearnOutcome {
                applied: true,
                new_words: self.learner.absorb(&mut self.profile, text),
                new_emojis: 0,
            },
            LearningSource::Inbound if self.learning.from_inbound => LearnOutcome {
                applied: true,
                new_words: self.learner.absorb(&mut self.profile, text),
                new_emojis: self.learner.absorb_emojis(&mut self.profile, text),
            },
            _ => LearnOutcome::default(),
        }
    }

    /// Write-through. Failures are logged; memory stays authoritative.
    async fn persist(&self) {
        let store = self.store.clone();
        let snapshot = self.profile.clone();

        match tokio::task::spawn_blocking(move || store.save(&snapshot)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("Failed to save style profile: {}", e),
            Err(e) => warn!("Style profile save task failed: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn service(temp: &TempDir, learning: LearningConfig) -> StyleService {
        let store = StyleProfileStore::new(temp.path().join("style_profile.json"));
        let (service, _handle) = StyleService::spawn(store, StyleLearner::default(), learning);
        service
    }

    #[tokio::test]
    async fn test_generated_learning_writes_through() {
        let temp = TempDir::new().unwrap();
        let style = service(&temp, LearningConfig::default());

        let outcome = style
            .learn(LearningSource::Generated, "massive jackpot tonight 😀")
            .await
            .unwrap();

        assert!(outcome.applied);
        assert_eq!(outcome.new_words, 3);
        assert_eq!(outcome.new_emojis, 0);

        let on_disk = StyleProfileStore::new(temp.path().join("style_profile.json")).load();
        assert_eq!(on_disk.frequent_phrases, vec!["massive", "jackpot", "tonight"]);
    }

    #[tokio::test]
    async fn test_inbound_learning_disabled_by_default() {
        let temp = TempDir::new().unwrap();
        let style = service(&temp, LearningConfig::default());

        let outcome = style.learn(LearningSource::Inbound, "hello friends").await.unwrap();

        assert!(!outcome.applied);
        assert!(style.snapshot().await.unwrap().frequent_phrases.is_empty());
        assert!(!temp.path().join("style_profile.json").exists());
    }

    #[tokio::test]
    async fn test_inbound_learning_picks_up_emoji() {
        let temp = TempDir::new().unwrap();
        let learning = LearningConfig {
            from_inbound: true,
            from_generated: false,
        };
        let style = service(&temp, learning);

        let inbound = style.learn(LearningSource::Inbound, "hello friends 😎").await.unwrap();
        let generated = style.learn(LearningSource::Generated, "ignored words").await.unwrap();

        assert_eq!(inbound.new_emojis, 1);
        assert!(!generated.applied);
        let profile = style.snapshot().await.unwrap();
        assert!(profile.emojis().contains(&"😎".to_string()));
        assert_eq!(profile.frequent_phrases, vec!["hello", "friends"]);
    }

    #[tokio::test]
    async fn test_concurrent_learning_loses_no_updates() {
        let temp = TempDir::new().unwrap();
        let style = service(&temp, LearningConfig::default());

        let mut handles = Vec::new();
        for i in 0..20 {
            let style = style.clone();
            handles.push(tokio::spawn(async move {
                style
                    .learn(LearningSource::Generated, &format!("word{i:02}"))
                    .await
                    .unwrap()
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(style.snapshot().await.unwrap().frequent_phrases.len(), 20);
    }

    #[tokio::test]
    async fn test_train_and_replace() {
        let temp = TempDir::new().unwrap();
        let style = service(&temp, LearningConfig::default());

        let summary = style
            .train(vec!["great stream tonight 🚀".to_string(), String::new()])
            .await
            .unwrap();
        assert_eq!(summary.messages, 1);
        assert_eq!(summary.skipped, 1);
        assert!(style.snapshot().await.unwrap().emojis().contains(&"🚀".to_string()));

        style.replace(StyleProfile::with_tone("Calm")).await.unwrap();
        let profile = style.snapshot().await.unwrap();
        assert_eq!(profile.tone(), "Calm");
        assert!(profile.emojis().is_empty());
    }
}
