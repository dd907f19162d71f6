//! Bot - wires the pipeline to a transport.
//!
//! [`Bot`] is the [`MessageHandler`] the transport calls for every inbound
//! message: allowlist check, pipeline, delivery, audit record.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::fs;
use tracing::{error, info, warn};

use crate::config::{BotConfig, DataPaths};
use crate::conversation::{AuditLog, ConversationMemory, ExchangeRecord};
use crate::errors::{BotError, Result};
use crate::pipeline::ResponsePipeline;
use crate::providers::Generator;
use crate::style::{StyleLearner, StyleProfileStore, StyleService, TrainingSummary};
use crate::training::load_historical_conversations;
use crate::transport::{InboundMessage, MessageHandler, Transport};

/// Prefix of messages sent to the admin chat
pub const ADMIN_PREFIX: &str = "[ADMIN NOTIFICATION]";

pub struct Bot {
    pipeline: Arc<ResponsePipeline>,
    transport: Arc<dyn Transport>,
    paths: DataPaths,
    allowed_user_ids: HashSet<i64>,
    admin_chat_id: Option<i64>,
    audit: Option<AuditLog>,
}

impl Bot {
    pub fn new(
        pipeline: Arc<ResponsePipeline>,
        transport: Arc<dyn Transport>,
        paths: DataPaths,
    ) -> Self {
        Self {
            pipeline,
            transport,
            paths,
            allowed_user_ids: HashSet::new(),
            admin_chat_id: None,
            audit: None,
        }
    }

    /// Builds the full bot from configuration: style service, memory,
    /// pipeline and audit log.
    pub fn from_config(
        config: &BotConfig,
        generator: Arc<dyn Generator>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let store = StyleProfileStore::new(config.paths.style_profile())
            .with_max_frequent_phrases(config.frequent_phrase_limit);
        let learner = StyleLearner::new(config.frequent_phrase_limit);
        let (style, _task) = StyleService::spawn(store, learner, config.learning);

        let memory = Arc::new(ConversationMemory::new(config.history_limit));
        let pipeline = ResponsePipeline::new(generator, style, memory)
            .with_timeout(Duration::from_secs(config.generation_timeout_seconds))
            .with_prompt_builder(config.prompt.builder());

        let mut bot = Self::new(Arc::new(pipeline), transport, config.paths.clone())
            .with_allowed_users(config.telegram.allowed_user_ids.iter().copied())
            .with_admin_chat(config.telegram.admin_chat_id);
        if config.audit_log {
            bot = bot.with_audit_log(AuditLog::new(config.paths.conversation_logs()));
        }
        bot
    }

    pub fn with_allowed_users(mut self, users: impl IntoIterator<Item = i64>) -> Self {
        self.allowed_user_ids = users.into_iter().collect();
        self
    }

    pub fn with_admin_chat(mut self, chat_id: Option<i64>) -> Self {
        self.admin_chat_id = chat_id;
        self
    }

    pub fn with_audit_log(mut self, audit: AuditLog) -> Self {
        self.audit = Some(audit);
        self
    }

    pub fn pipeline(&self) -> &Arc<ResponsePipeline> {
        &self.pipeline
    }

    /// An empty allowlist admits nobody.
    pub fn is_allowed(&self, user_id: i64) -> bool {
        self.allowed_user_ids.contains(&user_id)
    }

    /// Creates the data directories and seeds the profile from the
    /// historical corpus, one batch per conversation.
    pub async fn initialize(&self) -> Result<TrainingSummary> {
        for dir in [self.paths.root(), self.paths.conversation_logs()] {
            fs::create_dir_all(&dir)
                .await
                .map_err(|e| BotError::persistence(&dir, e.to_string()))?;
        }

        let path = self.paths.historical_conversations();
        let conversations = tokio::task::spawn_blocking(move || load_historical_conversations(&path))
            .await
            .map_err(|e| BotError::persistence(self.paths.historical_conversations(), e.to_string()))?;

        let mut total = TrainingSummary::default();
        for conversation in conversations {
            let summary = self.pipeline.style().train(conversation).await?;
            total.messages += summary.messages;
            total.skipped += summary.skipped;
            total.new_words += summary.new_words;
            total.new_emojis += summary.new_emojis;
        }

        if total.messages > 0 {
            info!("Seeded style profile from {} historical messages", total.messages);
        }
        Ok(total)
    }

    /// Initializes, then runs the transport until it is stopped.
    ///
    /// A recoverable initialization failure is reported to the admin and the
    /// bot starts anyway with the profile it already has.
    pub async fn start(self: Arc<Self>) -> Result<()> {
        if self.allowed_user_ids.is_empty() {
            warn!("No allowed users configured; every message will be ignored");
        }

        if let Err(e) = self.initialize().await {
            error!("Bot initialization failed: {}", e);
            self.notify_admin(&format!("Initialization Error: {e}")).await;
            if !e.is_recoverable() {
                return Err(e);
            }
            warn!("Continuing without historical training");
        }

        let transport = Arc::clone(&self.transport);
        let handler: Arc<dyn MessageHandler> = self;
        transport.on_message(handler).await
    }

    pub fn stop(&self) {
        self.transport.stop();
    }

    /// Best effort; failures are only logged.
    pub async fn notify_admin(&self, message: &str) {
        let Some(chat_id) = self.admin_chat_id else {
            warn!("No admin chat configured, dropping notification: {}", message);
            return;
        };

        if let Err(e) = self
            .transport
            .send_message(chat_id, &format!("{ADMIN_PREFIX} {message}"))
            .await
        {
            error!("Failed to send admin notification: {}", e);
        }
    }
}

#[async_trait]
impl MessageHandler for Bot {
    async fn handle(&self, message: InboundMessage) {
        if !self.is_allowed(message.user_id) {
            return;
        }

        let user_id = message.user_id.to_string();
        let reply = self
            .pipeline
            .respond(&user_id, &message.chat_id.to_string(), &message.text)
            .await;

        if let Err(e) = self.transport.send_message(message.chat_id, &reply.text).await {
            error!("Failed to deliver reply to chat {}: {}", message.chat_id, e);
            self.notify_admin(&format!("Critical error: {e}")).await;
            return;
        }

        if let Some(audit) = &self.audit {
            let record = ExchangeRecord::new(
                &user_id,
                message.username.as_deref(),
                &message.text,
                &reply.text,
            );
            if let Err(e) = audit.record(&record).await {
                warn!("Failed to save conversation log: {}", e);
            }
        }
    }
}
