//! Chat export preprocessing
//!
//! Turns raw exports (`[{ "from", "text", "date" }]`) into training documents
//! that group messages per user.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{info, warn};

use crate::errors::{BotError, Result};

const OUTPUT_PREFIX: &str = "processed_";

/// One line of a raw chat export
#[derive(Debug, Clone, Deserialize)]
struct RawChatMessage {
    from: String,
    text: String,
    date: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Bot,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingMessage {
    pub text: String,
    pub sender: Sender,
    /// Milliseconds since the epoch; `None` when the date did not parse
    pub timestamp: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationData {
    pub user_id: String,
    pub messages: Vec<TrainingMessage>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingData {
    pub conversations: Vec<ConversationData>,
}

impl TrainingData {
    /// All message texts, in document order
    pub fn texts(&self) -> Vec<String> {
        self.conversations
            .iter()
            .flat_map(|c| c.messages.iter().map(|m| m.text.clone()))
            .collect()
    }
}

/// Converts every `*.json` export in `input_dir` into
/// `output_dir/processed_<name>.json`.
#[derive(Debug, Clone)]
pub struct ChatPreprocessor {
    input_dir: PathBuf,
    output_dir: PathBuf,
    bot_username: Option<String>,
}

impl ChatPreprocessor {
    pub fn new(input_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            input_dir: input_dir.into(),
            output_dir: output_dir.into(),
            bot_username: None,
        }
    }

    /// Messages whose `from` equals this name are tagged as bot messages.
    pub fn with_bot_username(mut self, username: impl Into<String>) -> Self {
        self.bot_username = Some(username.into());
        self
    }

    /// Processes all exports; returns the written files.
    ///
    /// An unreadable or malformed export is logged and skipped.
    pub async fn run(&self) -> Result<Vec<PathBuf>> {
        fs::create_dir_all(&self.output_dir)
            .await
            .map_err(|e| BotError::persistence(&self.output_dir, e.to_string()))?;

        let mut exports = Vec::new();
        let mut entries = fs::read_dir(&self.input_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                exports.push(path);
            }
        }
        exports.sort();

        let mut written = Vec::with_capacity(exports.len());
        for path in exports {
            match self.process_file(&path).await {
                Ok(output) => {
                    info!("Processed {:?} -> {:?}", path, output);
                    written.push(output);
                }
                Err(e) => warn!("Skipping export {:?}: {}", path, e),
            }
        }

        Ok(written)
    }

    async fn process_file(&self, path: &Path) -> Result<PathBuf> {
        let content = fs::read_to_string(path).await?;
        let messages: Vec<RawChatMessage> = serde_json::from_str(&content).map_err(|e| {
            BotError::ParseError(Arc::new(format!("{} is not a chat export: {e}", path.display())))
        })?;
        let data = self.process_messages(messages);

        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let output = self.output_dir.join(format!("{OUTPUT_PREFIX}{file_name}"));

        let json = serde_json::to_string_pretty(&data)?;
        fs::write(&output, json)
            .await
            .map_err(|e| BotError::persistence(&output, e.to_string()))?;
        Ok(output)
    }

    /// Groups messages per sanitized user id, keeping first-seen order.
    fn process_messages(&self, messages: Vec<RawChatMessage>) -> TrainingData {
        let mut index: HashMap<String, usize> = HashMap::new();
        let mut data = TrainingData::default();

        for message in messages {
            let user_id = sanitize_user_id(&message.from);
            let slot = *index.entry(user_id.clone()).or_insert_with(|| {
                data.conversations.push(ConversationData {
                    user_id,
                    messages: Vec::new(),
                });
                data.conversations.len() - 1
            });

            let sender = if self.bot_username.as_deref() == Some(message.from.as_str()) {
                Sender::Bot
            } else {
                Sender::User
            };

            data.conversations[slot].messages.push(TrainingMessage {
                timestamp: parse_timestamp(&message.date),
                text: message.text,
                sender,
            });
        }

        data
    }
}

/// Lowercases and replaces anything outside `[a-z0-9]` with `_`.
pub fn sanitize_user_id(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_lowercase() || c.is_ascii_digit() { c } else { '_' })
        .collect()
}

/// RFC 3339, or a zone-less `YYYY-MM-DDTHH:MM:SS` taken as UTC.
fn parse_timestamp(date: &str) -> Option<i64> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(date) {
        return Some(dt.timestamp_millis());
    }
    ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(date, fmt).ok())
        .map(|dt| dt.and_utc().timestamp_millis())
}
