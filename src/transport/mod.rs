//! Transport capability
//!
//! The bot never talks to a messaging platform directly. A [`Transport`]
//! delivers inbound messages to the registered [`MessageHandler`] and sends
//! replies back; [`TelegramTransport`] is the Bot API implementation.

pub mod telegram;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::Result;

pub use telegram::TelegramTransport;

/// Telegram hard limit is 4096 characters; stay below it
pub const MAX_MESSAGE_LEN: usize = 4000;

/// A text message received from the platform
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundMessage {
    pub message_id: i64,
    pub user_id: i64,
    pub chat_id: i64,
    pub username: Option<String>,
    pub text: String,
}

/// Receives every inbound message.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle(&self, message: InboundMessage);
}

/// Messaging platform capability
#[async_trait]
pub trait Transport: Send + Sync {
    /// Runs the receive loop until [`stop`](Self::stop) is called, handing
    /// each message to `handler` on its own task.
    async fn on_message(&self, handler: Arc<dyn MessageHandler>) -> Result<()>;

    /// Delivers `text` to `chat_id`.
    async fn send_message(&self, chat_id: i64, text: &str) -> Result<()>;

    /// Asks the receive loop to finish.
    fn stop(&self);
}

/// Splits `text` into chunks of at most `max_len` bytes, preferring line
/// and word boundaries and never cutting a character.
pub fn split_message(text: &str, max_len: usize) -> Vec<String> {
    if text.len() <= max_len {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut remaining = text;
    while !remaining.is_empty() {
        if remaining.len() <= max_len {
            chunks.push(remaining.to_string());
            break;
        }

        let mut limit = max_len;
        while !remaining.is_char_boundary(limit) {
            limit -= 1;
        }
        let window = &remaining[..limit];
        let split_at = window
            .rfind('\n')
            .or_else(|| window.rfind(' '))
            .filter(|&i| i > 0)
            .unwrap_or(limit.max(remaining.chars().next().map_or(1, char::len_utf8)));

        chunks.push(remaining[..split_at].to_string());
        remaining = remaining[split_at..].trim_start();
    }
    chunks
}
