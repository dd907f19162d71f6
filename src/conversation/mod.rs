//! Conversation state
//!
//! Per-user bounded history ([`ConversationMemory`]), the per-exchange
//! [`ConversationContext`] handed to the prompt builder, and the optional
//! [`AuditLog`] of finished exchanges.

mod audit;
mod memory;

pub use audit::{AuditLog, ExchangeRecord};
pub use memory::ConversationMemory;

use serde::{Deserialize, Serialize};

/// Entries kept per user when nothing else is configured
pub const DEFAULT_HISTORY_LIMIT: usize = 20;

/// Everything the prompt builder needs for one exchange.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationContext {
    /// Prior turns, oldest first, alternating user/bot
    pub conversation_history: Vec<String>,
    /// Text being answered
    pub current_message: String,
    pub user_id: String,
    pub chat_id: String,
}

impl ConversationContext {
    pub fn new(user_id: &str, chat_id: &str, current_message: &str) -> Self {
        Self {
            conversation_history: Vec::new(),
            current_message: current_message.to_string(),
            user_id: user_id.to_string(),
            chat_id: chat_id.to_string(),
        }
    }

    pub fn with_history(mut self, history: Vec<String>) -> Self {
        self.conversation_history = history;
        self
    }
}
