//! Conversation Memory - bounded per-user history.

use std::collections::{HashMap, VecDeque};

use tokio::sync::Mutex;

use super::DEFAULT_HISTORY_LIMIT;

/// Recent turns per user, oldest first.
#[derive(Debug)]
pub struct ConversationMemory {
    limit: usize,
    histories: Mutex<HashMap<String, VecDeque<String>>>,
}

impl Default for ConversationMemory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}

impl ConversationMemory {
    /// Creates a memory keeping at most `limit` entries per user.
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            histories: Mutex::new(HashMap::new()),
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// History of `user_id`; empty for unknown users.
    pub async fn get(&self, user_id: &str) -> Vec<String> {
        self.histories
            .lock()
            .await
            .get(user_id)
            .map(|h| h.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Appends `texts` in order, then drops the oldest entries over the limit.
    pub async fn append<S: AsRef<str>>(&self, user_id: &str, texts: &[S]) {
        let mut histories = self.histories.lock().await;
        let history = histories.entry(user_id.to_string()).or_default();

        history.extend(texts.iter().map(|t| t.as_ref().to_string()));
        while history.len() > self.limit {
            history.pop_front();
        }
    }

    /// Number of users with a history.
    pub async fn user_count(&self) -> usize {
        self.histories.lock().await.len()
    }
}
