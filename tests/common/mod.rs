//! Shared test doubles for the integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use tonebot::errors::{BotError, Result};
use tonebot::providers::Generator;
use tonebot::transport::{MessageHandler, Transport};

/// Returns the same text for every prompt and keeps the prompts it saw.
pub struct CannedGenerator {
    reply: String,
    pub prompts: Mutex<Vec<String>>,
}

impl CannedGenerator {
    pub fn new(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Generator for CannedGenerator {
    fn name(&self) -> &str {
        "canned"
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok(self.reply.clone())
    }
}

/// Always fails.
pub struct FailingGenerator;

#[async_trait]
impl Generator for FailingGenerator {
    fn name(&self) -> &str {
        "failing"
    }

    async fn generate(&self, _prompt: &str) -> Result<String> {
        Err(BotError::generation("backend unavailable"))
    }
}

/// Answers after a delay.
pub struct SlowGenerator(pub Duration);

#[async_trait]
impl Generator for SlowGenerator {
    fn name(&self) -> &str {
        "slow"
    }

    async fn generate(&self, _prompt: &str) -> Result<String> {
        tokio::time::sleep(self.0).await;
        Ok("too late".to_string())
    }
}

/// Records sends; sends to `failing_chat` fail.
#[derive(Default)]
pub struct RecordingTransport {
    pub sent: Mutex<Vec<(i64, String)>>,
    pub failing_chat: Option<i64>,
    pub receive_loops: AtomicUsize,
}

impl RecordingTransport {
    pub fn failing_for(chat_id: i64) -> Self {
        Self {
            failing_chat: Some(chat_id),
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<(i64, String)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn receive_loops(&self) -> usize {
        self.receive_loops.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn on_message(&self, _handler: Arc<dyn MessageHandler>) -> Result<()> {
        self.receive_loops.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn send_message(&self, chat_id: i64, text: &str) -> Result<()> {
        if self.failing_chat == Some(chat_id) {
            return Err(BotError::transport("chat not found"));
        }
        self.sent.lock().unwrap().push((chat_id, text.to_string()));
        Ok(())
    }

    fn stop(&self) {}
}
