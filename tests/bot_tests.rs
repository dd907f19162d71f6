//! Integration tests for the bot message handler.

mod common;

use std::fs;
use std::sync::Arc;

use tempfile::TempDir;

use common::{CannedGenerator, RecordingTransport};
use tonebot::bot::{Bot, ADMIN_PREFIX};
use tonebot::config::BotConfig;
use tonebot::transport::{InboundMessage, MessageHandler};

const ADMIN_CHAT: i64 = 1;
const ALLOWED_USER: i64 = 42;

fn config(temp: &TempDir) -> BotConfig {
    let mut config = BotConfig::default();
    config.paths.data_dir = Some(temp.path().to_path_buf());
    config.telegram.allowed_user_ids = vec![ALLOWED_USER];
    config.telegram.admin_chat_id = Some(ADMIN_CHAT);
    config
}

fn message(user_id: i64, chat_id: i64, text: &str) -> InboundMessage {
    InboundMessage {
        message_id: 1,
        user_id,
        chat_id,
        username: Some("ana".to_string()),
        text: text.to_string(),
    }
}

fn audit_records(temp: &TempDir) -> Vec<serde_json::Value> {
    let dir = temp.path().join("conversation_logs");
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    entries
        .map(|e| {
            let content = fs::read_to_string(e.expect("dir entry").path()).expect("read record");
            serde_json::from_str(&content).expect("valid record")
        })
        .collect()
}

// ==================== Message Handling ====================

#[tokio::test]
async fn test_allowed_user_gets_reply_and_audit_record() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let transport = Arc::new(RecordingTransport::default());
    let bot = Bot::from_config(
        &config(&temp),
        Arc::new(CannedGenerator::new("good luck")),
        transport.clone(),
    );

    bot.handle(message(ALLOWED_USER, 99, "wish me luck")).await;

    let sent = transport.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, 99);
    assert!(sent[0].1.starts_with("good luck "));

    let records = audit_records(&temp);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["userId"], "42");
    assert_eq!(records[0]["username"], "ana");
    assert_eq!(records[0]["userMessage"], "wish me luck");
    assert_eq!(records[0]["botResponse"], sent[0].1.as_str());
}

#[tokio::test]
async fn test_unknown_user_is_ignored() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let transport = Arc::new(RecordingTransport::default());
    let generator = Arc::new(CannedGenerator::new("hi"));
    let bot = Bot::from_config(&config(&temp), generator.clone(), transport.clone());

    bot.handle(message(7, 99, "let me in")).await;

    assert!(transport.sent().is_empty());
    assert!(generator.prompts().is_empty());
    assert!(audit_records(&temp).is_empty());
}

#[tokio::test]
async fn test_empty_allowlist_admits_nobody() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let mut config = config(&temp);
    config.telegram.allowed_user_ids.clear();
    let transport = Arc::new(RecordingTransport::default());
    let bot = Bot::from_config(&config, Arc::new(CannedGenerator::new("hi")), transport.clone());

    bot.handle(message(ALLOWED_USER, 99, "hello")).await;

    assert!(!bot.is_allowed(ALLOWED_USER));
    assert!(transport.sent().is_empty());
}

#[tokio::test]
async fn test_delivery_failure_notifies_admin() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let transport = Arc::new(RecordingTransport::failing_for(99));
    let bot = Bot::from_config(
        &config(&temp),
        Arc::new(CannedGenerator::new("hi")),
        transport.clone(),
    );

    bot.handle(message(ALLOWED_USER, 99, "hello")).await;

    let sent = transport.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, ADMIN_CHAT);
    assert!(sent[0].1.starts_with(ADMIN_PREFIX));
    assert!(audit_records(&temp).is_empty());
}

#[tokio::test]
async fn test_audit_log_can_be_disabled() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let mut config = config(&temp);
    config.audit_log = false;
    let transport = Arc::new(RecordingTransport::default());
    let bot = Bot::from_config(&config, Arc::new(CannedGenerator::new("hi")), transport.clone());

    bot.handle(message(ALLOWED_USER, 99, "hello")).await;

    assert_eq!(transport.sent().len(), 1);
    assert!(audit_records(&temp).is_empty());
}

// ==================== Initialization ====================

#[tokio::test]
async fn test_initialize_seeds_profile_from_history() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    fs::write(
        temp.path().join("historical_conversations.json"),
        r#"[["massive stream tonight 🚀"], ["welcome back"]]"#,
    )
    .expect("write corpus");
    let bot = Bot::from_config(
        &config(&temp),
        Arc::new(CannedGenerator::new("hi")),
        Arc::new(RecordingTransport::default()),
    );

    let summary = bot.initialize().await.expect("initialize");

    assert_eq!(summary.messages, 2);
    assert!(temp.path().join("conversation_logs").is_dir());
    let profile = bot.pipeline().style().snapshot().await.expect("style service");
    assert_eq!(
        profile.frequent_phrases,
        vec!["massive", "stream", "tonight", "welcome", "back"]
    );
    assert!(profile.emojis().contains(&"🚀".to_string()));
    assert!(temp.path().join("style_profile.json").exists());
}

#[tokio::test]
async fn test_initialize_without_corpus() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let bot = Bot::from_config(
        &config(&temp),
        Arc::new(CannedGenerator::new("hi")),
        Arc::new(RecordingTransport::default()),
    );

    let summary = bot.initialize().await.expect("initialize");

    assert_eq!(summary.messages, 0);
}

#[tokio::test]
async fn test_start_survives_recoverable_init_failure() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let blocker = temp.path().join("not_a_dir");
    fs::write(&blocker, "occupied").expect("write blocker");
    let mut config = config(&temp);
    config.paths.data_dir = Some(blocker);
    let transport = Arc::new(RecordingTransport::default());
    let bot = Arc::new(Bot::from_config(
        &config,
        Arc::new(CannedGenerator::new("hi")),
        transport.clone(),
    ));

    Arc::clone(&bot).start().await.expect("bot started");

    assert_eq!(transport.receive_loops(), 1);
    let sent = transport.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, ADMIN_CHAT);
    assert!(sent[0].1.contains("Initialization Error"));
}

// ==================== Prompt ====================

#[tokio::test]
async fn test_prompt_config_reaches_generator() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let mut config = config(&temp);
    config.prompt.include_tone_variations = true;
    config.prompt.instructions = Some(vec!["Answer in one line".to_string()]);
    let generator = Arc::new(CannedGenerator::new("hi"));
    let bot = Bot::from_config(
        &config,
        generator.clone(),
        Arc::new(RecordingTransport::default()),
    );

    bot.handle(message(ALLOWED_USER, 99, "hello")).await;

    let prompts = generator.prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("Tone (supportive): together, priority, help, concern"));
    assert!(prompts[0].contains("1. Answer in one line"));
    assert!(!prompts[0].contains("Matches the channel's energetic and casual tone"));
}
