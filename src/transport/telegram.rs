//! Telegram Bot API transport
//!
//! Long-polls `getUpdates`; no public URL or webhook needed. Each text
//! message from a human is dispatched to the handler on its own tokio task.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::errors::{BotError, Result};

use super::{split_message, InboundMessage, MessageHandler, Transport, MAX_MESSAGE_LEN};

const TG_API: &str = "https://api.telegram.org/bot";

/// Pause after a failed poll
const POLL_ERROR_BACKOFF: Duration = Duration::from_secs(5);

#[derive(Debug, Deserialize)]
struct TgResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TgUpdate {
    update_id: i64,
    message: Option<TgMessage>,
}

#[derive(Debug, Deserialize)]
struct TgMessage {
    message_id: i64,
    from: Option<TgUser>,
    chat: TgChat,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TgUser {
    id: i64,
    #[serde(default)]
    is_bot: bool,
    first_name: Option<String>,
    username: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TgChat {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct TgBotInfo {
    username: Option<String>,
    first_name: Option<String>,
}

impl TgMessage {
    /// Human text messages only
    fn into_inbound(self) -> Option<InboundMessage> {
        let user = self.from?;
        if user.is_bot {
            return None;
        }
        let text = self.text.filter(|t| !t.trim().is_empty())?;

        Some(InboundMessage {
            message_id: self.message_id,
            user_id: user.id,
            chat_id: self.chat.id,
            username: user.username.or(user.first_name),
            text,
        })
    }
}

/// Telegram Bot API transport
pub struct TelegramTransport {
    client: reqwest::Client,
    token: String,
    poll_timeout: u64,
    stop: Arc<AtomicBool>,
}

impl TelegramTransport {
    pub fn new(token: &str, poll_timeout: u64) -> Result<Self> {
        if token.trim().is_empty() {
            return Err(BotError::config("TELEGRAM_BOT_TOKEN is not set"));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(poll_timeout + 30))
            .build()?;

        Ok(Self {
            client,
            token: token.to_string(),
            poll_timeout,
            stop: Arc::new(AtomicBool::new(false)),
        })
    }

    fn url(&self, method: &str) -> String {
        format!("{TG_API}{}/{method}", self.token)
    }

    /// Verifies the token. Returns `@username (name)`.
    pub async fn get_me(&self) -> Result<String> {
        let resp: TgResponse<TgBotInfo> =
            self.client.get(self.url("getMe")).send().await?.json().await?;

        if !resp.ok {
            return Err(BotError::transport(format!(
                "getMe failed: {}",
                resp.description.unwrap_or_default()
            )));
        }

        let info = resp
            .result
            .ok_or_else(|| BotError::transport("getMe: no result"))?;
        Ok(format!(
            "@{} ({})",
            info.username.unwrap_or_else(|| "unknown".to_string()),
            info.first_name.unwrap_or_else(|| "Bot".to_string())
        ))
    }

    async fn get_updates(&self, offset: i64) -> Result<Vec<TgUpdate>> {
        let resp: TgResponse<Vec<TgUpdate>> = self
            .client
            .get(self.url("getUpdates"))
            .query(&[
                ("offset", offset.to_string()),
                ("timeout", self.poll_timeout.to_string()),
                ("allowed_updates", "[\"message\"]".to_string()),
            ])
            .send()
            .await?
            .json()
            .await?;

        if !resp.ok {
            return Err(BotError::transport(format!(
                "getUpdates error: {}",
                resp.description.unwrap_or_default()
            )));
        }

        Ok(resp.result.unwrap_or_default())
    }

    async fn post_message(&self, body: &serde_json::Value) -> Result<reqwest::StatusCode> {
        let resp = self.client.post(self.url("sendMessage")).json(body).send().await?;
        Ok(resp.status())
    }
}

#[async_trait]
impl Transport for TelegramTransport {
    async fn on_message(&self, handler: Arc<dyn MessageHandler>) -> Result<()> {
        let me = self.get_me().await?;
        info!("[telegram] Connected as {}", me);

        self.stop.store(false, Ordering::Relaxed);
        let mut offset: i64 = 0;

        while !self.stop.load(Ordering::Relaxed) {
            match self.get_updates(offset).await {
                Ok(updates) => {
                    for update in updates {
                        offset = update.update_id + 1;

                        let Some(message) = update.message.and_then(TgMessage::into_inbound) else {
                            continue;
                        };

                        debug!(
                            "[telegram] Message from {} in chat {}",
                            message.user_id, message.chat_id
                        );
                        let handler = Arc::clone(&handler);
                        tokio::spawn(async move { handler.handle(message).await });
                    }
                }
                Err(e) => {
                    warn!("[telegram] Poll error: {} - retrying in {:?}", e, POLL_ERROR_BACKOFF);
                    tokio::time::sleep(POLL_ERROR_BACKOFF).await;
                }
            }
        }

        info!("[telegram] Stop signal received, exiting poll loop");
        Ok(())
    }

    async fn send_message(&self, chat_id: i64, text: &str) -> Result<()> {
        for chunk in split_message(text, MAX_MESSAGE_LEN) {
            let body = json!({
                "chat_id": chat_id,
                "text": chunk,
                "parse_mode": "Markdown",
            });

            let status = self.post_message(&body).await?;
            if status.is_success() {
                continue;
            }

            // Unbalanced emphasis markers break Markdown parsing; retry as plain text
            debug!("[telegram] sendMessage with Markdown returned {}, retrying plain", status);
            let plain = json!({ "chat_id": chat_id, "text": chunk });
            let status = self.post_message(&plain).await?;
            if !status.is_success() {
                return Err(BotError::transport(format!(
                    "sendMessage to {chat_id} failed with {status}"
                )));
            }
        }
        Ok(())
    }

    fn stop(&self) {
        self.stop.store(true, Ordering::Relaxed);
        info!("[telegram] Stop signal sent");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn update(json: &str) -> TgUpdate {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_text_message_is_inbound() {
        let update = update(
            r#"{"update_id":10,"message":{"message_id":5,"date":0,
                "from":{"id":42,"is_bot":false,"first_name":"Ana","username":"ana"},
                "chat":{"id":99,"type":"private"},"text":"feeling lucky?"}}"#,
        );

        let inbound = update.message.and_then(TgMessage::into_inbound).unwrap();

        assert_eq!(inbound.user_id, 42);
        assert_eq!(inbound.chat_id, 99);
        assert_eq!(inbound.username.as_deref(), Some("ana"));
        assert_eq!(inbound.text, "feeling lucky?");
    }

    #[test]
    fn test_bot_and_non_text_messages_are_skipped() {
        let from_bot = update(
            r#"{"update_id":1,"message":{"message_id":1,"from":{"id":1,"is_bot":true,"first_name":"B"},
                "chat":{"id":1},"text":"hi"}}"#,
        );
        let sticker = update(
            r#"{"update_id":2,"message":{"message_id":2,"from":{"id":2,"is_bot":false,"first_name":"C"},
                "chat":{"id":2}}}"#,
        );

        assert!(from_bot.message.and_then(TgMessage::into_inbound).is_none());
        assert!(sticker.message.and_then(TgMessage::into_inbound).is_none());
    }

    #[test]
    fn test_username_falls_back_to_first_name() {
        let update = update(
            r#"{"update_id":3,"message":{"message_id":3,"from":{"id":3,"first_name":"Dee"},
                "chat":{"id":3},"text":"yo"}}"#,
        );

        let inbound = update.message.and_then(TgMessage::into_inbound).unwrap();
        assert_eq!(inbound.username.as_deref(), Some("Dee"));
    }

    #[test]
    fn test_empty_token_rejected() {
        assert!(TelegramTransport::new("  ", 30).is_err());
    }
}
