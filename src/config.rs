//! Bot Configuration
//!
//! Layered configuration: built-in defaults, then an optional TOML/JSON file,
//! then environment variables. Missing credentials are reported by
//! [`BotConfig::validate`] so the process can fail fast at startup.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::errors::{BotError, Result};
use crate::gemini::GeminiConfig;
use crate::style::PromptBuilder;

/// Learning paths. See [`crate::style::LearningSource`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LearningConfig {
    /// Learn vocabulary and emoji from user messages
    pub from_inbound: bool,
    /// Learn vocabulary from the bot's own generated replies
    pub from_generated: bool,
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            from_inbound: false,
            from_generated: true,
        }
    }
}

/// Prompt rendering
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptConfig {
    /// Replaces the built-in response instructions when set
    pub instructions: Option<Vec<String>>,
    /// List the profile's tone variations in the style guidelines
    pub include_tone_variations: bool,
}

impl PromptConfig {
    pub fn builder(&self) -> PromptBuilder {
        let builder = PromptBuilder::new().with_tone_variations(self.include_tone_variations);
        match &self.instructions {
            Some(instructions) => builder.with_instructions(instructions.clone()),
            None => builder,
        }
    }
}

/// Telegram bot settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    /// Token from @BotFather
    pub bot_token: String,
    /// Chat that receives admin notifications
    pub admin_chat_id: Option<i64>,
    /// Users allowed to talk to the bot
    pub allowed_user_ids: Vec<i64>,
    /// Long-poll timeout for getUpdates
    pub poll_timeout_seconds: u64,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            admin_chat_id: None,
            allowed_user_ids: Vec::new(),
            poll_timeout_seconds: 30,
        }
    }
}

/// On-disk locations
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DataPaths {
    /// Root data directory
    pub data_dir: Option<PathBuf>,
}

impl DataPaths {
    /// Root data directory, defaulting to the platform data dir.
    pub fn root(&self) -> PathBuf {
        self.data_dir
            .clone()
            .or_else(|| {
                ProjectDirs::from("com", "tonebot", "tonebot").map(|d| d.data_dir().to_path_buf())
            })
            .unwrap_or_else(|| PathBuf::from("data"))
    }

    pub fn style_profile(&self) -> PathBuf {
        self.root().join("style_profile.json")
    }

    pub fn historical_conversations(&self) -> PathBuf {
        self.root().join("historical_conversations.json")
    }

    pub fn conversation_logs(&self) -> PathBuf {
        self.root().join("conversation_logs")
    }
}

/// Complete bot configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    pub gemini: GeminiConfig,
    pub telegram: TelegramConfig,
    pub paths: DataPaths,
    /// Per-user history entries kept as context
    pub history_limit: usize,
    /// Bound on learned vocabulary
    pub frequent_phrase_limit: usize,
    /// Upper bound on one backend call
    pub generation_timeout_seconds: u64,
    pub learning: LearningConfig,
    pub prompt: PromptConfig,
    /// Write one audit record per exchange
    pub audit_log: bool,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            gemini: GeminiConfig::default(),
            telegram: TelegramConfig::default(),
            paths: DataPaths::default(),
            history_limit: crate::conversation::DEFAULT_HISTORY_LIMIT,
            frequent_phrase_limit: crate::style::MAX_FREQUENT_PHRASES,
            generation_timeout_seconds: 60,
            learning: LearningConfig::default(),
            prompt: PromptConfig::default(),
            audit_log: true,
        }
    }
}

impl BotConfig {
    /// Default config file location
    pub fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("com", "tonebot", "tonebot")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Applies environment overrides on top of the current values.
    pub fn apply_env(&mut self) -> Result<()> {
        if let Ok(key) = env::var("GEMINI_API_KEY") {
            self.gemini.api_key = key;
        }
        if let Ok(model) = env::var("GEMINI_MODEL") {
            self.gemini.model = model.parse()?;
        }
        if let Ok(timeout) = env::var("GEMINI_TIMEOUT_SECONDS") {
            self.gemini.timeout_seconds = parse_env("GEMINI_TIMEOUT_SECONDS", &timeout)?;
        }
        if let Ok(retries) = env::var("GEMINI_MAX_RETRIES") {
            self.gemini.max_retries = parse_env("GEMINI_MAX_RETRIES", &retries)?;
        }
        if let Ok(token) = env::var("TELEGRAM_BOT_TOKEN") {
            self.telegram.bot_token = token;
        }
        if let Ok(admin) = env::var("TELEGRAM_ADMIN_CHAT_ID") {
            if !admin.trim().is_empty() {
                self.telegram.admin_chat_id = Some(parse_env("TELEGRAM_ADMIN_CHAT_ID", &admin)?);
            }
        }
        if let Ok(users) = env::var("ALLOWED_USER_IDS") {
            self.telegram.allowed_user_ids = parse_user_ids(&users)?;
        }
        if let Ok(dir) = env::var("TONEBOT_DATA_DIR") {
            self.paths.data_dir = Some(PathBuf::from(dir));
        }
        Ok(())
    }

    /// Checks everything needed to run the bot.
    pub fn validate(&self) -> Result<()> {
        self.gemini.validate()?;

        if self.telegram.bot_token.trim().is_empty() {
            return Err(BotError::config("TELEGRAM_BOT_TOKEN is not set"));
        }
        if self.history_limit == 0 {
            return Err(BotError::config("history_limit must be at least 1"));
        }
        if self.frequent_phrase_limit == 0 {
            return Err(BotError::config("frequent_phrase_limit must be at least 1"));
        }
        if self.generation_timeout_seconds == 0 {
            return Err(BotError::config("generation_timeout_seconds must be at least 1"));
        }

        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| BotError::config(format!("Invalid {name}: {value:?}")))
}

/// Parses a comma-separated list of Telegram user ids. Blank entries are skipped.
pub fn parse_user_ids(value: &str) -> Result<Vec<i64>> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| parse_env("ALLOWED_USER_IDS", s))
        .collect()
}

/// Loads configuration: file (if any), then environment.
///
/// An explicit `path` must exist; the default location is optional.
pub fn load_config(path: Option<&Path>) -> Result<BotConfig> {
    let mut config = match path {
        Some(path) => read_config_file(path)?,
        None => match BotConfig::config_path() {
            Some(default_path) if default_path.exists() => read_config_file(&default_path)?,
            _ => BotConfig::default(),
        },
    };

    config.apply_env()?;
    Ok(config)
}

fn read_config_file(path: &Path) -> Result<BotConfig> {
    let content = fs::read_to_string(path)
        .map_err(|e| BotError::config(format!("Failed to read config {}: {e}", path.display())))?;

    // TOML unless the extension says JSON
    if path.extension().is_some_and(|e| e == "json") {
        serde_json::from_str(&content)
            .map_err(|e| BotError::config(format!("Invalid JSON config: {e}")))
    } else {
        toml::from_str(&content).map_err(|e| BotError::config(format!("Invalid TOML config: {e}")))
    }
}
