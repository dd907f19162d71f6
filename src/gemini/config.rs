//! Google Gemini configuration

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::{BotError, Result};

/// Available Gemini models
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GeminiModel {
    /// Gemini 2.5 Pro - Most capable model
    #[serde(rename = "gemini-2.5-pro")]
    Gemini25Pro,
    /// Gemini 2.5 Flash - Faster and more cost-effective
    #[serde(rename = "gemini-2.5-flash")]
    Gemini25Flash,
}

impl GeminiModel {
    /// Get the model name for API requests
    pub fn model_name(&self) -> &'static str {
        match self {
            GeminiModel::Gemini25Pro => "gemini-2.5-pro",
            GeminiModel::Gemini25Flash => "gemini-2.5-flash",
        }
    }

    /// Get the full endpoint path for the model
    pub fn endpoint(&self) -> String {
        format!("models/{}:generateContent", self.model_name())
    }
}

impl std::fmt::Display for GeminiModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.model_name())
    }
}

impl FromStr for GeminiModel {
    type Err = BotError;

    fn from_str(model_str: &str) -> Result<Self> {
        match model_str.trim() {
            "gemini-2.5-pro" => Ok(GeminiModel::Gemini25Pro),
            "gemini-2.5-flash" => Ok(GeminiModel::Gemini25Flash),
            other => Err(BotError::config(format!(
                "Unknown Gemini model: {other}. Supported models: gemini-2.5-pro, gemini-2.5-flash"
            ))),
        }
    }
}

/// Google Gemini configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeminiConfig {
    /// API key for Google AI
    pub api_key: String,
    /// Model to use
    pub model: GeminiModel,
    /// Request timeout in seconds
    pub timeout_seconds: u64,
    /// Maximum number of attempts per request
    pub max_retries: u32,
    /// Rate limit in requests per minute
    pub rate_limit_rpm: u32,
    /// Sampling temperature
    pub temperature: f32,
    /// Cap on generated tokens
    pub max_output_tokens: u32,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: GeminiModel::Gemini25Flash,
            timeout_seconds: 30,
            max_retries: 3,
            rate_limit_rpm: 60,
            temperature: 0.7,
            max_output_tokens: 1000,
        }
    }
}

impl GeminiConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(BotError::config("GEMINI_API_KEY is not set"));
        }

        if !self.api_key.starts_with("AIza") {
            return Err(BotError::config(
                "Invalid Gemini API key format (should start with 'AIza')",
            ));
        }

        if self.timeout_seconds == 0 || self.timeout_seconds > 300 {
            return Err(BotError::config("Timeout must be between 1 and 300 seconds"));
        }

        if self.max_retries == 0 || self.max_retries > 10 {
            return Err(BotError::config("Max retries must be between 1 and 10"));
        }

        if self.rate_limit_rpm == 0 || self.rate_limit_rpm > 1000 {
            return Err(BotError::config("Rate limit must be between 1 and 1000 RPM"));
        }

        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(BotError::config("Temperature must be between 0.0 and 2.0"));
        }

        Ok(())
    }

    /// Get the base URL for Gemini API
    pub fn base_url(&self) -> &'static str {
        "https://generativelanguage.googleapis.com/v1beta"
    }

    /// Get the full URL for an endpoint
    pub fn endpoint_url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url(), endpoint)
    }
}
