//! Google Gemini integration module
//!
//! REST client for the `generateContent` endpoint, used as the default
//! [`Generator`](crate::providers::Generator) of the bot.

pub mod client;
pub mod config;
pub mod models;

pub use client::GeminiClient;
pub use config::{GeminiConfig, GeminiModel};
pub use models::*;
