//! # tonebot
//!
//! A chat bot that answers through a text-generation backend and shapes its
//! replies with a learned communication style: preferred tone, emoji and key
//! phrases, plus vocabulary picked up from conversations.
//!
//! Messages flow through [`pipeline::ResponsePipeline`]; the style profile is
//! owned by [`style::StyleService`] and persisted as JSON.

pub mod bot;
pub mod config;
pub mod conversation;
pub mod errors;
pub mod gemini;
pub mod pipeline;
pub mod providers;
pub mod style;
pub mod training;
pub mod transport;

pub use bot::Bot;
pub use config::{load_config, BotConfig};
pub use errors::{BotError, Result};
pub use pipeline::{PipelineReply, ReplyOutcome, ResponsePipeline};
pub use style::{StyleProfile, StyleService};
