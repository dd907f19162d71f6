//! Training - bulk ingestion of prior conversations.
//!
//! - [`corpus`]: lenient readers for the historical corpus and chat exports
//! - [`preprocess`]: converts raw chat exports into per-user training data

pub mod corpus;
pub mod preprocess;

pub use corpus::{
    extract_export_messages, load_historical_conversations, training_messages, ExtractedMessages,
};
pub use preprocess::{ChatPreprocessor, ConversationData, Sender, TrainingData, TrainingMessage};
