//! Corpus readers
//!
//! Both readers are lenient: a missing file is an empty corpus, and a broken
//! record is logged and skipped instead of failing the batch.

use std::fs;
use std::path::Path;

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;
use tracing::{info, warn};

use super::preprocess::TrainingData;

lazy_static! {
    /// Boundary between two concatenated JSON objects
    static ref RECORD_BOUNDARY: Regex = Regex::new(r"\}\s*\{").expect("static pattern");
}

/// Reads the historical corpus: a JSON array of conversations, each an
/// array of message strings.
///
/// Missing or malformed files give an empty corpus. Blank messages and
/// conversations left empty are dropped.
pub fn load_historical_conversations(path: &Path) -> Vec<Vec<String>> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(_) => {
            info!("No historical conversations at {:?}", path);
            return Vec::new();
        }
    };

    let conversations: Vec<Vec<String>> = match serde_json::from_str(&content) {
        Ok(conversations) => conversations,
        Err(e) => {
            warn!("Ignoring malformed historical conversations {:?}: {}", path, e);
            return Vec::new();
        }
    };

    conversations
        .into_iter()
        .map(|conversation| {
            conversation
                .into_iter()
                .filter(|msg| !msg.trim().is_empty())
                .collect::<Vec<_>>()
        })
        .filter(|conversation| !conversation.is_empty())
        .collect()
}

/// Messages pulled out of a chat export
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedMessages {
    pub messages: Vec<String>,
    /// Records that failed to parse
    pub skipped_records: usize,
}

/// Extracts message texts from a chat export made of one or more
/// concatenated JSON objects, each with a `messages` array.
///
/// A message `text` may be a string or an array mixing strings and
/// `{ "text": ... }` entities; array parts are joined with spaces.
pub fn extract_export_messages(content: &str) -> ExtractedMessages {
    let mut extracted = ExtractedMessages::default();

    for record in split_records(content) {
        let data: Value = match serde_json::from_str(&record) {
            Ok(data) => data,
            Err(e) => {
                warn!("Skipping unparsable export record: {}", e);
                extracted.skipped_records += 1;
                continue;
            }
        };

        let Some(messages) = data.get("messages").and_then(Value::as_array) else {
            continue;
        };

        extracted.messages.extend(
            messages
                .iter()
                .filter_map(|msg| msg.get("text"))
                .filter_map(message_text)
                .filter(|text| !text.trim().is_empty()),
        );
    }

    extracted
}

/// Messages for batch training from either a preprocessed document
/// (`{ "conversations": [...] }`) or a raw chat export.
pub fn training_messages(content: &str) -> ExtractedMessages {
    match serde_json::from_str::<TrainingData>(content) {
        Ok(data) => ExtractedMessages {
            messages: data
                .texts()
                .into_iter()
                .filter(|text| !text.trim().is_empty())
                .collect(),
            skipped_records: 0,
        },
        Err(_) => extract_export_messages(content),
    }
}

/// Splits on `}{` boundaries, restoring the braces removed by the split.
fn split_records(content: &str) -> Vec<String> {
    let pieces: Vec<&str> = RECORD_BOUNDARY.split(content).collect();
    let last = pieces.len().saturating_sub(1);

    pieces
        .iter()
        .enumerate()
        .map(|(i, piece)| {
            let mut record = String::with_capacity(piece.len() + 2);
            if i > 0 {
                record.push('{');
            }
            record.push_str(piece);
            if i < last {
                record.push('}');
            }
            record
        })
        .collect()
}

fn message_text(text: &Value) -> Option<String> {
    match text {
        Value::String(s) => Some(s.clone()),
        Value::Array(parts) => Some(
            parts
                .iter()
                .map(|part| match part {
                    Value::String(s) => s.as_str(),
                    other => other.get("text").and_then(Value::as_str).unwrap_or(""),
                })
                .collect::<Vec<_>>()
                .join(" "),
        ),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_corpus_is_empty() {
        let temp = TempDir::new().unwrap();
        assert!(load_historical_conversations(&temp.path().join("none.json")).is_empty());
    }

    #[test]
    fn test_malformed_corpus_is_empty() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("historical_conversations.json");
        fs::write(&path, r#"{"not": "an array"}"#).unwrap();

        assert!(load_historical_conversations(&path).is_empty());
    }

    #[test]
    fn test_corpus_drops_blank_messages() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("historical_conversations.json");
        fs::write(&path, r#"[["hey there", "  ", "big win"], ["", " "], ["solo"]]"#).unwrap();

        let conversations = load_historical_conversations(&path);

        assert_eq!(
            conversations,
            vec![vec!["hey there".to_string(), "big win".to_string()], vec!["solo".to_string()]]
        );
    }

    #[test]
    fn test_extract_concatenated_records() {
        let content = r#"{"messages":[{"text":"first drop"},{"text":""}]}
{"messages":[{"text":["mega ", {"type":"bold","text":"jackpot"}, "!"]},{"photo":"x.jpg"}]}"#;

        let extracted = extract_export_messages(content);

        assert_eq!(extracted.skipped_records, 0);
        assert_eq!(extracted.messages, vec!["first drop", "mega  jackpot !"]);
    }

    #[test]
    fn test_extract_skips_broken_record() {
        let content = r#"{"messages":[{"text":"kept"}]}{"messages":[{"text": oops}]}{"messages":[{"text":"also kept"}]}"#;

        let extracted = extract_export_messages(content);

        assert_eq!(extracted.skipped_records, 1);
        assert_eq!(extracted.messages, vec!["kept", "also kept"]);
    }

    #[test]
    fn test_training_messages_from_preprocessed_document() {
        let content = r#"{"conversations":[
            {"userId":"ana","messages":[{"text":"gm all","sender":"user","timestamp":0},{"text":" ","sender":"user","timestamp":null}]},
            {"userId":"tonebot","messages":[{"text":"huge drop today","sender":"bot","timestamp":1}]}
        ]}"#;

        let extracted = training_messages(content);

        assert_eq!(extracted.messages, vec!["gm all", "huge drop today"]);
        assert_eq!(extracted.skipped_records, 0);
    }

    #[test]
    fn test_training_messages_falls_back_to_export() {
        let extracted = training_messages(r#"{"messages":[{"text":"from export"}]}"#);
        assert_eq!(extracted.messages, vec!["from export"]);
    }

    #[test]
    fn test_extract_single_record() {
        let extracted = extract_export_messages(r#"{"name":"chat","messages":[{"text":"only"}]}"#);
        assert_eq!(extracted.messages, vec!["only"]);
    }
}
