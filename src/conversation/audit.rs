//! Audit Log - one JSON document per finished exchange.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::errors::{BotError, Result};

/// A single exchange
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeRecord {
    pub timestamp: DateTime<Utc>,
    pub user_id: String,
    pub username: Option<String>,
    pub user_message: String,
    pub bot_response: String,
}

impl ExchangeRecord {
    pub fn new(user_id: &str, username: Option<&str>, user_message: &str, bot_response: &str) -> Self {
        Self {
            timestamp: Utc::now(),
            user_id: user_id.to_string(),
            username: username.map(str::to_string),
            user_message: user_message.to_string(),
            bot_response: bot_response.to_string(),
        }
    }
}

/// Write-only directory of exchange records.
#[derive(Debug, Clone)]
pub struct AuditLog {
    dir: PathBuf,
}

impl AuditLog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Writes `record` to its own file and returns the path.
    ///
    /// Existing files are never touched.
    pub async fn record(&self, record: &ExchangeRecord) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| BotError::persistence(&self.dir, e.to_string()))?;

        let path = self.dir.join(file_name(record));
        let json = serde_json::to_string_pretty(record)?;

        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .map_err(|e| BotError::persistence(&path, e.to_string()))?;
        file.write_all(json.as_bytes())
            .await
            .map_err(|e| BotError::persistence(&path, e.to_string()))?;
        file.flush()
            .await
            .map_err(|e| BotError::persistence(&path, e.to_string()))?;

        debug!("Audit record written to {:?}", path);
        Ok(path)
    }
}

fn file_name(record: &ExchangeRecord) -> String {
    let user: String = record
        .user_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    format!(
        "{}_{}_conversation.json",
        record.timestamp.format("%Y%m%dT%H%M%S%.6fZ"),
        user
    )
}
