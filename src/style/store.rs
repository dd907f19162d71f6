//! Style Profile Store - profile persistence.
//!
//! Saves and loads the style profile as a single JSON document.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::errors::{BotError, Result};

use super::{StyleProfile, MAX_FREQUENT_PHRASES};

/// Store for style profile persistence.
#[derive(Debug, Clone)]
pub struct StyleProfileStore {
    /// Profile document path
    path: PathBuf,
    /// Bound applied to `frequent_phrases` on load
    max_frequent_phrases: usize,
}

impl StyleProfileStore {
    /// Creates a store for the document at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            max_frequent_phrases: MAX_FREQUENT_PHRASES,
        }
    }

    /// Overrides the `frequent_phrases` bound enforced on load.
    pub fn with_max_frequent_phrases(mut self, max: usize) -> Self {
        self.max_frequent_phrases = max;
        self
    }

    /// Returns the document path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the profile, falling back to the default one.
    ///
    /// Never fails: a missing, unreadable or malformed document yields
    /// [`StyleProfile::default`].
    pub fn load(&self) -> StyleProfile {
        match self.try_load() {
            Ok(Some(profile)) => {
                info!("Loaded style profile from {:?}", self.path);
                profile
            }
            Ok(None) => {
                info!("No style profile at {:?}, using defaults", self.path);
                StyleProfile::default()
            }
            Err(e) => {
                warn!("{}; using default style profile", e);
                StyleProfile::default()
            }
        }
    }

    /// Loads the profile, reporting corruption.
    ///
    /// Returns `Ok(None)` when no document exists.
    pub fn try_load(&self) -> Result<Option<StyleProfile>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&self.path).map_err(|e| BotError::ProfileCorrupt {
            path: self.path.clone(),
            message: Arc::new(format!("unreadable: {e}")),
        })?;

        let mut profile: StyleProfile =
            serde_json::from_str(&content).map_err(|e| BotError::ProfileCorrupt {
                path: self.path.clone(),
                message: Arc::new(e.to_string()),
            })?;

        profile.normalize(self.max_frequent_phrases);
        Ok(Some(profile))
    }

    /// Writes the whole profile, replacing any previous document.
    pub fn save(&self, profile: &StyleProfile) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .map_err(|e| BotError::persistence(parent, e.to_string()))?;
            }
        }

        let json = serde_json::to_string_pretty(profile)?;
        fs::write(&self.path, json).map_err(|e| BotError::persistence(&self.path, e.to_string()))?;

        debug!(
            "Saved style profile: {} emojis, {} key phrases, {} frequent phrases",
            profile.emojis().len(),
            profile.key_phrases().len(),
            profile.frequent_phrases.len()
        );

        Ok(())
    }
}
