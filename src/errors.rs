use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur in the bot
#[derive(Error, Debug)]
pub enum BotError {
    /// Missing or invalid configuration (empty credentials, bad limits)
    #[error("Configuration error: {0}")]
    ConfigurationError(Arc<String>),

    /// The persisted style profile exists but could not be understood
    #[error("Style profile at {path} is corrupt: {message}")]
    ProfileCorrupt { path: PathBuf, message: Arc<String> },

    /// The generative backend failed to produce text
    #[error("Generation failed: {0}")]
    GenerationError(Arc<String>),

    /// The generative backend did not answer in time
    #[error("Generation timed out after {timeout_seconds}s")]
    Timeout { timeout_seconds: u64 },

    /// Writing profile, audit log or other state to disk failed
    #[error("Failed to persist {path}: {message}")]
    PersistenceError { path: PathBuf, message: Arc<String> },

    /// The emoji pool of the style profile is empty
    #[error("Style unavailable: the emoji pool is empty")]
    StyleUnavailable,

    /// The style service task is gone
    #[error("Style service unavailable: {0}")]
    StyleServiceClosed(Arc<String>),

    /// Messaging platform failure
    #[error("Transport error: {0}")]
    TransportError(Arc<String>),

    /// Network error for HTTP requests
    #[error("Network error: {0}")]
    NetworkError(Arc<String>),

    /// Error when serializing data
    #[error("Serialization error: {0}")]
    SerializationError(Arc<String>),

    /// Input document or backend response could not be understood
    #[error("Parse error: {0}")]
    ParseError(Arc<String>),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Type alias for Result with BotError
pub type Result<T> = std::result::Result<T, BotError>;

impl BotError {
    /// Shorthand for a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigurationError(Arc::new(message.into()))
    }

    /// Shorthand for a generation error.
    pub fn generation(message: impl Into<String>) -> Self {
        Self::GenerationError(Arc::new(message.into()))
    }

    /// Shorthand for a transport error.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::TransportError(Arc::new(message.into()))
    }

    /// Shorthand for a persistence error.
    pub fn persistence(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::PersistenceError {
            path: path.into(),
            message: Arc::new(message.into()),
        }
    }

    /// Whether the condition is handled by a fallback instead of aborting.
    ///
    /// Only configuration problems are fatal, and only at startup.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::ConfigurationError(_))
    }
}

impl From<serde_json::Error> for BotError {
    fn from(error: serde_json::Error) -> Self {
        BotError::SerializationError(Arc::new(error.to_string()))
    }
}

impl From<reqwest::Error> for BotError {
    fn from(error: reqwest::Error) -> Self {
        BotError::NetworkError(Arc::new(error.to_string()))
    }
}

/// Enable cloning for BotError
impl Clone for BotError {
    fn clone(&self) -> Self {
        match self {
            Self::ConfigurationError(msg) => Self::ConfigurationError(Arc::clone(msg)),
            Self::ProfileCorrupt { path, message } => Self::ProfileCorrupt {
                path: path.clone(),
                message: Arc::clone(message),
            },
            Self::GenerationError(msg) => Self::GenerationError(Arc::clone(msg)),
            Self::Timeout { timeout_seconds } => Self::Timeout {
                timeout_seconds: *timeout_seconds,
            },
            Self::PersistenceError { path, message } => Self::PersistenceError {
                path: path.clone(),
                message: Arc::clone(message),
            },
            Self::StyleUnavailable => Self::StyleUnavailable,
            Self::StyleServiceClosed(msg) => Self::StyleServiceClosed(Arc::clone(msg)),
            Self::TransportError(msg) => Self::TransportError(Arc::clone(msg)),
            Self::NetworkError(msg) => Self::NetworkError(Arc::clone(msg)),
            Self::SerializationError(msg) => Self::SerializationError(Arc::clone(msg)),
            Self::ParseError(msg) => Self::ParseError(Arc::clone(msg)),
            Self::IoError(err) => Self::IoError(std::io::Error::new(err.kind(), err.to_string())),
        }
    }
}
