//! Generator capability
//!
//! The pipeline only needs "prompt in, text out". Backends implement
//! [`Generator`]; [`GeminiClient`](crate::gemini::GeminiClient) is the
//! production one and tests plug in their own.

use async_trait::async_trait;

use crate::errors::Result;

/// Text generation backend
#[async_trait]
pub trait Generator: Send + Sync {
    /// Backend name, for logs
    fn name(&self) -> &str;

    /// Generates a reply for `prompt`. Any error takes the apology path.
    async fn generate(&self, prompt: &str) -> Result<String>;
}
