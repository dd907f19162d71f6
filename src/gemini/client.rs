//! Google Gemini HTTP client implementation

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::errors::{BotError, Result};
use crate::gemini::{GeminiConfig, GenerateContentRequest, GenerateContentResponse};
use crate::providers::Generator;

/// Rate limiting information
#[derive(Debug)]
struct RateLimit {
    requests_count: u32,
    window_start: Instant,
    window_duration: Duration,
}

impl RateLimit {
    fn new() -> Self {
        Self {
            requests_count: 0,
            window_start: Instant::now(),
            window_duration: Duration::from_secs(60),
        }
    }

    fn can_make_request(&mut self, max_rpm: u32) -> bool {
        let now = Instant::now();

        // Reset window if it has passed
        if now.duration_since(self.window_start) >= self.window_duration {
            self.requests_count = 0;
            self.window_start = now;
        }

        self.requests_count < max_rpm
    }

    fn record_request(&mut self) {
        self.requests_count += 1;
    }

    fn time_until_reset(&self) -> Duration {
        self.window_duration.saturating_sub(self.window_start.elapsed())
    }
}

/// Google Gemini HTTP client
pub struct GeminiClient {
    config: GeminiConfig,
    client: reqwest::Client,
    rate_limit: Arc<Mutex<RateLimit>>,
}

impl GeminiClient {
    /// Create a new Gemini client
    pub fn new(config: GeminiConfig) -> Result<Self> {
        config.validate()?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(concat!("tonebot/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| BotError::NetworkError(Arc::new(format!("Failed to create HTTP client: {e}"))))?;

        info!("Gemini client initialized with model: {}", config.model);

        Ok(Self {
            config,
            client,
            rate_limit: Arc::new(Mutex::new(RateLimit::new())),
        })
    }

    /// Make a request to the Gemini API with retries
    pub async fn generate_content(
        &self,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse> {
        let mut last_error = None;

        for attempt in 1..=self.config.max_retries {
            // Waiting for the window does not count as an attempt
            self.acquire_slot().await;

            debug!("Gemini API attempt {} of {}", attempt, self.config.max_retries);

            match self.make_request(request).await {
                Ok(response) => {
                    debug!("Gemini API request successful on attempt {}", attempt);
                    return Ok(response);
                }
                Err(e) => {
                    warn!("Gemini API attempt {} failed: {}", attempt, e);
                    last_error = Some(e);

                    if attempt < self.config.max_retries {
                        let delay = Duration::from_millis(1000 * u64::from(attempt));
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            BotError::NetworkError(Arc::new("All Gemini API attempts failed".to_string()))
        }))
    }

    /// Waits until the current rate window has room, then claims a slot.
    async fn acquire_slot(&self) {
        loop {
            let wait = {
                let mut rate_limit = self.rate_limit.lock().await;
                if rate_limit.can_make_request(self.config.rate_limit_rpm) {
                    rate_limit.record_request();
                    return;
                }
                rate_limit.time_until_reset()
            };

            warn!("Rate limit reached, waiting {:?} for the next window", wait);
            tokio::time::sleep(wait).await;
        }
    }

    /// Make a single request to the Gemini API
    async fn make_request(&self, request: &GenerateContentRequest) -> Result<GenerateContentResponse> {
        let url = self.config.endpoint_url(&self.config.model.endpoint());

        debug!("Making Gemini API request to: {}", url);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.config.api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());

            error!("Gemini API error {}: {}", status, error_text);
            return Err(BotError::NetworkError(Arc::new(format!(
                "Gemini API error {status}: {error_text}"
            ))));
        }

        let gemini_response: GenerateContentResponse = response.json().await.map_err(|e| {
            BotError::ParseError(Arc::new(format!("Failed to parse response: {e}")))
        })?;

        if gemini_response.is_blocked() {
            warn!("Gemini response was blocked by safety filters");
            return Err(BotError::generation("Response blocked by Gemini safety filters"));
        }

        Ok(gemini_response)
    }

    /// Get the current model being used
    pub fn get_model(&self) -> &str {
        self.config.model.model_name()
    }
}

#[async_trait]
impl Generator for GeminiClient {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let request = GenerateContentRequest::new_reply(
            prompt,
            self.config.temperature,
            self.config.max_output_tokens,
        );

        let response = self.generate_content(&request).await?;

        response
            .get_text()
            .ok_or_else(|| BotError::generation("Empty response from Gemini"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limit() {
        let mut rate_limit = RateLimit::new();

        // Should allow first 5 requests
        for _ in 0..5 {
            assert!(rate_limit.can_make_request(5));
            rate_limit.record_request();
        }

        // Should deny 6th request
        assert!(!rate_limit.can_make_request(5));
    }

    #[test]
    fn test_time_until_reset() {
        let mut rate_limit = RateLimit::new();
        assert!(rate_limit.time_until_reset() <= Duration::from_secs(60));

        rate_limit.window_start = Instant::now() - Duration::from_secs(61);
        assert_eq!(rate_limit.time_until_reset(), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_full_window_waits_instead_of_failing() {
        let mut config = GeminiConfig::default();
        config.api_key = "AIzaTestKey".to_string();
        config.rate_limit_rpm = 1;
        let client = GeminiClient::new(config).unwrap();
        {
            let mut rate_limit = client.rate_limit.lock().await;
            rate_limit.window_duration = Duration::from_millis(100);
            rate_limit.record_request();
        }

        let started = Instant::now();
        client.acquire_slot().await;

        assert!(started.elapsed() >= Duration::from_millis(50));
        let rate_limit = client.rate_limit.lock().await;
        assert_eq!(rate_limit.requests_count, 1);
    }

    #[tokio::test]
    async fn test_client_creation() {
        let mut config = GeminiConfig::default();
        config.api_key = "AIzaTestKey".to_string();

        let client = GeminiClient::new(config).unwrap();
        assert_eq!(client.get_model(), "gemini-2.5-flash");
        assert_eq!(client.name(), "gemini");
    }

    #[test]
    fn test_client_rejects_missing_key() {
        assert!(matches!(
            GeminiClient::new(GeminiConfig::default()),
            Err(BotError::ConfigurationError(_))
        ));
    }
}
