//! AI generation client
//!
//! One operation: turn a structured prompt context into raw text that
//! should contain a single JSON object. Validation happens downstream in
//! the normalization step; this client only moves bytes.

use crate::generation::prompt::PromptContext;
use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use serde_json::{json, Value};
use std::num::NonZeroU32;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

const USER_AGENT: &str = concat!("skyweek-content/", env!("CARGO_PKG_VERSION"));

const SYSTEM_PROMPT: &str = "You write short weekly astrology content. \
Reply with exactly one JSON object matching the requested schema and nothing else.";

/// Generation client errors
#[derive(Debug, Clone, Error)]
pub enum GenerationError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Generation API error {0}: {1}")]
    Api(u16, String),

    #[error("Rate limit exceeded")]
    RateLimited,

    #[error("Generation service returned no content")]
    EmptyResponse,

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Generation service not configured")]
    NotConfigured,
}

#[async_trait]
pub trait GenerationClient: Send + Sync {
    /// Raw model output for the given context
    async fn generate(&self, prompt: &PromptContext) -> Result<String, GenerationError>;
}

/// OpenAI-compatible chat-completions client
pub struct HttpGenerationClient {
    http_client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    rate_limiter: DefaultDirectRateLimiter,
}

impl HttpGenerationClient {
    pub fn new(
        base_url: &str,
        api_key: &str,
        model: &str,
        requests_per_minute: u32,
        timeout: Duration,
    ) -> Result<Self, GenerationError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| GenerationError::Network(e.to_string()))?;

        let quota = Quota::per_minute(NonZeroU32::new(requests_per_minute).unwrap_or(NonZeroU32::MIN));

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            rate_limiter: RateLimiter::direct(quota),
        })
    }

    fn request_body(&self, prompt: &PromptContext) -> Result<Value, GenerationError> {
        let context =
            serde_json::to_string(prompt).map_err(|e| GenerationError::Parse(e.to_string()))?;

        Ok(json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                {
                    "role": "user",
                    "content": format!("{}\n\nContext:\n{}", prompt.schema.instructions(), context),
                },
            ],
            "response_format": { "type": "json_object" },
        }))
    }
}

/// First choice's message content from a chat-completions response
pub fn completion_text(data: &Value) -> Result<String, GenerationError> {
    let choice = data["choices"]
        .get(0)
        .ok_or_else(|| GenerationError::Parse("no choices in response".to_string()))?;

    match choice["message"]["content"].as_str() {
        Some(text) if !text.trim().is_empty() => Ok(text.to_string()),
        _ => Err(GenerationError::EmptyResponse),
    }
}

#[async_trait]
impl GenerationClient for HttpGenerationClient {
    async fn generate(&self, prompt: &PromptContext) -> Result<String, GenerationError> {
        self.rate_limiter.until_ready().await;

        let url = format!("{}/chat/completions", self.base_url);
        debug!(url = %url, schema = ?prompt.schema, "Requesting generation");

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&self.request_body(prompt)?)
            .send()
            .await
            .map_err(|e| GenerationError::Network(e.to_string()))?;

        let status = response.status();
        if status.as_u16() == 429 {
            warn!("Generation service rate limit hit");
            return Err(GenerationError::RateLimited);
        }
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(GenerationError::Api(status.as_u16(), error_text));
        }

        let data: Value = response
            .json()
            .await
            .map_err(|e| GenerationError::Parse(e.to_string()))?;

        completion_text(&data)
    }
}

/// Stand-in used when no generation endpoint is configured; every call fails
#[derive(Debug, Default)]
pub struct DisabledGenerationClient;

#[async_trait]
impl GenerationClient for DisabledGenerationClient {
    async fn generate(&self, _prompt: &PromptContext) -> Result<String, GenerationError> {
        Err(GenerationError::NotConfigured)
    }
}
