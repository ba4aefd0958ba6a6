//! Gemini API client
//!
//! Thin wrapper over the `models/{model}:generateContent` endpoint. It only
//! moves text in and out; prompts and response interpretation belong to the
//! analyzer and the title generator.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use errsight_providers::gemini::GeminiClient;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let client = GeminiClient::new("api-key", "gemini-2.5-flash");
//! let text = client.generate("Say hello").await?;
//! println!("{}", text);
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::{error_message, ProviderError, HTTP_TIMEOUT};

/// Base URL for the Gemini REST API
const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

// ============================================================================
// GeminiClient
// ============================================================================

/// HTTP client for Gemini text generation
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_output_tokens: u32,
    timeout: Duration,
}

impl GeminiClient {
    /// Creates a client for `model` against the public endpoint
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self::with_base_url(api_key, model, GEMINI_BASE_URL)
    }

    /// Creates a client with a custom base URL (useful for testing)
    pub fn with_base_url(
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
            temperature: 0.3,
            max_output_tokens: 8000,
            timeout: HTTP_TIMEOUT,
        }
    }

    pub fn with_generation(mut self, temperature: f32, max_output_tokens: u32) -> Self {
        self.temperature = temperature;
        self.max_output_tokens = max_output_tokens;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Sends `prompt` and returns the concatenated text of the first candidate
    ///
    /// An answer without text yields an empty string; interpreting that is
    /// up to the caller.
    pub async fn generate(&self, prompt: &str) -> Result<String, ProviderError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![RequestPart { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: self.temperature,
                max_output_tokens: self.max_output_tokens,
            },
        };

        tracing::debug!(model = %self.model, prompt_len = prompt.len(), "Calling Gemini");

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ProviderError::Status {
                status: status.as_u16(),
                message: error_message(&text),
            });
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        let text = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        Ok(text)
    }
}
