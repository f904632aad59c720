// Copyright (c) 2024-2026, Daily
// SPDX-License-Identifier: BSD-2-Clause

//! OpenAI-compatible chat-completion client.
//!
//! [`OpenAIChatService`] talks to the `/v1/chat/completions` endpoint (or any
//! compatible API) with a single non-streaming request per turn. Non-success
//! responses surface as [`UpstreamError::Status`] carrying the provider's
//! status and body; the orchestrator treats any failure here as terminal for
//! the turn.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::error::UpstreamError;
use crate::prompt::ChatMessage;
use crate::services::CompletionService;

// ---------------------------------------------------------------------------
// OpenAI API request / response types (subset needed for one completion)
// ---------------------------------------------------------------------------

/// Body sent to `/v1/chat/completions`.
#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    #[serde(default)]
    message: Option<CompletionMessage>,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    #[serde(default)]
    content: Option<String>,
}

// ---------------------------------------------------------------------------
// OpenAIChatService
// ---------------------------------------------------------------------------

/// Completion client for OpenAI-compatible chat APIs.
pub struct OpenAIChatService {
    api_key: String,
    model: String,
    base_url: String,
    temperature: Option<f64>,
    max_tokens: Option<u64>,
    client: reqwest::Client,
}

impl OpenAIChatService {
    /// Default model.
    pub const DEFAULT_MODEL: &'static str = "gpt-4o-mini";
    /// Default HTTP base URL.
    pub const DEFAULT_BASE_URL: &'static str = "https://api.openai.com";
    /// Default sampling temperature, tuned for storytelling variety.
    pub const DEFAULT_TEMPERATURE: f64 = 0.9;

    /// Create a new service with sensible defaults.
    ///
    /// # Arguments
    ///
    /// * `api_key` - API key for bearer authentication.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: Self::DEFAULT_MODEL.to_string(),
            base_url: Self::DEFAULT_BASE_URL.to_string(),
            temperature: Some(Self::DEFAULT_TEMPERATURE),
            max_tokens: None,
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(90))
                .connect_timeout(std::time::Duration::from_secs(10))
                .build()
                .expect("failed to build HTTP client"),
        }
    }

    /// Builder method: set the model identifier.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Builder method: set a custom base URL (for compatible providers).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Builder method: set the sampling temperature.
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Builder method: cap the response length in tokens.
    pub fn with_max_tokens(mut self, max_tokens: u64) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    fn completions_url(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl CompletionService for OpenAIChatService {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, UpstreamError> {
        let body = ChatCompletionRequest {
            model: &self.model,
            messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        debug!(
            model = %self.model,
            messages = messages.len(),
            "Requesting chat completion"
        );

        let response = self
            .client
            .post(self.completions_url())
            .bearer_auth(&self.api_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            error!(status, body = %body, "Completion API returned an error");
            return Err(UpstreamError::Status { status, body });
        }

        let parsed: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| UpstreamError::Malformed(e.to_string()))?;

        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .ok_or_else(|| UpstreamError::Malformed("response had no message content".into()))?;

        debug!(chars = text.len(), "Completion received");
        Ok(text)
    }

    fn model(&self) -> Option<&str> {
        Some(&self.model)
    }
}
