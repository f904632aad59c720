// Copyright (c) 2024-2026, Daily
// SPDX-License-Identifier: BSD-2-Clause

//! Sága speech-synthesis client.
//!
//! Posts `{character, text}` to the synthesis endpoint and receives
//! `{audio_url, voice_used}`. The service itself owns voice assignment; this
//! client only carries the wire format. One request per segment, issued
//! sequentially by the orchestrator.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::error::SynthesisError;
use crate::services::{SpeechSynthesisService, SynthesizedClip};

/// JSON body sent to the synthesis endpoint.
#[derive(Debug, Serialize)]
struct SynthesisRequest<'a> {
    character: &'a str,
    text: &'a str,
}

/// JSON response from the synthesis endpoint.
#[derive(Debug, Deserialize)]
struct SynthesisResponse {
    audio_url: String,
    #[serde(default)]
    voice_used: Option<String>,
}

/// HTTP client for the Sága TTS service.
pub struct SagaTTSService {
    endpoint: String,
    client: reqwest::Client,
}

impl SagaTTSService {
    /// Create a client for the given synthesis endpoint.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .connect_timeout(std::time::Duration::from_secs(10))
                .build()
                .expect("failed to build HTTP client"),
        }
    }
}

#[async_trait]
impl SpeechSynthesisService for SagaTTSService {
    async fn synthesize(
        &self,
        character: &str,
        line: &str,
    ) -> Result<SynthesizedClip, SynthesisError> {
        debug!(character, chars = line.len(), "Requesting synthesis");

        let response = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .json(&SynthesisRequest {
                character,
                text: line,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            error!(character, status, body = %body, "Synthesis service returned an error");
            return Err(SynthesisError::Status { status, body });
        }

        let parsed: SynthesisResponse = response
            .json()
            .await
            .map_err(|e| SynthesisError::Malformed(e.to_string()))?;

        Ok(SynthesizedClip {
            url: parsed.audio_url,
            voice_used: parsed.voice_used,
        })
    }
}
