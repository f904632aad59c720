// Copyright (c) 2024-2026, Daily
// SPDX-License-Identifier: BSD-2-Clause

//! External AI service integrations (completion, speech synthesis).

pub mod openai;
pub mod saga_tts;

use async_trait::async_trait;

use crate::error::{SynthesisError, UpstreamError};
use crate::prompt::ChatMessage;

/// A synthesized audio artifact returned by the synthesis service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesizedClip {
    /// Resource locator for the generated audio.
    pub url: String,
    /// Which voice the service picked for the character, if reported.
    pub voice_used: Option<String>,
}

/// Trait for completion services.
///
/// One call per turn; failures are terminal for the turn and carry the
/// provider's status and body. Retries, if any, belong to the implementation.
#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Send the assembled prompt and return the raw completion text.
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, UpstreamError>;

    /// Model identifier used by this service, for logging.
    fn model(&self) -> Option<&str> {
        None
    }
}

/// Trait for speech synthesis services.
///
/// One call per extracted segment, issued strictly sequentially by the
/// orchestrator so clip order matches extraction order.
#[async_trait]
pub trait SpeechSynthesisService: Send + Sync {
    /// Synthesize one spoken line for the given character.
    async fn synthesize(
        &self,
        character: &str,
        line: &str,
    ) -> Result<SynthesizedClip, SynthesisError>;
}
