// Copyright (c) 2024-2026, Daily
// SPDX-License-Identifier: BSD-2-Clause

//! Turn orchestration: one complete user-message-in, assistant-response-out
//! cycle through the pipeline.
//!
//! Stage order: rate check, validation, retrieval, prompt build, completion,
//! segmentation, sequential synthesis, respond. The rate check always runs
//! before any expensive work. Terminal failures are rate-limit rejection and
//! completion failure; retrieval and per-segment synthesis degrade instead.
//!
//! All collaborators are injected as trait objects, so tests substitute
//! scripted doubles for the external services. There is no retry state in
//! this core: every external call is a single attempt.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::TurnError;
use crate::limiter::RateLimiter;
use crate::prompt::{self, HistoryMessage};
use crate::retrieval::ContextRetriever;
use crate::services::{CompletionService, SpeechSynthesisService};
use crate::voices::{extract_voice_segments, VoiceClip};

/// One turn request: prior history plus the new user message.
#[derive(Debug, Clone, Deserialize)]
pub struct TurnRequest {
    #[serde(default)]
    pub history: Vec<HistoryMessage>,
    #[serde(rename = "userMessage")]
    pub user_message: String,
}

/// The turn result: assistant text plus the ordered clip list.
///
/// `text` is the raw completion, unmodified; the UI can always show it even
/// when some or all clips failed to synthesize.
#[derive(Debug, Clone, Serialize)]
pub struct TurnResponse {
    pub text: String,
    pub clips: Vec<VoiceClip>,
}

/// Composes the pipeline stages into one request/response cycle.
pub struct TurnOrchestrator {
    limiter: Arc<dyn RateLimiter>,
    retriever: Arc<dyn ContextRetriever>,
    completion: Arc<dyn CompletionService>,
    synthesis: Arc<dyn SpeechSynthesisService>,
    system_prompt: String,
}

impl TurnOrchestrator {
    /// Create an orchestrator over the injected collaborators, using the
    /// default Sága system prompt.
    pub fn new(
        limiter: Arc<dyn RateLimiter>,
        retriever: Arc<dyn ContextRetriever>,
        completion: Arc<dyn CompletionService>,
        synthesis: Arc<dyn SpeechSynthesisService>,
    ) -> Self {
        Self {
            limiter,
            retriever,
            completion,
            synthesis,
            system_prompt: prompt::SAGA_SYSTEM_PROMPT.to_string(),
        }
    }

    /// Builder method: replace the system prompt.
    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = system_prompt.into();
        self
    }

    /// Run one turn for the given caller identity.
    ///
    /// Returns `Err` only for turn-terminal outcomes (rate limit, bad input,
    /// completion failure). Retrieval failures proceed with empty context;
    /// a failed synthesis call yields an empty-url clip for that segment and
    /// the loop continues.
    pub async fn run_turn(
        &self,
        identity: &str,
        request: &TurnRequest,
    ) -> Result<TurnResponse, TurnError> {
        // --- Rate check: always before any expensive work ---
        let decision = self.limiter.admit(identity).await;
        debug!(
            identity,
            admitted = decision.admitted,
            remaining = decision.remaining,
            "Rate check"
        );
        if !decision.admitted {
            warn!(identity, "Turn rejected by rate limiter");
            return Err(TurnError::RateLimited);
        }

        // --- Validation ---
        let user_message = request.user_message.trim();
        if user_message.is_empty() {
            return Err(TurnError::Validation(
                "userMessage must not be empty".into(),
            ));
        }

        // --- Retrieval: advisory, degrades to empty context ---
        let documents = match self.retriever.retrieve_documents().await {
            Ok(docs) => docs,
            Err(e) => {
                warn!(error = %e, "Document retrieval failed, proceeding without sheets");
                Vec::new()
            }
        };
        let knowledge = match self.retriever.retrieve_knowledge(user_message).await {
            Ok(blocks) => blocks,
            Err(e) => {
                warn!(error = %e, "Knowledge retrieval failed, proceeding without context");
                Vec::new()
            }
        };
        debug!(
            documents = documents.len(),
            knowledge = knowledge.len(),
            "Context retrieved"
        );

        // --- Prompt build ---
        let messages = prompt::assemble(
            &self.system_prompt,
            &documents,
            &knowledge,
            &request.history,
            user_message,
        );

        // --- Completion: terminal on failure ---
        let text = self.completion.complete(&messages).await?;

        // --- Segmentation ---
        let segments = extract_voice_segments(&text);
        debug!(segments = segments.len(), "Voice segments extracted");

        // --- Synthesis: strictly sequential, per-segment isolation ---
        // Failed segments keep their slot with an empty url so clip order
        // always matches extraction order; one bad line never blanks the
        // rest of the scene.
        let mut clips = Vec::with_capacity(segments.len());
        for segment in &segments {
            match self
                .synthesis
                .synthesize(&segment.character, &segment.line)
                .await
            {
                Ok(clip) => {
                    debug!(character = %segment.character, "Segment synthesized");
                    clips.push(VoiceClip {
                        character: segment.character.clone(),
                        url: clip.url,
                        voice_used: clip.voice_used,
                    });
                }
                Err(e) => {
                    warn!(character = %segment.character, error = %e, "Segment synthesis failed");
                    clips.push(VoiceClip {
                        character: segment.character.clone(),
                        url: String::new(),
                        voice_used: None,
                    });
                }
            }
        }

        info!(
            identity,
            segments = segments.len(),
            clips = clips.len(),
            "Turn complete"
        );
        Ok(TurnResponse { text, clips })
    }
}
