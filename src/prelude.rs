// Copyright (c) 2024-2026, Daily
// SPDX-License-Identifier: BSD-2-Clause

//! Convenience re-exports for embedding the turn pipeline.
//!
//! ```no_run
//! use saga::prelude::*;
//! ```

pub use crate::config::Settings;
pub use crate::error::{
    ConfigError, PlaybackError, RetrievalError, SynthesisError, TurnError, UpstreamError,
};
pub use crate::limiter::{resolve_identity, RateDecision, RateLimiter, SlidingWindowLimiter};
pub use crate::playback::{AudioPlaybackQueue, AudioSink, PlayerState};
pub use crate::prompt::{ChatMessage, HistoryMessage, HistoryRole, Role, SAGA_SYSTEM_PROMPT};
pub use crate::retrieval::{
    ContextBlock, ContextRetriever, DocumentBlock, DocumentStore, StoredDocument,
    VectorStoreRetriever,
};
pub use crate::server::{router, AppState};
pub use crate::services::openai::OpenAIChatService;
pub use crate::services::saga_tts::SagaTTSService;
pub use crate::services::{CompletionService, SpeechSynthesisService, SynthesizedClip};
pub use crate::turn::{TurnOrchestrator, TurnRequest, TurnResponse};
pub use crate::voices::{extract_voice_segments, VoiceClip, VoiceSegment, NARRATOR};
