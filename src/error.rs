// Copyright (c) 2024-2026, Daily
// SPDX-License-Identifier: BSD-2-Clause

//! Error taxonomy for the turn pipeline.
//!
//! Errors split into two families:
//!
//! - **Turn-terminal** ([`TurnError`]): bad input, rate-limit rejection, or a
//!   completion failure. These invalidate the whole conversational turn and
//!   propagate to the caller as a structured error response.
//! - **Degradable** ([`RetrievalError`], [`SynthesisError`],
//!   [`PlaybackError`]): confined to one optional enhancement (one context
//!   source, one line's audio, one clip's playback). These are absorbed where
//!   they occur and degrade the output instead of failing the turn.

use thiserror::Error;

/// Failure of the external completion service. Terminal for the turn: no
/// partial text is salvageable without a completion.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// The HTTP request never produced a response.
    #[error("completion request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The provider answered with a non-success status.
    #[error("completion service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The provider answered 2xx but the body was not a completion.
    #[error("completion response was malformed: {0}")]
    Malformed(String),
}

/// Failure of one segment's speech synthesis call. Recoverable: the segment
/// is degraded to an empty-url clip and the loop continues.
#[derive(Debug, Error)]
pub enum SynthesisError {
    #[error("synthesis request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("synthesis service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("synthesis response was malformed: {0}")]
    Malformed(String),
}

/// Failure of one context-retrieval collaborator. Recoverable: treated as
/// empty context, the turn continues.
#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("retrieval request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("knowledge store error: {0}")]
    Store(String),
}

/// Failure to start playback of one clip. Recoverable: the queue advances to
/// the next clip.
#[derive(Debug, Error)]
#[error("playback failed: {0}")]
pub struct PlaybackError(pub String);

/// Terminal outcome of a turn. Everything else degrades instead.
#[derive(Debug, Error)]
pub enum TurnError {
    /// Bad or missing input fields. User-correctable.
    #[error("invalid request: {0}")]
    Validation(String),

    /// The rate limiter denied this identity. No retry is performed by this
    /// core; the caller sees a 429.
    #[error("rate limit exceeded")]
    RateLimited,

    /// The completion service failed.
    #[error(transparent)]
    Completion(#[from] UpstreamError),
}

/// Missing or invalid startup configuration. Halts the process at boot.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    MissingVar(&'static str),

    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_status_display_includes_status_and_body() {
        let err = UpstreamError::Status {
            status: 503,
            body: "overloaded".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("503"));
        assert!(msg.contains("overloaded"));
    }

    #[test]
    fn turn_error_wraps_upstream_transparently() {
        let err = TurnError::from(UpstreamError::Malformed("no choices".into()));
        assert!(err.to_string().contains("no choices"));
    }

    #[test]
    fn validation_display() {
        let err = TurnError::Validation("userMessage must not be empty".into());
        assert_eq!(
            err.to_string(),
            "invalid request: userMessage must not be empty"
        );
    }
}
