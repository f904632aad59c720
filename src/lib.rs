// Copyright (c) 2024-2026, Daily
// SPDX-License-Identifier: BSD-2-Clause

//! Sága - conversational-turn orchestration for an AI storytelling service.
//!
//! Given a user utterance and conversation history, the server-side pipeline
//! retrieves advisory context, assembles a prompt, obtains a model completion,
//! segments the completion into per-character spoken lines, synthesizes audio
//! for each line in order, and returns text plus an ordered clip list. The
//! companion [`playback`] module consumes that clip list and guarantees
//! strictly sequential playback regardless of per-clip network timing.
//!
//! External collaborators (completion engine, speech synthesis engine, vector
//! store, rate-limit store) sit behind traits so they can be substituted with
//! scripted doubles in tests.

pub mod config;
pub mod error;
pub mod limiter;
pub mod playback;
pub mod prelude;
pub mod prompt;
pub mod retrieval;
pub mod server;
pub mod services;
pub mod turn;
pub mod voices;
