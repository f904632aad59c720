// Copyright (c) 2024-2026, Daily
// SPDX-License-Identifier: BSD-2-Clause

//! Server configuration, loaded from the environment at process start.
//!
//! Required values missing at boot are a startup failure; nothing is
//! lazily validated at request time.

use std::time::Duration;

use crate::error::ConfigError;
use crate::limiter::{DEFAULT_CAPACITY, DEFAULT_WINDOW};

/// Validated settings for the server binary.
#[derive(Debug, Clone)]
pub struct Settings {
    /// API key for the completion and embeddings provider.
    pub openai_api_key: String,
    /// Completion model identifier.
    pub openai_model: String,
    /// Speech synthesis endpoint.
    pub tts_url: String,
    /// Base URL of the knowledge/document store.
    pub store_url: String,
    /// API key for the store.
    pub store_key: String,
    /// Admits per window per identity.
    pub rate_limit_capacity: u32,
    /// Rate-limit window length.
    pub rate_limit_window: Duration,
    /// TCP port for the HTTP server.
    pub port: u16,
}

impl Settings {
    /// Default completion model when `OPENAI_MODEL` is unset.
    pub const DEFAULT_MODEL: &'static str = "gpt-4o-mini";
    /// Default server port.
    pub const DEFAULT_PORT: u16 = 8765;

    /// Load and validate settings from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            openai_api_key: require("OPENAI_API_KEY")?,
            openai_model: optional("OPENAI_MODEL")
                .unwrap_or_else(|| Self::DEFAULT_MODEL.to_string()),
            tts_url: require("SAGA_TTS_URL")?,
            store_url: require("SAGA_STORE_URL")?,
            store_key: require("SAGA_STORE_KEY")?,
            rate_limit_capacity: parse_or("SAGA_RATE_LIMIT", DEFAULT_CAPACITY)?,
            rate_limit_window: Duration::from_secs(parse_or(
                "SAGA_RATE_WINDOW_SECS",
                DEFAULT_WINDOW.as_secs(),
            )?),
            port: parse_or("PORT", Self::DEFAULT_PORT)?,
        })
    }
}

fn optional(name: &'static str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn require(name: &'static str) -> Result<String, ConfigError> {
    optional(name).ok_or(ConfigError::MissingVar(name))
}

fn parse_or<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match optional(name) {
        None => Ok(default),
        Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
            name,
            reason: e.to_string(),
        }),
    }
}
