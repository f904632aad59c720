// Copyright (c) 2024-2026, Daily
// SPDX-License-Identifier: BSD-2-Clause

//! Sága server binary.
//!
//! Loads settings from the environment, wires the production collaborators
//! into the orchestrator, and serves the HTTP endpoints.

use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use saga::config::Settings;
use saga::limiter::SlidingWindowLimiter;
use saga::retrieval::VectorStoreRetriever;
use saga::server::{router, AppState};
use saga::services::openai::OpenAIChatService;
use saga::services::saga_tts::SagaTTSService;
use saga::turn::TurnOrchestrator;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,saga=debug")),
        )
        .init();

    let settings = Settings::from_env()?;

    let limiter = Arc::new(SlidingWindowLimiter::with_policy(
        settings.rate_limit_capacity,
        settings.rate_limit_window,
    ));
    let retriever = Arc::new(VectorStoreRetriever::new(
        &settings.store_url,
        &settings.store_key,
        &settings.openai_api_key,
    ));
    let completion = Arc::new(
        OpenAIChatService::new(&settings.openai_api_key).with_model(&settings.openai_model),
    );
    let synthesis = Arc::new(SagaTTSService::new(&settings.tts_url));

    let orchestrator = Arc::new(TurnOrchestrator::new(
        limiter,
        retriever.clone(),
        completion,
        synthesis,
    ));

    let app = router(AppState {
        orchestrator,
        documents: retriever,
    });

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], settings.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, model = %settings.openai_model, "Sága server listening");

    axum::serve(listener, app).await?;
    Ok(())
}
