// Copyright (c) 2024-2026, Daily
// SPDX-License-Identifier: BSD-2-Clause

//! HTTP surface: the turn endpoint and the document upload endpoint.
//!
//! `POST /api/saga` runs one conversational turn. `POST /api/upload` accepts
//! a single plain-text document, validates extension and size, and stores it
//! with an embedding for later retrieval; binary-format extraction (PDF,
//! DOCX) belongs to an external collaborator and is rejected here.
//!
//! Error mapping follows the turn taxonomy: 400 for bad input, 429 for a
//! rate-limit rejection, 500 for a completion failure. Partial synthesis
//! success is still a 200 with assistant text present.

use std::sync::Arc;

use axum::extract::multipart::Multipart;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::json;
use tracing::{error, info};

use crate::error::{TurnError, UpstreamError};
use crate::limiter::resolve_identity;
use crate::retrieval::DocumentStore;
use crate::turn::{TurnOrchestrator, TurnRequest};

/// Upload size cap in bytes.
const MAX_UPLOAD_BYTES: usize = 1024 * 1024;
/// Stored document text is truncated to this many characters before
/// embedding, matching the embedding model's useful input size.
const EMBED_TRUNCATE_CHARS: usize = 8000;
/// Extensions accepted by the upload endpoint.
const ALLOWED_EXTENSIONS: [&str; 2] = [".txt", ".md"];

/// Shared state for the HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<TurnOrchestrator>,
    pub documents: Arc<dyn DocumentStore>,
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/saga", post(handle_turn))
        .route("/api/upload", post(handle_upload))
        .with_state(state)
}

fn error_json(status: StatusCode, body: serde_json::Value) -> Response {
    (status, Json(body)).into_response()
}

// ---------------------------------------------------------------------------
// Turn endpoint
// ---------------------------------------------------------------------------

async fn handle_turn(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<TurnRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(json) => json,
        Err(rejection) => {
            return error_json(
                StatusCode::BAD_REQUEST,
                json!({"error": "Malformed request body", "details": rejection.body_text()}),
            );
        }
    };

    let identity = resolve_identity(&headers);

    match state.orchestrator.run_turn(&identity, &request).await {
        Ok(response) => Json(response).into_response(),
        Err(TurnError::RateLimited) => error_json(
            StatusCode::TOO_MANY_REQUESTS,
            json!({"error": "Rate limit exceeded"}),
        ),
        Err(TurnError::Validation(message)) => {
            error_json(StatusCode::BAD_REQUEST, json!({"error": message}))
        }
        Err(TurnError::Completion(upstream)) => {
            error!(error = %upstream, "Turn failed on completion");
            let detail = match upstream {
                UpstreamError::Status { body, .. } => body,
                other => other.to_string(),
            };
            error_json(
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({"error": "Completion service error", "detail": detail}),
            )
        }
    }
}

// ---------------------------------------------------------------------------
// Upload endpoint
// ---------------------------------------------------------------------------

fn has_allowed_extension(filename: &str) -> bool {
    let lowered = filename.to_ascii_lowercase();
    ALLOWED_EXTENSIONS.iter().any(|ext| lowered.ends_with(ext))
}

/// Truncate to a character count without splitting a UTF-8 scalar.
fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}

async fn handle_upload(State(state): State<AppState>, mut multipart: Multipart) -> Response {
    let field = loop {
        match multipart.next_field().await {
            Ok(Some(field)) if field.name() == Some("file") => break field,
            Ok(Some(_)) => continue,
            Ok(None) => {
                return error_json(
                    StatusCode::BAD_REQUEST,
                    json!({"error": "No file uploaded"}),
                );
            }
            Err(e) => {
                return error_json(
                    StatusCode::BAD_REQUEST,
                    json!({"error": "Malformed multipart body", "details": e.to_string()}),
                );
            }
        }
    };

    let filename = match field.file_name() {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => {
            return error_json(
                StatusCode::BAD_REQUEST,
                json!({"error": "Uploaded file has no name"}),
            );
        }
    };

    if !has_allowed_extension(&filename) {
        return error_json(
            StatusCode::BAD_REQUEST,
            json!({"error": "Unsupported file type. Please upload TXT or MD."}),
        );
    }

    let bytes = match field.bytes().await {
        Ok(bytes) => bytes,
        Err(e) => {
            return error_json(
                StatusCode::BAD_REQUEST,
                json!({"error": "Failed to read upload", "details": e.to_string()}),
            );
        }
    };

    if bytes.len() > MAX_UPLOAD_BYTES {
        return error_json(
            StatusCode::PAYLOAD_TOO_LARGE,
            json!({"error": "File exceeds the 1 MiB upload limit"}),
        );
    }

    let text = match std::str::from_utf8(&bytes) {
        Ok(text) => text,
        Err(_) => {
            return error_json(
                StatusCode::BAD_REQUEST,
                json!({"error": "File is not valid UTF-8 text"}),
            );
        }
    };

    if text.trim().is_empty() {
        return error_json(
            StatusCode::BAD_REQUEST,
            json!({"error": "File contained no readable text"}),
        );
    }

    let truncated = truncate_chars(text, EMBED_TRUNCATE_CHARS);

    match state.documents.store_document(&filename, truncated).await {
        Ok(stored) => {
            info!(filename = %stored.filename, id = %stored.id, "Document uploaded and embedded");
            Json(json!({
                "success": true,
                "filename": stored.filename,
                "id": stored.id,
                "message": "Character sheet uploaded and stored successfully.",
            }))
            .into_response()
        }
        Err(e) => {
            error!(error = %e, filename = %filename, "Failed to store document");
            error_json(
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({"error": "Failed to save document"}),
            )
        }
    }
}
