// Copyright (c) 2024-2026, Daily
// SPDX-License-Identifier: BSD-2-Clause

//! Context retrieval from external knowledge and document stores.
//!
//! The orchestrator consumes two advisory sources per turn: world-lore
//! snippets matched against the user's message, and the uploaded player
//! sheets. Both sit behind [`ContextRetriever`] so failures can degrade to
//! empty context and tests can script the results.
//!
//! [`VectorStoreRetriever`] is the production implementation: it embeds the
//! query via an OpenAI-compatible `/v1/embeddings` endpoint and calls a
//! PostgREST-style vector store (similarity RPC `match_saga_knowledge`,
//! `player_sheets` table). The store's own indexing and search are external;
//! this module only speaks its HTTP interface.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::error::RetrievalError;

/// Embedding model used for queries and stored documents. Must match on both
/// sides or similarity scores are meaningless.
pub const EMBEDDING_MODEL: &str = "text-embedding-3-small";

/// Similarity threshold for knowledge matches.
const MATCH_THRESHOLD: f64 = 0.8;
/// Maximum knowledge matches per query.
const MATCH_COUNT: u32 = 5;

/// A snippet of advisory background text retrieved from the knowledge store.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ContextBlock {
    pub content: String,
}

/// One uploaded document (a player sheet) with its display label.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DocumentBlock {
    #[serde(rename = "filename")]
    pub label: String,
    pub content: String,
}

/// Receipt for a stored document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredDocument {
    pub id: String,
    pub filename: String,
}

/// Advisory context sources for one turn. Errors from either call are
/// absorbed by the orchestrator and treated as empty context.
#[async_trait]
pub trait ContextRetriever: Send + Sync {
    /// Retrieve knowledge blocks relevant to `query`.
    async fn retrieve_knowledge(&self, query: &str) -> Result<Vec<ContextBlock>, RetrievalError>;

    /// Retrieve all uploaded document blocks.
    async fn retrieve_documents(&self) -> Result<Vec<DocumentBlock>, RetrievalError>;
}

/// Sink for the document upload endpoint. Stores extracted text with its
/// embedding so later turns can retrieve it.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn store_document(
        &self,
        filename: &str,
        content: &str,
    ) -> Result<StoredDocument, RetrievalError>;
}

// ---------------------------------------------------------------------------
// Embedding response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingDatum {
    embedding: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct InsertedRow {
    id: serde_json::Value,
    filename: String,
}

// ---------------------------------------------------------------------------
// VectorStoreRetriever
// ---------------------------------------------------------------------------

/// HTTP client for the external knowledge/document store.
pub struct VectorStoreRetriever {
    client: reqwest::Client,
    store_url: String,
    store_key: String,
    embeddings_url: String,
    embeddings_api_key: String,
}

impl VectorStoreRetriever {
    /// Default embeddings endpoint.
    pub const DEFAULT_EMBEDDINGS_URL: &'static str = "https://api.openai.com/v1/embeddings";

    /// Create a retriever for the given store.
    ///
    /// # Arguments
    ///
    /// * `store_url` - Base URL of the PostgREST-style store.
    /// * `store_key` - API key sent as `apikey` and bearer token.
    /// * `embeddings_api_key` - Key for the embeddings endpoint.
    pub fn new(
        store_url: impl Into<String>,
        store_key: impl Into<String>,
        embeddings_api_key: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .connect_timeout(std::time::Duration::from_secs(10))
                .build()
                .expect("failed to build HTTP client"),
            store_url: store_url.into().trim_end_matches('/').to_string(),
            store_key: store_key.into(),
            embeddings_url: Self::DEFAULT_EMBEDDINGS_URL.to_string(),
            embeddings_api_key: embeddings_api_key.into(),
        }
    }

    /// Builder method: set a custom embeddings endpoint.
    pub fn with_embeddings_url(mut self, url: impl Into<String>) -> Self {
        self.embeddings_url = url.into();
        self
    }

    /// Embed text with the configured embeddings endpoint.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, RetrievalError> {
        let response = self
            .client
            .post(&self.embeddings_url)
            .bearer_auth(&self.embeddings_api_key)
            .json(&json!({
                "model": EMBEDDING_MODEL,
                "input": text,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(RetrievalError::Store(format!(
                "embeddings endpoint returned HTTP {status}: {body}"
            )));
        }

        let parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| RetrievalError::Store(format!("malformed embeddings response: {e}")))?;

        parsed
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| RetrievalError::Store("embeddings response had no data".into()))
    }

    fn store_request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, format!("{}{path}", self.store_url))
            .header("apikey", &self.store_key)
            .bearer_auth(&self.store_key)
    }
}

#[async_trait]
impl ContextRetriever for VectorStoreRetriever {
    async fn retrieve_knowledge(&self, query: &str) -> Result<Vec<ContextBlock>, RetrievalError> {
        let embedding = self.embed(query).await?;

        let response = self
            .store_request(reqwest::Method::POST, "/rest/v1/rpc/match_saga_knowledge")
            .json(&json!({
                "query_embedding": embedding,
                "match_threshold": MATCH_THRESHOLD,
                "match_count": MATCH_COUNT,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(RetrievalError::Store(format!(
                "knowledge match returned HTTP {status}: {body}"
            )));
        }

        let blocks: Vec<ContextBlock> = response
            .json()
            .await
            .map_err(|e| RetrievalError::Store(format!("malformed match response: {e}")))?;

        debug!(matches = blocks.len(), "Knowledge context retrieved");
        Ok(blocks)
    }

    async fn retrieve_documents(&self) -> Result<Vec<DocumentBlock>, RetrievalError> {
        let response = self
            .store_request(
                reqwest::Method::GET,
                "/rest/v1/player_sheets?select=filename,content",
            )
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(RetrievalError::Store(format!(
                "document fetch returned HTTP {status}: {body}"
            )));
        }

        let docs: Vec<DocumentBlock> = response
            .json()
            .await
            .map_err(|e| RetrievalError::Store(format!("malformed document response: {e}")))?;

        debug!(documents = docs.len(), "Document context retrieved");
        Ok(docs)
    }
}

#[async_trait]
impl DocumentStore for VectorStoreRetriever {
    async fn store_document(
        &self,
        filename: &str,
        content: &str,
    ) -> Result<StoredDocument, RetrievalError> {
        let embedding = self.embed(content).await?;

        let response = self
            .store_request(reqwest::Method::POST, "/rest/v1/player_sheets")
            .header("Prefer", "return=representation")
            .json(&json!({
                "filename": filename,
                "content": content,
                "embedding": embedding,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(RetrievalError::Store(format!(
                "document insert returned HTTP {status}: {body}"
            )));
        }

        let rows: Vec<InsertedRow> = response
            .json()
            .await
            .map_err(|e| RetrievalError::Store(format!("malformed insert response: {e}")))?;

        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| RetrievalError::Store("insert returned no row".into()))?;

        Ok(StoredDocument {
            id: row.id.to_string().trim_matches('"').to_string(),
            filename: row.filename,
        })
    }
}
