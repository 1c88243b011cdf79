//! HTTP client for Qdrant-compatible vector databases.
//!
//! [`QdrantStore`] implements [`VectorStore`] over the REST API:
//!
//! | Operation | Request |
//! |-----------|---------|
//! | existence check | `GET /collections/{name}` |
//! | create | `PUT /collections/{name}` with `{vectors: {size, distance: "Cosine"}}` |
//! | upsert | `PUT /collections/{name}/points?wait=true` with `{points: [...]}` |
//! | search | `POST /collections/{name}/points/search` with `{vector, limit, with_payload, filter?}` |
//!
//! Every failure is returned as a [`StoreError`]. Whether that is fatal is
//! the caller's decision: ingestion propagates it, retrieval degrades to
//! an empty result.

use anyhow::Result;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

use designpack_rag_core::models::{IndexedPoint, ScoredPoint};
use designpack_rag_core::store::{PayloadFilter, VectorStore};

use crate::config::VectorDbConfig;

/// Failure talking to the vector database.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("vector database not configured (vector_db.url / QDRANT_URL is unset)")]
    NotConfigured,
    #[error("vector database request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("vector database returned {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("malformed vector database response: {0}")]
    Malformed(String),
}

/// A collection on a Qdrant-compatible server.
pub struct QdrantStore {
    client: reqwest::Client,
    base_url: String,
    collection: String,
    api_key: Option<String>,
    dims: usize,
}

#[derive(Deserialize)]
struct SearchResponse {
    result: Vec<ScoredPoint>,
}

impl QdrantStore {
    /// Build a client for `config.collection` with vectors of size `dims`.
    pub fn new(config: &VectorDbConfig, dims: usize) -> Result<Self, StoreError> {
        let url = config.url.as_deref().ok_or(StoreError::NotConfigured)?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: url.trim_end_matches('/').to_string(),
            collection: config.collection.clone(),
            api_key: config.api_key.clone(),
            dims,
        })
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    fn collection_url(&self) -> String {
        format!("{}/collections/{}", self.base_url, self.collection)
    }

    fn request(&self, method: reqwest::Method, url: String) -> reqwest::RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.api_key {
            Some(key) => builder.header("api-key", key),
            None => builder,
        }
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, StoreError> {
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(StoreError::Status { status, body })
        }
    }

    async fn ensure(&self) -> Result<(), StoreError> {
        let existing = self
            .request(reqwest::Method::GET, self.collection_url())
            .send()
            .await?;

        if existing.status() == StatusCode::OK {
            let info: Value = existing
                .json()
                .await
                .map_err(|e| StoreError::Malformed(format!("collection info: {}", e)))?;
            if let Some(size) = info
                .pointer("/result/config/params/vectors/size")
                .and_then(Value::as_u64)
            {
                if size as usize != self.dims {
                    tracing::warn!(
                        collection = %self.collection,
                        stored = size,
                        configured = self.dims,
                        "collection vector size differs from embedding dims"
                    );
                }
            }
            return Ok(());
        }

        tracing::info!(collection = %self.collection, dims = self.dims, "creating collection");
        let body = json!({
            "vectors": {
                "size": self.dims,
                "distance": "Cosine"
            }
        });
        let response = self
            .request(reqwest::Method::PUT, self.collection_url())
            .json(&body)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn upsert(&self, points: &[IndexedPoint]) -> Result<usize, StoreError> {
        if points.is_empty() {
            return Ok(0);
        }
        let body = json!({ "points": points });
        let response = self
            .request(
                reqwest::Method::PUT,
                format!("{}/points?wait=true", self.collection_url()),
            )
            .json(&body)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(points.len())
    }

    async fn query(
        &self,
        vector: &[f32],
        limit: usize,
        filter: &PayloadFilter,
    ) -> Result<Vec<ScoredPoint>, StoreError> {
        let mut body = json!({
            "vector": vector,
            "limit": limit,
            "with_payload": true,
        });
        if let Some(f) = qdrant_filter(filter) {
            body["filter"] = f;
        }
        let response = self
            .request(
                reqwest::Method::POST,
                format!("{}/points/search", self.collection_url()),
            )
            .json(&body)
            .send()
            .await?;
        let response = Self::check(response).await?;
        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| StoreError::Malformed(format!("search response: {}", e)))?;
        Ok(parsed.result)
    }
}

/// Translate an exact-match filter into Qdrant's `must` clause form.
/// An empty filter means no filter.
pub fn qdrant_filter(filter: &PayloadFilter) -> Option<Value> {
    if filter.is_empty() {
        return None;
    }
    let must: Vec<Value> = filter
        .iter()
        .map(|(key, value)| json!({ "key": key, "match": { "value": value } }))
        .collect();
    Some(json!({ "must": must }))
}

#[async_trait]
impl VectorStore for QdrantStore {
    async fn ensure_collection(&self) -> Result<()> {
        Ok(self.ensure().await?)
    }

    async fn upsert_points(&self, points: &[IndexedPoint]) -> Result<usize> {
        Ok(self.upsert(points).await?)
    }

    async fn search(
        &self,
        vector: &[f32],
        limit: usize,
        filter: &PayloadFilter,
    ) -> Result<Vec<ScoredPoint>> {
        Ok(self.query(vector, limit, filter).await?)
    }
}
