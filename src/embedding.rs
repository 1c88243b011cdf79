//! Embedding providers.
//!
//! - **[`OpenAIProvider`]** calls an OpenAI-compatible `POST /embeddings`
//!   endpoint and returns the vector verbatim.
//! - The deterministic [`HashEmbedder`] from the core crate is the
//!   fallback.
//!
//! [`create_embedder`] picks the strategy once from configuration: with an
//! API key the OpenAI provider is primary and the hash embedder catches
//! any failure; without one only the hash embedder is used. Either way the
//! returned [`FallbackEmbedder`] never fails.
//!
//! There is no retry or backoff: a single failed request falls straight
//! back to the hash embedding.

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use std::time::Duration;

pub use designpack_rag_core::embedding::{EmbeddingProvider, FallbackEmbedder, HashEmbedder};

use crate::config::EmbeddingConfig;

/// Embedding provider using the OpenAI embeddings API.
pub struct OpenAIProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    dims: usize,
}

impl OpenAIProvider {
    /// Create a provider from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if no API key is configured or the HTTP client
    /// cannot be built.
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| anyhow!("embedding.api_key (OPENAI_API_KEY) not set"))?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            api_key,
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            dims: config.dims,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAIProvider {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let body = serde_json::json!({
            "model": self.model,
            "input": text,
        });

        let response = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            bail!("OpenAI API error {}: {}", status, body_text);
        }

        let json: serde_json::Value = response.json().await?;
        let vector = parse_openai_response(&json)?;
        if vector.len() != self.dims {
            tracing::warn!(
                model = %self.model,
                expected = self.dims,
                actual = vector.len(),
                "embedding dimension differs from configured dims"
            );
        }
        Ok(vector)
    }
}

/// Extract `data[0].embedding` from an OpenAI embeddings response.
fn parse_openai_response(json: &serde_json::Value) -> Result<Vec<f32>> {
    let embedding = json
        .get("data")
        .and_then(|d| d.as_array())
        .and_then(|d| d.first())
        .and_then(|item| item.get("embedding"))
        .and_then(|e| e.as_array())
        .ok_or_else(|| anyhow!("Invalid OpenAI response: missing data[0].embedding"))?;

    embedding
        .iter()
        .map(|v| {
            v.as_f64()
                .map(|f| f as f32)
                .ok_or_else(|| anyhow!("Invalid OpenAI response: non-numeric embedding value"))
        })
        .collect()
}

fn log_fallback(err: &anyhow::Error) {
    tracing::warn!("embedding provider failed, using hash embedding: {:#}", err);
}

/// Build the embedder selected by `config`.
///
/// Never fails: if the external provider cannot even be constructed, the
/// error is logged and the hash embedder is used alone.
pub fn create_embedder(config: &EmbeddingConfig) -> FallbackEmbedder {
    let primary: Option<Box<dyn EmbeddingProvider>> = if config.is_external() {
        match OpenAIProvider::new(config) {
            Ok(p) => Some(Box::new(p)),
            Err(e) => {
                log_fallback(&e);
                None
            }
        }
    } else {
        None
    };
    tracing::debug!(
        external = primary.is_some(),
        dims = config.dims,
        "embedding strategy selected"
    );
    FallbackEmbedder::new(primary, config.dims).with_fallback_hook(log_fallback)
}
