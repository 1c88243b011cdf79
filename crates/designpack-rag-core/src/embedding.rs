//! Embedding provider trait, the deterministic hash embedder, and the
//! fallback wrapper that never fails.
//!
//! Network-backed providers (OpenAI-compatible APIs) live in the
//! `designpack-rag` app crate and implement [`EmbeddingProvider`].
//!
//! # Hash embedding
//!
//! [`HashEmbedder`] is a hashed bag of words: every token from
//! [`tokenize`] is hashed with XxHash64 (seed 0) over its UTF-8 bytes,
//! the hash modulo `dims` picks a bucket, and the bucket is incremented by
//! 1.0. The result is L2-normalized unless it is all zeros. The hash is
//! fixed, so vectors from different processes stay comparable as long as
//! `dims` matches.

use std::hash::Hasher;

use anyhow::Result;
use async_trait::async_trait;
use twox_hash::XxHash64;

use crate::vector::{l2_normalize, tokenize};

/// Default embedding dimensionality.
pub const DEFAULT_DIMS: usize = 1536;

/// Model name reported by [`HashEmbedder`].
pub const HASH_MODEL_NAME: &str = "hash-bow";

/// Trait for embedding providers.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Returns the model identifier (e.g. `"text-embedding-3-small"`).
    fn model_name(&self) -> &str;
    /// Returns the embedding vector dimensionality (e.g. `1536`).
    fn dims(&self) -> usize;
    /// Compute a dense vector for `text`.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// Deterministic hashed bag-of-words embedder.
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dims: usize,
}

impl HashEmbedder {
    /// `dims` of zero is treated as 1 so bucketing never divides by zero.
    pub fn new(dims: usize) -> Self {
        Self { dims: dims.max(1) }
    }

    /// Embed synchronously. Used directly by the fallback path.
    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; self.dims];
        for token in tokenize(text) {
            v[bucket(&token, self.dims)] += 1.0;
        }
        l2_normalize(&mut v);
        v
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_DIMS)
    }
}

#[async_trait]
impl EmbeddingProvider for HashEmbedder {
    fn model_name(&self) -> &str {
        HASH_MODEL_NAME
    }
    fn dims(&self) -> usize {
        self.dims
    }
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.embed_text(text))
    }
}

/// Stable bucket for a token: XxHash64(seed 0) of its bytes, modulo `dims`.
pub fn bucket(token: &str, dims: usize) -> usize {
    let mut hasher = XxHash64::with_seed(0);
    hasher.write(token.as_bytes());
    (hasher.finish() % dims as u64) as usize
}

/// An embedder that tries an optional primary provider and falls back to
/// [`HashEmbedder`] on any error.
///
/// Retrieval never fails because the embedding service is down; the
/// failure is reported through the `on_fallback` hook (the app crate logs
/// it) and the deterministic vector is returned instead.
pub struct FallbackEmbedder {
    primary: Option<Box<dyn EmbeddingProvider>>,
    fallback: HashEmbedder,
    on_fallback: fn(&anyhow::Error),
}

impl FallbackEmbedder {
    pub fn new(primary: Option<Box<dyn EmbeddingProvider>>, dims: usize) -> Self {
        Self {
            primary,
            fallback: HashEmbedder::new(dims),
            on_fallback: |_| {},
        }
    }

    /// Hash-only embedder with no external provider.
    pub fn hash_only(dims: usize) -> Self {
        Self::new(None, dims)
    }

    /// Install a hook called with the primary provider's error whenever
    /// the fallback is used.
    pub fn with_fallback_hook(mut self, hook: fn(&anyhow::Error)) -> Self {
        self.on_fallback = hook;
        self
    }

    /// Whether an external provider is configured.
    pub fn has_primary(&self) -> bool {
        self.primary.is_some()
    }

    pub fn model_name(&self) -> &str {
        match &self.primary {
            Some(p) => p.model_name(),
            None => self.fallback.model_name(),
        }
    }

    pub fn dims(&self) -> usize {
        self.fallback.dims()
    }

    /// Embed `text`. Never fails.
    pub async fn embed(&self, text: &str) -> Vec<f32> {
        if let Some(primary) = &self.primary {
            match primary.embed(text).await {
                Ok(v) => return v,
                Err(e) => (self.on_fallback)(&e),
            }
        }
        self.fallback.embed_text(text)
    }
}
