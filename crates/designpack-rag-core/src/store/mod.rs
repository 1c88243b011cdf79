//! Vector store abstraction.
//!
//! The [`VectorStore`] trait covers the three operations the ingestion and
//! retrieval paths need from a dense-vector index. The app crate provides
//! an HTTP backend for Qdrant-compatible servers; [`memory`] provides an
//! in-process backend with the same semantics.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use std::collections::BTreeMap;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

use crate::models::{IndexedPoint, ScoredPoint};

/// Exact-match payload filter: every `key` must equal its `value`.
pub type PayloadFilter = BTreeMap<String, String>;

/// Abstract dense-vector index.
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`ensure_collection`](VectorStore::ensure_collection) | Create the collection if absent |
/// | [`upsert_points`](VectorStore::upsert_points) | Write a batch of points, last write wins per id |
/// | [`search`](VectorStore::search) | Cosine similarity search with an optional filter |
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Idempotently create the collection with the store's dimensionality
    /// and cosine distance.
    async fn ensure_collection(&self) -> Result<()>;

    /// Write all points in one batch and wait for acknowledgement.
    ///
    /// Returns the number of points written.
    async fn upsert_points(&self, points: &[IndexedPoint]) -> Result<usize>;

    /// Return up to `limit` hits ranked by similarity to `vector`.
    async fn search(
        &self,
        vector: &[f32],
        limit: usize,
        filter: &PayloadFilter,
    ) -> Result<Vec<ScoredPoint>>;
}

/// Whether `payload` satisfies every condition in `filter`.
///
/// String fields are compared as-is; other scalars are compared by their
/// JSON text, so `chunk_index = "2"` matches a numeric `2`.
pub fn payload_matches(payload: &Value, filter: &PayloadFilter) -> bool {
    filter.iter().all(|(key, expected)| match payload.get(key) {
        Some(Value::String(s)) => s == expected,
        Some(Value::Number(n)) => n.to_string() == *expected,
        Some(Value::Bool(b)) => b.to_string() == *expected,
        _ => false,
    })
}
