//! In-memory [`VectorStore`] implementation for tests and offline use.
//!
//! Points are kept in insertion order behind a `std::sync::RwLock`. An
//! upsert for an existing id replaces the stored point in place, so the
//! last write wins and equal-score ties keep first-insertion order.
//! Search is brute-force cosine similarity.

use std::sync::RwLock;

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;

use crate::models::{IndexedPoint, ScoredPoint};
use crate::vector::cosine_similarity;

use super::{payload_matches, PayloadFilter, VectorStore};

/// In-memory vector store.
pub struct InMemoryVectorStore {
    dims: usize,
    created: RwLock<bool>,
    points: RwLock<Vec<IndexedPoint>>,
}

impl InMemoryVectorStore {
    pub fn new(dims: usize) -> Self {
        Self {
            dims,
            created: RwLock::new(false),
            points: RwLock::new(Vec::new()),
        }
    }

    /// Number of stored points.
    pub fn len(&self) -> usize {
        self.points.read().map(|p| p.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fetch a stored point by id.
    pub fn get(&self, id: u64) -> Option<IndexedPoint> {
        self.points
            .read()
            .ok()
            .and_then(|p| p.iter().find(|pt| pt.id == id).cloned())
    }

    pub fn collection_exists(&self) -> bool {
        self.created.read().map(|c| *c).unwrap_or(false)
    }
}

fn poisoned<T>(_: T) -> anyhow::Error {
    anyhow!("in-memory store lock poisoned")
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn ensure_collection(&self) -> Result<()> {
        *self.created.write().map_err(poisoned)? = true;
        Ok(())
    }

    async fn upsert_points(&self, points: &[IndexedPoint]) -> Result<usize> {
        if !self.collection_exists() {
            bail!("collection does not exist; call ensure_collection first");
        }
        if let Some(bad) = points.iter().find(|p| p.vector.len() != self.dims) {
            bail!(
                "vector dimension error: expected {}, got {} for point {}",
                self.dims,
                bad.vector.len(),
                bad.id
            );
        }
        let mut stored = self.points.write().map_err(poisoned)?;
        for point in points {
            match stored.iter_mut().find(|p| p.id == point.id) {
                Some(existing) => *existing = point.clone(),
                None => stored.push(point.clone()),
            }
        }
        Ok(points.len())
    }

    async fn search(
        &self,
        vector: &[f32],
        limit: usize,
        filter: &PayloadFilter,
    ) -> Result<Vec<ScoredPoint>> {
        if !self.collection_exists() {
            bail!("collection does not exist");
        }
        let stored = self.points.read().map_err(poisoned)?;
        let mut hits = Vec::new();
        for point in stored.iter() {
            let payload = serde_json::to_value(&point.payload)?;
            if !payload_matches(&payload, filter) {
                continue;
            }
            hits.push(ScoredPoint {
                id: serde_json::json!(point.id),
                score: cosine_similarity(vector, &point.vector) as f64,
                payload,
            });
        }
        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(limit);
        Ok(hits)
    }
}
