//! Tokenizer, sparse term-count vectors, and dense vector helpers.
//!
//! Tokens are runs of ASCII letters, digits and `_`, lowercased. The same
//! tokenizer feeds both the local sparse index and the hash embedder.

use std::collections::BTreeMap;

/// Split text into lowercase `[a-z0-9_]+` tokens.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .filter(|t| !t.is_empty())
        .map(|t| t.to_ascii_lowercase())
        .collect()
}

/// Token counts for one text, with its Euclidean norm precomputed.
///
/// Counts are kept in a `BTreeMap` so the dot product always sums the
/// shared terms in key order, which makes [`SparseVector::cosine`]
/// exactly symmetric.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SparseVector {
    counts: BTreeMap<String, f64>,
    norm: f64,
}

impl SparseVector {
    pub fn from_text(text: &str) -> Self {
        let mut counts: BTreeMap<String, f64> = BTreeMap::new();
        for token in tokenize(text) {
            *counts.entry(token).or_insert(0.0) += 1.0;
        }
        let norm = counts.values().map(|v| v * v).sum::<f64>().sqrt();
        Self { counts, norm }
    }

    pub fn norm(&self) -> f64 {
        self.norm
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Count for `token`, or 0.
    pub fn get(&self, token: &str) -> f64 {
        self.counts.get(token).copied().unwrap_or(0.0)
    }

    /// Cosine similarity over the intersection of terms.
    ///
    /// Returns 0.0 when either side has no tokens.
    pub fn cosine(&self, other: &SparseVector) -> f64 {
        let denom = self.norm * other.norm;
        if denom == 0.0 {
            return 0.0;
        }
        let (small, large) = if self.counts.len() <= other.counts.len() {
            (&self.counts, &other.counts)
        } else {
            (&other.counts, &self.counts)
        };
        let dot: f64 = small
            .iter()
            .filter_map(|(k, a)| large.get(k).map(|b| a * b))
            .sum();
        dot / denom
    }
}

/// Scale `v` to unit length in place. A zero vector is left untouched.
pub fn l2_normalize(v: &mut [f32]) {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

/// Euclidean length of a dense vector.
pub fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Cosine similarity between two dense vectors.
///
/// Returns `0.0` for empty vectors, vectors of different lengths, or a
/// zero-length side.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }

    dot / denom
}
