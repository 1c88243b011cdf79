//! Core data models shared by the ingestion and retrieval paths.

use std::path::PathBuf;

use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};

/// Point ids live in `[0, 2^63 - 1)` so they fit a signed 64-bit column.
pub const POINT_ID_MODULUS: u128 = (1u128 << 63) - 1;

/// Where an ingested document came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Url,
    File,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Url => "url",
            SourceKind::File => "file",
        }
    }
}

/// An ingested unit of text, immutable once built.
#[derive(Debug, Clone)]
pub struct Document {
    pub source: SourceKind,
    /// URI or path the text was read from.
    pub uri: String,
    /// Cleaned body text.
    pub text: String,
    /// Free-form module label (e.g. `Inbound`).
    pub module: String,
    pub tags: Vec<String>,
}

/// A fixed-width slice of a document's text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub chunk_index: usize,
    pub text: String,
}

/// Metadata stored next to each vector in the index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointPayload {
    pub source: SourceKind,
    pub uri: String,
    pub chunk_index: usize,
    pub module: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// The persisted unit of the vector index.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexedPoint {
    pub id: u64,
    pub vector: Vec<f32>,
    pub payload: PointPayload,
}

impl IndexedPoint {
    /// Build a point for one chunk of `doc`, deriving its id from the
    /// document URI and the chunk index.
    pub fn for_chunk(doc: &Document, chunk: &Chunk, vector: Vec<f32>) -> Self {
        Self {
            id: point_id(&doc.uri, chunk.chunk_index),
            vector,
            payload: PointPayload {
                source: doc.source,
                uri: doc.uri.clone(),
                chunk_index: chunk.chunk_index,
                module: doc.module.clone(),
                tags: doc.tags.clone(),
            },
        }
    }
}

/// A raw hit from a vector store search.
///
/// The payload is kept as untyped JSON: the collection may hold points
/// written by other tools, and rendering only needs a couple of fields.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ScoredPoint {
    #[serde(default)]
    pub id: serde_json::Value,
    /// Missing scores read as 0.0 rather than rejecting the whole response.
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub payload: serde_json::Value,
}

/// A document from the local knowledge base directory.
#[derive(Debug, Clone)]
pub struct LocalDocument {
    pub path: PathBuf,
    pub text: String,
}

/// A ranked local search result.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalHit {
    pub path: PathBuf,
    pub text: String,
    pub score: f64,
}

/// Derive the deterministic point id for `(uri, chunk_index)`.
///
/// The MD5 digest of `"{uri}-{chunk_index}"` is read as a big-endian
/// 128-bit integer and reduced modulo `2^63 - 1`. Re-ingesting the same
/// chunk therefore overwrites the same point.
pub fn point_id(uri: &str, chunk_index: usize) -> u64 {
    let digest = Md5::digest(format!("{}-{}", uri, chunk_index).as_bytes());
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&digest);
    (u128::from_be_bytes(bytes) % POINT_ID_MODULUS) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_id_matches_reference_values() {
        assert_eq!(point_id("https://x/y", 0), 8207406080902486906);
        assert_eq!(point_id("https://x/y", 1), 8476652818528089529);
        assert_eq!(point_id("https://x/y", 2), 8681976020108802631);
    }

    #[test]
    fn test_point_id_deterministic_and_bounded() {
        for i in 0..50 {
            let a = point_id("file:///kb/inbound.md", i);
            let b = point_id("file:///kb/inbound.md", i);
            assert_eq!(a, b);
            assert!((a as u128) < POINT_ID_MODULUS);
        }
        assert_ne!(point_id("a", 1), point_id("a", 2));
    }

    #[test]
    fn test_payload_serializes_source_kind_lowercase() {
        let payload = PointPayload {
            source: SourceKind::Url,
            uri: "https://x/y".to_string(),
            chunk_index: 2,
            module: "Inbound".to_string(),
            tags: vec!["asn".to_string()],
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["source"], "url");
        assert_eq!(json["chunk_index"], 2);
        assert_eq!(json["tags"][0], "asn");
    }

    #[test]
    fn test_scored_point_tolerates_missing_fields() {
        let hit: ScoredPoint = serde_json::from_str(r#"{"score": 0.5}"#).unwrap();
        assert_eq!(hit.score, 0.5);
        assert!(hit.payload.is_null());
    }

    #[test]
    fn test_hit_without_score_keeps_the_rest() {
        let hits: Vec<ScoredPoint> = serde_json::from_str(
            r#"[{"id": 1, "payload": {"uri": "https://x/a"}},
                {"id": 2, "score": 0.8, "payload": {"uri": "https://x/b"}}]"#,
        )
        .unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].score, 0.0);
        assert_eq!(hits[1].score, 0.8);
    }
}
