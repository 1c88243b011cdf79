//! Fixed-width text chunker.
//!
//! Documents are cleaned (whitespace collapsed, trimmed), truncated to
//! [`MAX_DOCUMENT_CHARS`], then cut into non-overlapping slices of
//! [`CHUNK_SIZE`] characters. At most [`MAX_CHUNKS`] slices are kept; any
//! content past the cap is dropped.
//!
//! Lengths are counted in `char`s, so a slice never splits a UTF-8
//! sequence.
//!
//! # Example
//!
//! ```rust
//! use designpack_rag_core::chunk::chunk_text;
//!
//! let text = "a".repeat(2500);
//! let chunks = chunk_text(&text);
//! assert_eq!(chunks.len(), 3);
//! assert_eq!(chunks[2].len(), 500);
//! ```

use crate::models::{Chunk, Document};

/// Maximum characters per chunk.
pub const CHUNK_SIZE: usize = 1000;
/// Maximum chunks produced for a single document.
pub const MAX_CHUNKS: usize = 200;
/// Maximum characters of cleaned document text kept at ingestion.
pub const MAX_DOCUMENT_CHARS: usize = 200_000;

/// Collapse every whitespace run to a single space and trim both ends.
pub fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Return the prefix of `text` holding at most `max_chars` characters.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Clean and truncate raw document text, ready for [`chunk_text`].
pub fn prepare_text(raw: &str) -> String {
    let cleaned = clean_text(raw);
    truncate_chars(&cleaned, MAX_DOCUMENT_CHARS).to_string()
}

/// Split text into slices of [`CHUNK_SIZE`] characters, capped at
/// [`MAX_CHUNKS`]. Empty input yields no chunks.
pub fn chunk_text(text: &str) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut rest = text;
    while !rest.is_empty() && chunks.len() < MAX_CHUNKS {
        let (head, tail) = rest.split_at(char_boundary(rest, CHUNK_SIZE));
        chunks.push(head.to_string());
        rest = tail;
    }
    chunks
}

/// Chunk a document's text, pairing each slice with its position.
pub fn chunk_document(doc: &Document) -> Vec<Chunk> {
    chunk_text(&doc.text)
        .into_iter()
        .enumerate()
        .map(|(chunk_index, text)| Chunk { chunk_index, text })
        .collect()
}

/// Byte offset just past the first `n` characters of `s`.
fn char_boundary(s: &str, n: usize) -> usize {
    s.char_indices().nth(n).map(|(i, _)| i).unwrap_or(s.len())
}
