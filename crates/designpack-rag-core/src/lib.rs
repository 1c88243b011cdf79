//! # designpack-rag core
//!
//! Pure retrieval logic for designpack-rag: data models, text cleaning and
//! fixed-width chunking, the sparse vectorizer, the deterministic hash
//! embedder, local cosine ranking, context rendering, and the
//! [`VectorStore`](store::VectorStore) abstraction with an in-memory backend.
//!
//! This crate performs no filesystem or network I/O. HTTP clients, the
//! knowledge-base loader and configuration live in the `designpack-rag`
//! application crate.

pub mod chunk;
pub mod context;
pub mod embedding;
pub mod local;
pub mod models;
pub mod store;
pub mod vector;
