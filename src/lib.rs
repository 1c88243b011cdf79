//! # designpack-rag
//!
//! Retrieval for the WMS design-pack generator: ingest reference documents
//! into a vector collection, retrieve the passages most relevant to a
//! requirement, and assemble them into prompt context.
//!
//! ## Architecture
//!
//! ```text
//!  URL / file ──▶ ingest ──▶ chunk + embed ──▶ Qdrant collection
//!                                                   │
//!  requirement ──▶ query ──▶ Retriever ◀────────────┘
//!                              │   └── local kb/ directory (no vector DB)
//!                              ▼
//!                       context string ──▶ generate (assumptions)
//! ```
//!
//! Pure logic (chunking, hashing, ranking, rendering, the store trait and
//! its in-memory double) lives in [`designpack_rag_core`]. This crate adds
//! configuration and the HTTP-backed pieces.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML file + environment configuration |
//! | [`embedding`] | OpenAI embedding provider with hash fallback |
//! | [`kb`] | Local knowledge-base loader |
//! | [`qdrant`] | Qdrant REST client |
//! | [`retriever`] | Backend selection and context assembly |
//! | [`ingest`] | Fetch, clean, chunk, embed, upsert |
//! | [`prompt`] | Requirement parsing and prompts |
//! | [`generate`] | LLM backends with prompt-echo fallback |
//! | [`assume`] | Requirement to assumptions draft |

pub mod assume;
pub mod config;
pub mod embedding;
pub mod generate;
pub mod ingest;
pub mod kb;
pub mod prompt;
pub mod qdrant;
pub mod retriever;
