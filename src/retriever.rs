//! Retrieval strategy and context assembly.
//!
//! A [`Retriever`] is built once from configuration. With a vector
//! database URL it embeds the query and searches the remote collection;
//! without one it re-scans the local knowledge-base directory and ranks
//! documents by sparse cosine similarity.
//!
//! Retrieval never fails. A remote search error is logged and treated as
//! "no hits", and no hits render as an empty context string.

use std::path::PathBuf;

use anyhow::Result;

use designpack_rag_core::context::{render_local, render_remote};
use designpack_rag_core::embedding::FallbackEmbedder;
use designpack_rag_core::local::rank;
use designpack_rag_core::models::{LocalHit, ScoredPoint};
use designpack_rag_core::store::{PayloadFilter, VectorStore};

use crate::config::{Config, RetrievalConfig};
use crate::embedding::create_embedder;
use crate::kb::load_kb;
use crate::qdrant::QdrantStore;

/// Where retrieval reads from.
pub enum Backend {
    /// Directory of `.md`/`.txt`/`.rst` files, re-read on every query.
    Local { kb_dir: PathBuf },
    /// Dense-vector collection plus the embedder used at ingestion.
    Remote {
        store: Box<dyn VectorStore>,
        embedder: FallbackEmbedder,
    },
}

/// Ranked hits from either backend.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchHits {
    Local(Vec<LocalHit>),
    Remote(Vec<ScoredPoint>),
}

impl SearchHits {
    pub fn len(&self) -> usize {
        match self {
            SearchHits::Local(h) => h.len(),
            SearchHits::Remote(h) => h.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub struct Retriever {
    backend: Backend,
    params: RetrievalConfig,
}

impl Retriever {
    pub fn new(backend: Backend, params: RetrievalConfig) -> Self {
        Self { backend, params }
    }

    /// Select the backend from `config`: remote when `vector_db.url` is
    /// set, local otherwise.
    pub fn from_config(config: &Config) -> Result<Self> {
        let backend = if config.vector_db.url.is_some() {
            let store = QdrantStore::new(&config.vector_db, config.embedding.dims)?;
            tracing::debug!(collection = %store.collection(), "using remote retrieval");
            Backend::Remote {
                store: Box::new(store),
                embedder: create_embedder(&config.embedding),
            }
        } else {
            tracing::debug!(dir = %config.knowledge_base.dir.display(), "using local retrieval");
            Backend::Local {
                kb_dir: config.knowledge_base.dir.clone(),
            }
        };
        Ok(Self::new(backend, config.retrieval.clone()))
    }

    pub fn is_remote(&self) -> bool {
        matches!(self.backend, Backend::Remote { .. })
    }

    /// Default result count for the active backend.
    pub fn default_k(&self) -> usize {
        match self.backend {
            Backend::Local { .. } => self.params.local_k,
            Backend::Remote { .. } => self.params.remote_k,
        }
    }

    /// Top-`k` hits for `query`. `filters` only apply to the remote
    /// backend.
    pub async fn search(&self, query: &str, k: usize, filters: &PayloadFilter) -> SearchHits {
        match &self.backend {
            Backend::Local { kb_dir } => {
                let docs = load_kb(kb_dir);
                SearchHits::Local(rank(query, &docs, k))
            }
            Backend::Remote { store, embedder } => {
                SearchHits::Remote(remote_search(store.as_ref(), embedder, query, k, filters).await)
            }
        }
    }

    /// Search and render the hits as prompt context. Empty when there are
    /// no hits.
    pub async fn build_context(&self, query: &str, k: usize, filters: &PayloadFilter) -> String {
        match self.search(query, k, filters).await {
            SearchHits::Local(hits) => render_local(&hits, self.params.snippet_chars),
            SearchHits::Remote(hits) => render_remote(&hits),
        }
    }
}

/// Embed `query` and search `store`, returning no hits on any failure.
pub async fn remote_search(
    store: &dyn VectorStore,
    embedder: &FallbackEmbedder,
    query: &str,
    k: usize,
    filters: &PayloadFilter,
) -> Vec<ScoredPoint> {
    let vector = embedder.embed(query).await;
    match store.search(&vector, k, filters).await {
        Ok(hits) => hits,
        Err(e) => {
            tracing::warn!("remote search failed, continuing without context: {:#}", e);
            Vec::new()
        }
    }
}
