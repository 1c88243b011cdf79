//! Ingestion pipeline.
//!
//! Coordinates the full flow for one document: fetch → clean → truncate →
//! chunk → embed → ensure collection → upsert. Unlike retrieval, every
//! storage failure here is fatal and propagated to the caller; only the
//! embedding provider degrades (to the hash embedding).

use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use regex::Regex;
use serde::Serialize;

use designpack_rag_core::chunk::{chunk_document, prepare_text};
use designpack_rag_core::embedding::FallbackEmbedder;
use designpack_rag_core::models::{Document, IndexedPoint, SourceKind};
use designpack_rag_core::store::VectorStore;

use crate::config::Config;
use crate::embedding::create_embedder;
use crate::qdrant::QdrantStore;

/// Outcome of ingesting one document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub chunks: usize,
    pub upserted: usize,
}

/// Chunk, embed and upsert `doc` into `store`.
///
/// The collection is ensured first. All points go out in one batch.
pub async fn index_document(
    store: &dyn VectorStore,
    embedder: &FallbackEmbedder,
    doc: &Document,
) -> Result<IngestReport> {
    let chunks = chunk_document(doc);

    store
        .ensure_collection()
        .await
        .context("Failed to ensure vector collection")?;

    let mut points = Vec::with_capacity(chunks.len());
    for chunk in &chunks {
        let vector = embedder.embed(&chunk.text).await;
        points.push(IndexedPoint::for_chunk(doc, chunk, vector));
    }

    let upserted = store
        .upsert_points(&points)
        .await
        .with_context(|| format!("Failed to upsert {} points for {}", points.len(), doc.uri))?;

    tracing::info!(
        uri = %doc.uri,
        module = %doc.module,
        chunks = chunks.len(),
        upserted,
        "document ingested"
    );

    Ok(IngestReport {
        chunks: chunks.len(),
        upserted,
    })
}

/// Ingestion entry point bound to one store and embedder.
pub struct Ingestor {
    store: Box<dyn VectorStore>,
    embedder: FallbackEmbedder,
    http: reqwest::Client,
    default_module: String,
}

impl Ingestor {
    pub fn new(
        store: Box<dyn VectorStore>,
        embedder: FallbackEmbedder,
        fetch_timeout: Duration,
        default_module: impl Into<String>,
    ) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(fetch_timeout).build()?;
        Ok(Self {
            store,
            embedder,
            http,
            default_module: default_module.into(),
        })
    }

    /// Build an ingestor writing to the configured vector database.
    ///
    /// # Errors
    ///
    /// Fails when `vector_db.url` is not set: there is nowhere durable to
    /// ingest into.
    pub fn from_config(config: &Config) -> Result<Self> {
        if config.vector_db.url.is_none() {
            bail!("Ingestion requires a vector database: set vector_db.url or QDRANT_URL");
        }
        let store = QdrantStore::new(&config.vector_db, config.embedding.dims)?;
        Self::new(
            Box::new(store),
            create_embedder(&config.embedding),
            Duration::from_secs(config.ingest.fetch_timeout_secs),
            config.ingest.default_module.clone(),
        )
    }

    /// Ingest already-extracted text under `uri`.
    pub async fn ingest_text(
        &self,
        source: SourceKind,
        uri: &str,
        raw: &str,
        module: Option<&str>,
        tags: &[String],
    ) -> Result<IngestReport> {
        let doc = Document {
            source,
            uri: uri.to_string(),
            text: prepare_text(raw),
            module: module.unwrap_or(&self.default_module).to_string(),
            tags: tags.to_vec(),
        };
        index_document(self.store.as_ref(), &self.embedder, &doc).await
    }

    /// Fetch `url`, strip HTML if needed, and ingest it.
    pub async fn ingest_url(
        &self,
        url: &str,
        module: Option<&str>,
        tags: &[String],
    ) -> Result<IngestReport> {
        let text = fetch_text(&self.http, url).await?;
        self.ingest_text(SourceKind::Url, url, &text, module, tags)
            .await
    }

    /// Read a local file and ingest it under its `file://` URI.
    pub async fn ingest_file(
        &self,
        path: &Path,
        module: Option<&str>,
        tags: &[String],
    ) -> Result<IngestReport> {
        let text = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let absolute = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        let uri = format!("file://{}", absolute.display());
        self.ingest_text(SourceKind::File, &uri, &text, module, tags)
            .await
    }
}

/// GET `url` and return its text, with markup removed for HTML responses.
pub async fn fetch_text(client: &reqwest::Client, url: &str) -> Result<String> {
    let response = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("Failed to fetch {}", url))?
        .error_for_status()
        .with_context(|| format!("Failed to fetch {}", url))?;

    let is_html = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| ct.contains("html"))
        .unwrap_or(false);

    let body = response.text().await?;
    tracing::debug!(url, bytes = body.len(), is_html, "fetched document");

    if is_html {
        html_to_text(&body)
    } else {
        Ok(body)
    }
}

const HIDDEN_BLOCKS: &str = r"(?is)<!--.*?-->|<script\b[^>]*>.*?</script\s*>|<style\b[^>]*>.*?</style\s*>|<noscript\b[^>]*>.*?</noscript\s*>";
const TAGS: &str = r"(?s)<[^>]*>";

/// Reduce an HTML page to its visible text.
///
/// Drops comments and `script`/`style`/`noscript` elements with their
/// content, replaces remaining tags with spaces and decodes the common
/// entities. Whitespace is left for [`prepare_text`] to collapse.
pub fn html_to_text(html: &str) -> Result<String> {
    let hidden = Regex::new(HIDDEN_BLOCKS)?;
    let tags = Regex::new(TAGS)?;
    let visible = hidden.replace_all(html, " ");
    let text = tags.replace_all(&visible, " ");
    Ok(text
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&"))
}
