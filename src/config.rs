//! Configuration loading.
//!
//! A [`Config`] is read from an optional TOML file, overlaid with the
//! recognised environment variables, then validated. Every field has a
//! default, so an empty file (or no file) is a valid configuration that
//! searches the local `kb/` directory with hash embeddings.
//!
//! Environment variables are only read by [`Config::apply_process_env`];
//! everything downstream takes the struct, which keeps the retrieval
//! components testable without touching the process environment.
//!
//! | Field | Env |
//! |-------|-----|
//! | `embedding.api_key` | `OPENAI_API_KEY` |
//! | `embedding.model` | `EMBED_MODEL` |
//! | `embedding.base_url` | `OPENAI_BASE_URL` |
//! | `embedding.dims` | `EMBED_DIM` |
//! | `vector_db.url` | `QDRANT_URL` |
//! | `vector_db.collection` | `QDRANT_COLLECTION` |
//! | `vector_db.api_key` | `QDRANT_API_KEY` |
//! | `knowledge_base.dir` | `KB_DIR` |
//! | `generation.provider` | `LLM_PROVIDER` |
//! | `generation.openai_api_key` | `OPENAI_API_KEY` |
//! | `generation.google_api_key` | `GOOGLE_API_KEY` |
//! | `generation.openai_model` / `gemini_model` / `ollama_model` | `OPENAI_MODEL` / `GEMINI_MODEL` / `OLLAMA_MODEL` |
//! | `generation.ollama_url` | `OLLAMA_URL` |

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Config file used when `--config` is not given, if it exists.
pub const DEFAULT_CONFIG_PATH: &str = "./config/dpk.toml";

const REDACTED: &str = "***";

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub embedding: EmbeddingConfig,
    pub vector_db: VectorDbConfig,
    pub knowledge_base: KnowledgeBaseConfig,
    pub retrieval: RetrievalConfig,
    pub ingest: IngestConfig,
    pub generation: GenerationConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct EmbeddingConfig {
    /// Enables the external provider when set.
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_embed_model")]
    pub model: String,
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,
    #[serde(default = "default_dims")]
    pub dims: usize,
    #[serde(default = "default_request_timeout")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_embed_model(),
            base_url: default_openai_base_url(),
            dims: default_dims(),
            timeout_secs: default_request_timeout(),
        }
    }
}

impl EmbeddingConfig {
    pub fn is_external(&self) -> bool {
        self.api_key.is_some()
    }
}

fn default_embed_model() -> String {
    "text-embedding-3-small".to_string()
}
fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}
fn default_dims() -> usize {
    1536
}
fn default_request_timeout() -> u64 {
    20
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct VectorDbConfig {
    /// Base URL of the Qdrant-compatible server. Unset means local search.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_collection")]
    pub collection: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_request_timeout")]
    pub timeout_secs: u64,
}

impl Default for VectorDbConfig {
    fn default() -> Self {
        Self {
            url: None,
            collection: default_collection(),
            api_key: None,
            timeout_secs: default_request_timeout(),
        }
    }
}

fn default_collection() -> String {
    "wms_kb".to_string()
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct KnowledgeBaseConfig {
    #[serde(default = "default_kb_dir")]
    pub dir: PathBuf,
}

impl Default for KnowledgeBaseConfig {
    fn default() -> Self {
        Self {
            dir: default_kb_dir(),
        }
    }
}

fn default_kb_dir() -> PathBuf {
    PathBuf::from("kb")
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_local_k")]
    pub local_k: usize,
    #[serde(default = "default_remote_k")]
    pub remote_k: usize,
    #[serde(default = "default_snippet_chars")]
    pub snippet_chars: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            local_k: default_local_k(),
            remote_k: default_remote_k(),
            snippet_chars: default_snippet_chars(),
        }
    }
}

fn default_local_k() -> usize {
    4
}
fn default_remote_k() -> usize {
    6
}
fn default_snippet_chars() -> usize {
    designpack_rag_core::context::SNIPPET_CHARS
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct IngestConfig {
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,
    #[serde(default = "default_module")]
    pub default_module: String,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            fetch_timeout_secs: default_fetch_timeout(),
            default_module: default_module(),
        }
    }
}

fn default_fetch_timeout() -> u64 {
    60
}
fn default_module() -> String {
    "Unknown".to_string()
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct GenerationConfig {
    /// `none`, `openai`, `gemini` or `ollama`.
    #[serde(default = "default_llm_provider")]
    pub provider: String,
    /// Overrides the per-provider model below.
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default = "default_openai_model")]
    pub openai_model: String,
    #[serde(default = "default_gemini_model")]
    pub gemini_model: String,
    #[serde(default = "default_ollama_model")]
    pub ollama_model: String,
    #[serde(default)]
    pub openai_api_key: Option<String>,
    #[serde(default)]
    pub google_api_key: Option<String>,
    #[serde(default = "default_openai_base_url")]
    pub openai_base_url: String,
    #[serde(default = "default_ollama_url")]
    pub ollama_url: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_generation_timeout")]
    pub timeout_secs: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: default_llm_provider(),
            model: None,
            openai_model: default_openai_model(),
            gemini_model: default_gemini_model(),
            ollama_model: default_ollama_model(),
            openai_api_key: None,
            google_api_key: None,
            openai_base_url: default_openai_base_url(),
            ollama_url: default_ollama_url(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_generation_timeout(),
        }
    }
}

impl GenerationConfig {
    /// The model for the configured provider, honouring `model` if set.
    pub fn resolved_model(&self) -> &str {
        if let Some(m) = &self.model {
            return m;
        }
        match self.provider.as_str() {
            "openai" => &self.openai_model,
            "gemini" => &self.gemini_model,
            "ollama" => &self.ollama_model,
            _ => "none",
        }
    }
}

fn default_llm_provider() -> String {
    "none".to_string()
}
fn default_openai_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_gemini_model() -> String {
    "gemini-1.5-flash".to_string()
}
fn default_ollama_model() -> String {
    "llama3".to_string()
}
fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}
fn default_max_tokens() -> u32 {
    400
}
fn default_generation_timeout() -> u64 {
    60
}

impl Config {
    /// Overlay values from `lookup` (an environment accessor). Empty
    /// values count as unset.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = get("OPENAI_API_KEY") {
            self.embedding.api_key = Some(key.clone());
            self.generation.openai_api_key = Some(key);
        }
        if let Some(model) = get("EMBED_MODEL") {
            self.embedding.model = model;
        }
        if let Some(url) = get("OPENAI_BASE_URL") {
            self.embedding.base_url = url.clone();
            self.generation.openai_base_url = url;
        }
        if let Some(dims) = get("EMBED_DIM") {
            self.embedding.dims = dims
                .trim()
                .parse()
                .with_context(|| format!("EMBED_DIM is not a positive integer: {}", dims))?;
        }
        if let Some(url) = get("QDRANT_URL") {
            self.vector_db.url = Some(url);
        }
        if let Some(collection) = get("QDRANT_COLLECTION") {
            self.vector_db.collection = collection;
        }
        if let Some(key) = get("QDRANT_API_KEY") {
            self.vector_db.api_key = Some(key);
        }
        if let Some(dir) = get("KB_DIR") {
            self.knowledge_base.dir = PathBuf::from(dir);
        }
        if let Some(provider) = get("LLM_PROVIDER") {
            self.generation.provider = provider.to_lowercase();
        }
        if let Some(key) = get("GOOGLE_API_KEY") {
            self.generation.google_api_key = Some(key);
        }
        if let Some(model) = get("OPENAI_MODEL") {
            self.generation.openai_model = model;
        }
        if let Some(model) = get("GEMINI_MODEL") {
            self.generation.gemini_model = model;
        }
        if let Some(model) = get("OLLAMA_MODEL") {
            self.generation.ollama_model = model;
        }
        if let Some(url) = get("OLLAMA_URL") {
            self.generation.ollama_url = url;
        }
        Ok(())
    }

    /// Overlay values from the process environment.
    pub fn apply_process_env(&mut self) -> Result<()> {
        self.apply_env(|key| std::env::var(key).ok())
    }

    pub fn validate(&self) -> Result<()> {
        if self.embedding.dims == 0 {
            bail!("embedding.dims must be > 0");
        }
        if self.retrieval.local_k < 1 {
            bail!("retrieval.local_k must be >= 1");
        }
        if self.retrieval.remote_k < 1 {
            bail!("retrieval.remote_k must be >= 1");
        }
        if self.vector_db.collection.trim().is_empty() {
            bail!("vector_db.collection must not be empty");
        }
        match self.generation.provider.as_str() {
            "none" | "openai" | "gemini" | "ollama" => {}
            other => bail!(
                "Unknown generation provider: '{}'. Must be none, openai, gemini, or ollama.",
                other
            ),
        }
        Ok(())
    }

    /// A copy with every secret replaced, for display.
    pub fn redacted(&self) -> Config {
        let mut c = self.clone();
        let hide = |v: &mut Option<String>| {
            if v.is_some() {
                *v = Some(REDACTED.to_string());
            }
        };
        hide(&mut c.embedding.api_key);
        hide(&mut c.vector_db.api_key);
        hide(&mut c.generation.openai_api_key);
        hide(&mut c.generation.google_api_key);
        c
    }
}

/// Parse a config from TOML text without touching the environment.
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;
    config.validate()?;
    Ok(config)
}

/// Load the effective configuration.
///
/// An explicit `path` must exist. Without one, [`DEFAULT_CONFIG_PATH`] is
/// read if present, otherwise defaults are used. The process environment
/// is applied on top.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let mut config = match path {
        Some(p) => read_config_file(p)?,
        None => {
            let default = Path::new(DEFAULT_CONFIG_PATH);
            if default.exists() {
                read_config_file(default)?
            } else {
                tracing::debug!("no config file at {}, using defaults", DEFAULT_CONFIG_PATH);
                Config::default()
            }
        }
    };
    config.apply_process_env()?;
    config.validate()?;
    Ok(config)
}

fn read_config_file(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    toml::from_str(&content).with_context(|| "Failed to parse config file")
}
