//! Text generation backends.
//!
//! One [`Generator`] trait with a backend per provider:
//!
//! - **OpenAI**: `POST {base}/chat/completions` (system + user messages)
//! - **Gemini**: `POST .../models/{model}:generateContent`
//! - **Ollama**: `POST {ollama_url}/api/generate` with `stream: false`
//! - **Disabled**: never available
//!
//! [`complete`] is the only entry point callers need. It never fails: when
//! the backend is unavailable or errors, the first 800 characters of the
//! user prompt are returned instead, tagged with the error if there was
//! one.

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;

use designpack_rag_core::chunk::truncate_chars;

use crate::config::GenerationConfig;

/// Characters of the user prompt echoed back by [`fallback_text`].
pub const FALLBACK_CHARS: usize = 800;

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

#[async_trait]
pub trait Generator: Send + Sync {
    /// Provider name (`openai`, `gemini`, `ollama`, `none`).
    fn name(&self) -> &str;

    /// Whether the backend has what it needs to attempt a request.
    fn available(&self) -> bool;

    async fn generate(&self, system: &str, user: &str, max_tokens: u32) -> Result<String>;
}

/// Run `generator`, substituting [`fallback_text`] on any failure.
pub async fn complete(generator: &dyn Generator, system: &str, user: &str, max_tokens: u32) -> String {
    if !generator.available() {
        return fallback_text(user, None);
    }
    match generator.generate(system, user, max_tokens).await {
        Ok(text) => text,
        Err(e) => {
            tracing::warn!(provider = generator.name(), "generation failed: {:#}", e);
            fallback_text(user, Some(&format!("{:#}", e)))
        }
    }
}

/// The first [`FALLBACK_CHARS`] characters of `user`, plus a
/// `[FALLBACK ...]` note when `err` is given.
pub fn fallback_text(user: &str, err: Option<&str>) -> String {
    let head = truncate_chars(user, FALLBACK_CHARS);
    match err {
        Some(e) if !e.is_empty() => format!("{}\n\n[FALLBACK {}]", head, e),
        _ => head.to_string(),
    }
}

pub struct DisabledGenerator;

#[async_trait]
impl Generator for DisabledGenerator {
    fn name(&self) -> &str {
        "none"
    }

    fn available(&self) -> bool {
        false
    }

    async fn generate(&self, _system: &str, _user: &str, _max_tokens: u32) -> Result<String> {
        bail!("no generation provider configured")
    }
}

pub struct OpenAIGenerator {
    client: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
    model: String,
}

impl OpenAIGenerator {
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        Ok(Self {
            client: http_client(config)?,
            api_key: config.openai_api_key.clone(),
            base_url: config.openai_base_url.trim_end_matches('/').to_string(),
            model: config.resolved_model().to_string(),
        })
    }
}

#[async_trait]
impl Generator for OpenAIGenerator {
    fn name(&self) -> &str {
        "openai"
    }

    fn available(&self) -> bool {
        self.api_key.is_some()
    }

    async fn generate(&self, system: &str, user: &str, max_tokens: u32) -> Result<String> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| anyhow!("OPENAI_API_KEY not set"))?;
        let body = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": user},
            ],
            "temperature": 0.2,
            "max_tokens": max_tokens,
        });
        let json = post_json(
            self.client
                .post(format!("{}/chat/completions", self.base_url))
                .bearer_auth(api_key)
                .json(&body),
        )
        .await?;
        parse_openai_chat(&json)
    }
}

pub struct GeminiGenerator {
    client: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
    model: String,
}

impl GeminiGenerator {
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        Ok(Self {
            client: http_client(config)?,
            api_key: config.google_api_key.clone(),
            base_url: GEMINI_BASE_URL.to_string(),
            model: config.resolved_model().to_string(),
        })
    }

    /// Point at a different API root.
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl Generator for GeminiGenerator {
    fn name(&self) -> &str {
        "gemini"
    }

    fn available(&self) -> bool {
        self.api_key.is_some()
    }

    async fn generate(&self, system: &str, user: &str, max_tokens: u32) -> Result<String> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| anyhow!("GOOGLE_API_KEY not set"))?;
        let body = json!({
            "contents": [{
                "role": "user",
                "parts": [{"text": system}, {"text": user}],
            }],
            "generationConfig": {"maxOutputTokens": max_tokens},
        });
        let json = post_json(
            self.client
                .post(format!(
                    "{}/models/{}:generateContent",
                    self.base_url, self.model
                ))
                .query(&[("key", api_key)])
                .json(&body),
        )
        .await?;
        parse_gemini(&json)
    }
}

pub struct OllamaGenerator {
    client: reqwest::Client,
    url: String,
    model: String,
}

impl OllamaGenerator {
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        Ok(Self {
            client: http_client(config)?,
            url: config.ollama_url.trim_end_matches('/').to_string(),
            model: config.resolved_model().to_string(),
        })
    }
}

#[async_trait]
impl Generator for OllamaGenerator {
    fn name(&self) -> &str {
        "ollama"
    }

    // A local server needs no credentials; reachability is only known by trying.
    fn available(&self) -> bool {
        true
    }

    async fn generate(&self, system: &str, user: &str, max_tokens: u32) -> Result<String> {
        let body = json!({
            "model": self.model,
            "prompt": format!("{}\n\n{}", system, user),
            "stream": false,
            "options": {"num_predict": max_tokens},
        });
        let json = post_json(
            self.client
                .post(format!("{}/api/generate", self.url))
                .json(&body),
        )
        .await?;
        Ok(json
            .get("response")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .trim()
            .to_string())
    }
}

fn http_client(config: &GenerationConfig) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?)
}

async fn post_json(request: reqwest::RequestBuilder) -> Result<Value> {
    let response = request.send().await?;
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        bail!("HTTP {}: {}", status, body);
    }
    Ok(response.json().await?)
}

fn parse_openai_chat(json: &Value) -> Result<String> {
    json.pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| anyhow!("Invalid chat response: missing choices[0].message.content"))
}

fn parse_gemini(json: &Value) -> Result<String> {
    let parts = json
        .pointer("/candidates/0/content/parts")
        .and_then(Value::as_array)
        .ok_or_else(|| anyhow!("Invalid Gemini response: missing candidates[0].content.parts"))?;
    Ok(parts
        .iter()
        .filter_map(|p| p.get("text").and_then(Value::as_str))
        .collect::<Vec<_>>()
        .join(""))
}

/// Build the backend named by `config.provider`. Unknown names disable
/// generation.
pub fn create_generator(config: &GenerationConfig) -> Result<Box<dyn Generator>> {
    let generator: Box<dyn Generator> = match config.provider.as_str() {
        "openai" => Box::new(OpenAIGenerator::new(config)?),
        "gemini" => Box::new(GeminiGenerator::new(config)?),
        "ollama" => Box::new(OllamaGenerator::new(config)?),
        _ => Box::new(DisabledGenerator),
    };
    tracing::debug!(
        provider = generator.name(),
        model = config.resolved_model(),
        available = generator.available(),
        "generation backend selected"
    );
    Ok(generator)
}
