//! TOML configuration.
//!
//! Every section except `[db]` and `[vector]` is optional. See
//! `config/catalog.example.toml` for a complete file.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use storefront_catalog_core::ingest::IngestOptions;
use storefront_catalog_core::search::SearchParams;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    pub vector: VectorConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

/// Relational catalog database.
#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

/// Vector index database, opened once per process.
#[derive(Debug, Deserialize, Clone)]
pub struct VectorConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Base URL, used by the Ollama provider.
    #[serde(default)]
    pub url: Option<String>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            dims: None,
            batch_size: default_batch_size(),
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
            url: None,
        }
    }
}

fn default_provider() -> String {
    "disabled".to_string()
}
fn default_batch_size() -> usize {
    64
}
fn default_max_retries() -> u32 {
    5
}
fn default_timeout_secs() -> u64 {
    30
}

impl EmbeddingConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_limit")]
    pub default_limit: usize,
    #[serde(default = "default_max_limit")]
    pub max_limit: usize,
    #[serde(default = "default_snippet_chars")]
    pub snippet_chars: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            max_limit: default_max_limit(),
            snippet_chars: default_snippet_chars(),
        }
    }
}

fn default_limit() -> usize {
    3
}
fn default_max_limit() -> usize {
    20
}
fn default_snippet_chars() -> usize {
    240
}

#[derive(Debug, Deserialize, Clone)]
pub struct IngestConfig {
    #[serde(default = "default_store_name")]
    pub default_store_name: String,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            default_store_name: default_store_name(),
        }
    }
}

fn default_store_name() -> String {
    "My Store".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Largest accepted catalog upload, in bytes.
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:7341".to_string()
}
fn default_max_upload_bytes() -> usize {
    64 * 1024 * 1024
}

impl Config {
    pub fn search_params(&self) -> SearchParams {
        SearchParams {
            default_limit: self.retrieval.default_limit,
            max_limit: self.retrieval.max_limit,
            snippet_chars: self.retrieval.snippet_chars,
        }
    }

    pub fn ingest_options(&self) -> IngestOptions {
        IngestOptions {
            batch_size: self.embedding.batch_size,
            default_store_name: self.ingest.default_store_name.clone(),
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    let retrieval = &config.retrieval;
    if retrieval.default_limit < 1 {
        bail!("retrieval.default_limit must be >= 1");
    }
    if retrieval.max_limit < retrieval.default_limit {
        bail!("retrieval.max_limit must be >= retrieval.default_limit");
    }
    if retrieval.snippet_chars == 0 {
        bail!("retrieval.snippet_chars must be > 0");
    }

    if config.embedding.batch_size == 0 {
        bail!("embedding.batch_size must be > 0");
    }

    match config.embedding.provider.as_str() {
        "disabled" | "openai" | "ollama" | "local" => {}
        other => bail!(
            "Unknown embedding provider: '{}'. Must be disabled, openai, ollama, or local.",
            other
        ),
    }

    // The local provider has per-model defaults for both.
    if config.embedding.is_enabled() && config.embedding.provider != "local" {
        if config.embedding.dims.unwrap_or(0) == 0 {
            bail!(
                "embedding.dims must be > 0 when provider is '{}'",
                config.embedding.provider
            );
        }
        if config.embedding.model.is_none() {
            bail!(
                "embedding.model must be specified when provider is '{}'",
                config.embedding.provider
            );
        }
    }

    if config.ingest.default_store_name.trim().is_empty() {
        bail!("ingest.default_store_name must not be blank");
    }

    if config.server.max_upload_bytes == 0 {
        bail!("server.max_upload_bytes must be > 0");
    }

    Ok(())
}
