//! Embedding provider implementations.
//!
//! Concrete [`EmbeddingProvider`]s selected by `[embedding].provider`:
//! - **`disabled`**: [`DisabledProvider`]; ingestion stays relational-only.
//! - **`openai`**: [`OpenAIProvider`], `POST /v1/embeddings`.
//! - **`ollama`**: [`OllamaProvider`], `POST /api/embed` on a local Ollama.
//! - **`local`**: `LocalProvider`, fastembed inference (requires the
//!   `local-embeddings` feature).
//!
//! # Provider Selection
//!
//! ```rust,no_run
//! # use storefront_catalog::config::EmbeddingConfig;
//! # use storefront_catalog::embedding::create_provider;
//! let config = EmbeddingConfig::default(); // provider = "disabled"
//! let provider = create_provider(&config).unwrap();
//! assert_eq!(provider.model_name(), "disabled");
//! ```
//!
//! # Retry Strategy
//!
//! The HTTP providers retry transient failures with exponential backoff:
//! - HTTP 429 and 5xx → retry
//! - other 4xx → fail immediately
//! - network errors → retry
//! - backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5)

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use tracing::{debug, warn};

pub use storefront_catalog_core::embedding::{DisabledProvider, EmbeddingProvider};

use crate::config::EmbeddingConfig;

const OPENAI_EMBEDDINGS_URL: &str = "https://api.openai.com/v1/embeddings";
const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// Shared HTTP settings of the remote providers.
struct HttpSettings {
    client: reqwest::Client,
    max_retries: u32,
}

impl HttpSettings {
    fn new(config: &EmbeddingConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            max_retries: config.max_retries,
        })
    }

    /// POST `body` to `url`, retrying 429/5xx responses and network errors.
    async fn post_json(
        &self,
        label: &str,
        url: &str,
        bearer: Option<&str>,
        body: &serde_json::Value,
    ) -> Result<serde_json::Value> {
        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                debug!(provider = label, attempt, ?delay, "retrying embedding request");
                tokio::time::sleep(delay).await;
            }

            let mut request = self.client.post(url).json(body);
            if let Some(token) = bearer {
                request = request.bearer_auth(token);
            }

            match request.send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return Ok(response.json().await?);
                    }

                    let body_text = response.text().await.unwrap_or_default();
                    if status.as_u16() == 429 || status.is_server_error() {
                        warn!(provider = label, %status, attempt, "transient embedding API error");
                        last_err = Some(anyhow!("{} API error {}: {}", label, status, body_text));
                        continue;
                    }
                    bail!("{} API error {}: {}", label, status, body_text);
                }
                Err(e) => {
                    warn!(provider = label, attempt, error = %e, "embedding request failed");
                    last_err = Some(anyhow!("{} request to {} failed: {}", label, url, e));
                }
            }
        }

        Err(last_err.unwrap_or_else(|| anyhow!("{} embedding failed after retries", label)))
    }
}

fn json_vector(value: &serde_json::Value, label: &str) -> Result<Vec<f32>> {
    let items = value
        .as_array()
        .ok_or_else(|| anyhow!("Invalid {} response: embedding is not an array", label))?;
    items
        .iter()
        .map(|v| {
            v.as_f64()
                .map(|f| f as f32)
                .ok_or_else(|| anyhow!("Invalid {} response: non-numeric embedding value", label))
        })
        .collect()
}

// ============ OpenAI Provider ============

/// Embedding provider using the OpenAI API.
///
/// Requires the `OPENAI_API_KEY` environment variable.
pub struct OpenAIProvider {
    model: String,
    dims: usize,
    api_key: String,
    http: HttpSettings,
}

impl OpenAIProvider {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| anyhow!("embedding.model required for OpenAI provider"))?;
        let dims = config
            .dims
            .ok_or_else(|| anyhow!("embedding.dims required for OpenAI provider"))?;
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| anyhow!("OPENAI_API_KEY environment variable not set"))?;

        Ok(Self {
            model,
            dims,
            api_key,
            http: HttpSettings::new(config)?,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAIProvider {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let body = serde_json::json!({
            "model": self.model,
            "input": texts,
        });
        let json = self
            .http
            .post_json("OpenAI", OPENAI_EMBEDDINGS_URL, Some(&self.api_key), &body)
            .await?;
        parse_openai_response(&json)
    }
}

/// Extract `data[].embedding`, ordered by each item's `index`.
fn parse_openai_response(json: &serde_json::Value) -> Result<Vec<Vec<f32>>> {
    let data = json
        .get("data")
        .and_then(|d| d.as_array())
        .ok_or_else(|| anyhow!("Invalid OpenAI response: missing data array"))?;

    let mut indexed = Vec::with_capacity(data.len());
    for (position, item) in data.iter().enumerate() {
        let index = item
            .get("index")
            .and_then(|i| i.as_u64())
            .map(|i| i as usize)
            .unwrap_or(position);
        let embedding = item
            .get("embedding")
            .ok_or_else(|| anyhow!("Invalid OpenAI response: missing embedding"))?;
        indexed.push((index, json_vector(embedding, "OpenAI")?));
    }

    indexed.sort_by_key(|(index, _)| *index);
    Ok(indexed.into_iter().map(|(_, v)| v).collect())
}

// ============ Ollama Provider ============

/// Embedding provider using a local Ollama instance.
///
/// Requires an embedding model to be pulled, e.g. `ollama pull nomic-embed-text`.
pub struct OllamaProvider {
    model: String,
    dims: usize,
    url: String,
    http: HttpSettings,
}

impl OllamaProvider {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| anyhow!("embedding.model required for Ollama provider"))?;
        let dims = config
            .dims
            .ok_or_else(|| anyhow!("embedding.dims required for Ollama provider"))?;
        let url = config
            .url
            .clone()
            .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string());

        Ok(Self {
            model,
            dims,
            url: url.trim_end_matches('/').to_string(),
            http: HttpSettings::new(config)?,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaProvider {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let body = serde_json::json!({
            "model": self.model,
            "input": texts,
        });
        let json = self
            .http
            .post_json("Ollama", &format!("{}/api/embed", self.url), None, &body)
            .await?;
        parse_ollama_response(&json)
    }
}

fn parse_ollama_response(json: &serde_json::Value) -> Result<Vec<Vec<f32>>> {
    json.get("embeddings")
        .and_then(|e| e.as_array())
        .ok_or_else(|| anyhow!("Invalid Ollama response: missing embeddings array"))?
        .iter()
        .map(|e| json_vector(e, "Ollama"))
        .collect()
}

// ============ Local Provider (fastembed) ============

#[cfg(feature = "local-embeddings")]
mod local {
    use std::sync::{Arc, Mutex};

    use anyhow::{anyhow, bail, Result};
    use async_trait::async_trait;

    use super::EmbeddingProvider;
    use crate::config::EmbeddingConfig;

    /// Runs a fastembed model in-process. The model is downloaded from
    /// Hugging Face on first use and cached; later runs are offline.
    pub struct LocalProvider {
        model_name: String,
        dims: usize,
        batch_size: usize,
        model: Arc<Mutex<Option<fastembed::TextEmbedding>>>,
    }

    impl LocalProvider {
        pub fn new(config: &EmbeddingConfig) -> Result<Self> {
            let model_name = config
                .model
                .clone()
                .unwrap_or_else(|| "all-minilm-l6-v2".to_string());
            // Validate the name up front rather than on first embed.
            to_fastembed_model(&model_name)?;
            let dims = config.dims.unwrap_or(match model_name.as_str() {
                "bge-base-en-v1.5" | "nomic-embed-text-v1.5" | "multilingual-e5-base" => 768,
                "bge-large-en-v1.5" | "multilingual-e5-large" => 1024,
                _ => 384,
            });

            Ok(Self {
                model_name,
                dims,
                batch_size: config.batch_size,
                model: Arc::new(Mutex::new(None)),
            })
        }
    }

    fn to_fastembed_model(name: &str) -> Result<fastembed::EmbeddingModel> {
        match name {
            "all-minilm-l6-v2" => Ok(fastembed::EmbeddingModel::AllMiniLML6V2),
            "bge-small-en-v1.5" => Ok(fastembed::EmbeddingModel::BGESmallENV15),
            "bge-base-en-v1.5" => Ok(fastembed::EmbeddingModel::BGEBaseENV15),
            "bge-large-en-v1.5" => Ok(fastembed::EmbeddingModel::BGELargeENV15),
            "nomic-embed-text-v1.5" => Ok(fastembed::EmbeddingModel::NomicEmbedTextV15),
            "multilingual-e5-small" => Ok(fastembed::EmbeddingModel::MultilingualE5Small),
            "multilingual-e5-base" => Ok(fastembed::EmbeddingModel::MultilingualE5Base),
            "multilingual-e5-large" => Ok(fastembed::EmbeddingModel::MultilingualE5Large),
            other => bail!(
                "Unknown local embedding model: '{}'. Supported models: \
                 all-minilm-l6-v2, bge-small-en-v1.5, bge-base-en-v1.5, bge-large-en-v1.5, \
                 nomic-embed-text-v1.5, multilingual-e5-small, multilingual-e5-base, \
                 multilingual-e5-large",
                other
            ),
        }
    }

    #[async_trait]
    impl EmbeddingProvider for LocalProvider {
        fn model_name(&self) -> &str {
            &self.model_name
        }

        fn dims(&self) -> usize {
            self.dims
        }

        async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            let model = Arc::clone(&self.model);
            let model_name = self.model_name.clone();
            let batch_size = self.batch_size;
            let texts = texts.to_vec();

            tokio::task::spawn_blocking(move || {
                let mut guard = model
                    .lock()
                    .map_err(|_| anyhow!("local embedding model lock poisoned"))?;
                if guard.is_none() {
                    let loaded = fastembed::TextEmbedding::try_new(
                        fastembed::InitOptions::new(to_fastembed_model(&model_name)?)
                            .with_show_download_progress(false),
                    )
                    .map_err(|e| anyhow!("Failed to initialize local embedding model: {}", e))?;
                    *guard = Some(loaded);
                }
                let engine = guard
                    .as_mut()
                    .ok_or_else(|| anyhow!("local embedding model not loaded"))?;
                engine
                    .embed(texts, Some(batch_size))
                    .map_err(|e| anyhow!("Local embedding failed: {}", e))
            })
            .await?
        }
    }
}

#[cfg(feature = "local-embeddings")]
pub use local::LocalProvider;

/// Build the provider named by `[embedding].provider`.
///
/// | Config Value | Provider |
/// |-------------|----------|
/// | `"disabled"` | [`DisabledProvider`] |
/// | `"openai"` | [`OpenAIProvider`] |
/// | `"ollama"` | [`OllamaProvider`] |
/// | `"local"` | `LocalProvider` (feature `local-embeddings`) |
pub fn create_provider(config: &EmbeddingConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    match config.provider.as_str() {
        "disabled" => Ok(Arc::new(DisabledProvider)),
        "openai" => Ok(Arc::new(OpenAIProvider::new(config)?)),
        "ollama" => Ok(Arc::new(OllamaProvider::new(config)?)),
        #[cfg(feature = "local-embeddings")]
        "local" => Ok(Arc::new(LocalProvider::new(config)?)),
        #[cfg(not(feature = "local-embeddings"))]
        "local" => bail!("Local embedding provider requires --features local-embeddings"),
        other => bail!("Unknown embedding provider: {}", other),
    }
}
