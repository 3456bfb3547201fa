//! Embedding provider trait and vector utilities.
//!
//! [`EmbeddingProvider`] is the seam between the catalog core and whatever
//! turns text into vectors. Providers are built once per process and shared
//! (`Arc<dyn EmbeddingProvider>`) by ingestion and retrieval, which is what
//! keeps catalog vectors and query vectors in the same embedding space.
//!
//! Concrete providers (OpenAI, Ollama, fastembed) live in the
//! `storefront-catalog` app crate.

use anyhow::{bail, Result};
use async_trait::async_trait;

/// Converts text into fixed-size vectors.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Returns the model identifier (e.g. `"text-embedding-3-small"`).
    fn model_name(&self) -> &str;

    /// Returns the embedding vector dimensionality (e.g. `1536`), or `0`
    /// when unknown.
    fn dims(&self) -> usize;

    /// `false` for a provider that is configured off. Ingestion then skips
    /// the vector phase instead of failing.
    fn is_enabled(&self) -> bool {
        true
    }

    /// Embed a batch of texts, returning one vector per input, in order.
    async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Embed a single query text.
pub async fn embed_query(provider: &dyn EmbeddingProvider, text: &str) -> Result<Vec<f32>> {
    let vectors = embed_batches(provider, &[text.to_string()], 1).await?;
    vectors
        .into_iter()
        .next()
        .ok_or_else(|| anyhow::anyhow!("Empty embedding response"))
}

/// Embed `texts` in batches of at most `batch_size`, checking that the
/// provider returned exactly one vector of the advertised size per input.
pub async fn embed_batches(
    provider: &dyn EmbeddingProvider,
    texts: &[String],
    batch_size: usize,
) -> Result<Vec<Vec<f32>>> {
    let mut out = Vec::with_capacity(texts.len());

    for batch in texts.chunks(batch_size.max(1)) {
        let vectors = provider.embed_texts(batch).await?;
        if vectors.len() != batch.len() {
            bail!(
                "embedding provider '{}' returned {} vectors for {} texts",
                provider.model_name(),
                vectors.len(),
                batch.len()
            );
        }
        let dims = provider.dims();
        if let Some(bad) = vectors.iter().find(|v| dims > 0 && v.len() != dims) {
            bail!(
                "embedding provider '{}' returned a {}-dimensional vector, expected {}",
                provider.model_name(),
                bad.len(),
                dims
            );
        }
        out.extend(vectors);
    }

    Ok(out)
}

/// A provider that is configured off. Every embedding call fails.
pub struct DisabledProvider;

#[async_trait]
impl EmbeddingProvider for DisabledProvider {
    fn model_name(&self) -> &str {
        "disabled"
    }

    fn dims(&self) -> usize {
        0
    }

    fn is_enabled(&self) -> bool {
        false
    }

    async fn embed_texts(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
        bail!("Embedding provider is disabled")
    }
}

/// Encode a vector as little-endian `f32` bytes for BLOB storage.
///
/// ```rust
/// use storefront_catalog_core::embedding::{blob_to_vec, vec_to_blob};
///
/// let v = vec![0.5f32, -1.0];
/// assert_eq!(blob_to_vec(&vec_to_blob(&v)), v);
/// ```
pub fn vec_to_blob(vec: &[f32]) -> Vec<u8> {
    vec.iter().flat_map(|v| v.to_le_bytes()).collect()
}

/// Decode a BLOB written by [`vec_to_blob`]. Trailing partial values are
/// ignored.
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect()
}

/// Cosine similarity in `[-1.0, 1.0]`.
///
/// Returns `0.0` for empty vectors, vectors of different lengths, and
/// zero-magnitude vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let (mut dot, mut norm_a, mut norm_b) = (0.0f32, 0.0f32, 0.0f32);
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }
    dot / denom
}
