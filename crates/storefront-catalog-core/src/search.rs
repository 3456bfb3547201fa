//! Tenant-filtered semantic search with live relational enrichment.
//!
//! # Pipeline
//!
//! ```text
//! query ──▶ embed ──▶ VectorIndex::query(tenant, model) ──▶ enrich from CatalogStore ──▶ ProductSummary
//! ```
//!
//! Prices and titles in the vector index can be stale; when a relational
//! session is available each hit is re-read by `(tenant_id, sku)`. Missing
//! rows and enrichment failures fall back to the vector metadata.

use serde::Serialize;
use tracing::{debug, warn};

use crate::embedding::{embed_query, EmbeddingProvider};
use crate::error::RetrievalError;
use crate::models::{ProductSummary, VectorHit};
use crate::store::{CatalogSession, CatalogStore, VectorIndex};

/// Shown to the agent when nothing matched.
pub const NO_MATCHES_MESSAGE: &str = "No products found matching that description.";

/// Retrieval tunables.
#[derive(Debug, Clone, Copy)]
pub struct SearchParams {
    pub default_limit: usize,
    pub max_limit: usize,
    pub snippet_chars: usize,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            default_limit: 3,
            max_limit: 20,
            snippet_chars: 240,
        }
    }
}

impl SearchParams {
    /// `requested`, or the default, clamped into `[1, max_limit]`.
    pub fn effective_limit(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.default_limit)
            .clamp(1, self.max_limit.max(1))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", content = "results", rename_all = "snake_case")]
pub enum SearchOutcome {
    Matches(Vec<ProductSummary>),
    NoMatches,
}

impl SearchOutcome {
    pub fn results(&self) -> &[ProductSummary] {
        match self {
            SearchOutcome::Matches(items) => items,
            SearchOutcome::NoMatches => &[],
        }
    }

    /// Human-readable rendering: one line per product, or
    /// [`NO_MATCHES_MESSAGE`].
    pub fn render(&self) -> String {
        match self {
            SearchOutcome::Matches(items) => items
                .iter()
                .map(ProductSummary::render_line)
                .collect::<Vec<_>>()
                .join("\n"),
            SearchOutcome::NoMatches => NO_MATCHES_MESSAGE.to_string(),
        }
    }
}

/// Search `tenant_id`'s catalog for `query`.
///
/// A blank query returns [`SearchOutcome::NoMatches`] without calling the
/// embedding provider.
///
/// # Errors
///
/// [`RetrievalError::Embedding`] when the query cannot be embedded and
/// [`RetrievalError::Index`] when the vector index query fails. Neither is
/// ever reported as `NoMatches`.
pub async fn search_catalog(
    session: &CatalogSession<'_>,
    index: &dyn VectorIndex,
    embedder: &dyn EmbeddingProvider,
    params: &SearchParams,
    tenant_id: &str,
    query: &str,
    limit: Option<usize>,
) -> Result<SearchOutcome, RetrievalError> {
    let query = query.trim();
    if query.is_empty() {
        return Ok(SearchOutcome::NoMatches);
    }
    let limit = params.effective_limit(limit);

    let query_vec = embed_query(embedder, query)
        .await
        .map_err(RetrievalError::Embedding)?;

    let hits = index
        .query(tenant_id, embedder.model_name(), &query_vec, limit)
        .await
        .map_err(RetrievalError::Index)?;

    debug!(tenant_id, limit, hits = hits.len(), "vector query complete");

    if hits.is_empty() {
        return Ok(SearchOutcome::NoMatches);
    }

    let mut results = Vec::with_capacity(hits.len());
    for hit in hits {
        results.push(enrich(session.store(), tenant_id, hit, params.snippet_chars).await);
    }
    Ok(SearchOutcome::Matches(results))
}

async fn enrich(
    store: Option<&dyn CatalogStore>,
    tenant_id: &str,
    hit: VectorHit,
    snippet_chars: usize,
) -> ProductSummary {
    let live = match store {
        Some(store) => match store.get_variant(tenant_id, &hit.metadata.sku).await {
            Ok(found) => found,
            Err(err) => {
                warn!(
                    tenant_id,
                    sku = %hit.metadata.sku,
                    error = %format!("{:#}", err),
                    "enrichment failed; using vector metadata"
                );
                None
            }
        },
        None => None,
    };

    match live {
        Some(v) => {
            let source = if v.description.trim().is_empty() {
                hit.document.as_str()
            } else {
                v.description.as_str()
            };
            ProductSummary {
                description_snippet: snippet(source, snippet_chars),
                title: v.title,
                sku: v.sku,
                handle: v.handle,
                price: v.price,
                image_url: v.image_url,
                score: hit.score,
                enriched: true,
            }
        }
        None => ProductSummary {
            description_snippet: snippet(&hit.document, snippet_chars),
            title: hit.metadata.title,
            sku: hit.metadata.sku,
            handle: hit.metadata.handle,
            price: hit.metadata.price,
            image_url: None,
            score: hit.score,
            enriched: false,
        },
    }
}

fn snippet(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
