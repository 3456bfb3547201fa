//! Core data models shared by ingestion and retrieval.
//!
//! These types represent tenants, the normalized sellable variants produced
//! from a catalog export, and the derived vector records that make them
//! searchable.

use serde::{Deserialize, Serialize};

/// An isolated merchant account. Every catalog row and vector is partitioned
/// by `tenant_id`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tenant {
    pub tenant_id: String,
    pub display_name: Option<String>,
    pub tokens_used: i64,
    /// Unix timestamp (seconds).
    pub created_at: i64,
}

/// A single `(name, value)` option of a variant, e.g. `Color = Red`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionPair {
    pub name: String,
    pub value: String,
}

impl OptionPair {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// A normalized sellable unit.
///
/// `(tenant_id, sku)` is unique in the relational store: re-ingesting the
/// same SKU for the same tenant replaces the stored record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductVariant {
    pub tenant_id: String,
    /// Grouping key shared by all variants of one base product.
    pub handle: String,
    pub sku: String,
    pub title: String,
    pub vendor: String,
    pub category: String,
    pub tags: String,
    pub description: String,
    /// Always finite and non-negative.
    pub price: f64,
    pub image_url: Option<String>,
    /// At most three pairs, in column order.
    pub option_pairs: Vec<OptionPair>,
    pub inventory_tracker: Option<String>,
    pub inventory_policy: Option<String>,
}

/// Metadata carried alongside every vector for tenant filtering and
/// re-hydration without a relational join.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorMetadata {
    pub tenant_id: String,
    pub sku: String,
    pub handle: String,
    pub title: String,
    pub price: f64,
    pub inventory_policy: Option<String>,
}

/// A derived, rebuildable search record; one per ingested variant.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorRecord {
    /// Deterministic id from `(tenant_id, sku)`; see [`crate::document::vector_id`].
    pub id: String,
    pub embedding: Vec<f32>,
    /// The rendered search document the embedding was computed from.
    pub document: String,
    pub metadata: VectorMetadata,
    /// Embedding model that produced `embedding`.
    pub model: String,
    /// SHA-256 over the document and metadata, used to skip re-embedding.
    pub content_hash: String,
}

/// A nearest-neighbour hit returned by a [`VectorIndex`](crate::store::VectorIndex).
#[derive(Debug, Clone, PartialEq)]
pub struct VectorHit {
    pub id: String,
    /// Cosine similarity in `[-1.0, 1.0]`.
    pub score: f64,
    pub document: String,
    pub metadata: VectorMetadata,
}

/// An enriched product returned to the search caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductSummary {
    pub title: String,
    pub sku: String,
    pub handle: String,
    pub price: f64,
    pub description_snippet: String,
    pub image_url: Option<String>,
    pub score: f64,
    /// `true` when live relational fields were attached to the hit.
    pub enriched: bool,
}

impl ProductSummary {
    /// One-line human readable rendering, as shown to the chat agent.
    pub fn render_line(&self) -> String {
        format!("- {} (SKU: {}) - ${:.2}", self.title, self.sku, self.price)
    }
}
