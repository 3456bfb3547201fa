//! Storage abstractions for the catalog.
//!
//! Two independent stores back every tenant's catalog:
//!
//! | Trait | Role |
//! |-------|------|
//! | [`CatalogStore`] | Relational source of truth: tenants and variants keyed by `(tenant_id, sku)` |
//! | [`VectorIndex`] | Derived, rebuildable embedding index filtered by `metadata.tenant_id` |
//!
//! Implementations must be `Send + Sync` to work with async runtimes.
//! Both traits return `anyhow::Result`; the orchestrator and retrieval
//! service classify failures into typed errors.

pub mod memory;

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{ProductVariant, Tenant, VectorHit, VectorRecord};

/// Outcome of a relational catalog write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogWrite {
    pub tenant_created: bool,
    pub upserted: usize,
}

/// Fingerprint of a stored vector, used to skip unchanged records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredHash {
    pub content_hash: String,
    pub model: String,
}

/// Relational store for tenants and their product variants.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Create the tenant if absent. Returns `true` when it was created.
    /// An existing tenant's display name is never changed.
    async fn ensure_tenant(&self, tenant_id: &str, display_name: Option<&str>) -> Result<bool>;

    async fn get_tenant(&self, tenant_id: &str) -> Result<Option<Tenant>>;

    /// All tenants, ordered by `tenant_id`.
    async fn list_tenants(&self) -> Result<Vec<Tenant>>;

    /// Add `tokens` to the tenant's usage counter, creating the tenant when
    /// absent. Returns the new total.
    async fn record_token_usage(&self, tenant_id: &str, tokens: i64) -> Result<i64>;

    /// Ensure the tenant exists (named `display_name` if created) and upsert
    /// every variant keyed by `(tenant_id, sku)`.
    ///
    /// Atomic: on error nothing is written, including the tenant.
    async fn upsert_catalog(
        &self,
        tenant_id: &str,
        display_name: &str,
        variants: &[ProductVariant],
    ) -> Result<CatalogWrite>;

    async fn get_variant(&self, tenant_id: &str, sku: &str) -> Result<Option<ProductVariant>>;

    /// All of a tenant's variants, ordered by `sku`.
    async fn list_variants(&self, tenant_id: &str) -> Result<Vec<ProductVariant>>;

    async fn count_variants(&self, tenant_id: &str) -> Result<i64>;
}

/// Tenant-filterable nearest-neighbour index.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Insert or overwrite records by id, as a single write.
    async fn upsert(&self, records: &[VectorRecord]) -> Result<()>;

    /// Top-`limit` records of `tenant_id` embedded with `model`, ordered by
    /// cosine similarity descending, ties by sku ascending.
    async fn query(
        &self,
        tenant_id: &str,
        model: &str,
        query_vec: &[f32],
        limit: usize,
    ) -> Result<Vec<VectorHit>>;

    /// Stored fingerprints for whichever of `ids` exist under `tenant_id`.
    async fn stored_hashes(
        &self,
        tenant_id: &str,
        ids: &[String],
    ) -> Result<HashMap<String, StoredHash>>;

    /// Delete every record of `tenant_id` and write `records` in their place.
    /// Returns the number of records removed.
    async fn replace_tenant(&self, tenant_id: &str, records: &[VectorRecord]) -> Result<u64>;

    async fn count(&self, tenant_id: &str) -> Result<i64>;
}

/// The relational side of one ingestion or search call.
///
/// Ingestion continues vector-only when the store could not be reached;
/// retrieval then skips enrichment.
pub enum CatalogSession<'a> {
    Connected(&'a dyn CatalogStore),
    Unreachable(anyhow::Error),
}

impl<'a> CatalogSession<'a> {
    pub fn store(&self) -> Option<&'a dyn CatalogStore> {
        match self {
            CatalogSession::Connected(store) => Some(*store),
            CatalogSession::Unreachable(_) => None,
        }
    }
}

/// Order hits by score descending, then sku ascending, and keep `limit`.
pub fn rank_hits(hits: &mut Vec<VectorHit>, limit: usize) {
    hits.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.metadata.sku.cmp(&b.metadata.sku))
    });
    hits.truncate(limit);
}
