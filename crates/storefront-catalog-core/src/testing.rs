//! Deterministic providers and failing stores shared by unit tests and,
//! through the `test-util` feature, by dependent crates' integration tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{bail, Result};
use async_trait::async_trait;

use crate::embedding::EmbeddingProvider;
use crate::models::{ProductVariant, Tenant, VectorHit, VectorRecord};
use crate::store::{CatalogStore, CatalogWrite, StoredHash, VectorIndex};
use crate::table::RawTable;

const VOCAB: [&str; 8] = ["red", "blue", "green", "shirt", "hat", "mug", "cotton", "wool"];

/// Bag-of-words embedder over a tiny vocabulary. Counts calls and texts.
#[derive(Default)]
pub struct KeywordEmbedder {
    pub calls: AtomicUsize,
    pub texts: AtomicUsize,
}

impl KeywordEmbedder {
    pub fn texts_embedded(&self) -> usize {
        self.texts.load(Ordering::SeqCst)
    }

    pub fn vector(text: &str) -> Vec<f32> {
        let lower = text.to_lowercase();
        let words: Vec<&str> = lower
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .collect();
        let mut v: Vec<f32> = VOCAB
            .iter()
            .map(|term| words.iter().filter(|w| *w == term).count() as f32)
            .collect();
        v.push(0.1);
        v
    }
}

#[async_trait]
impl EmbeddingProvider for KeywordEmbedder {
    fn model_name(&self) -> &str {
        "keyword-test"
    }

    fn dims(&self) -> usize {
        VOCAB.len() + 1
    }

    async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.texts.fetch_add(texts.len(), Ordering::SeqCst);
        Ok(texts.iter().map(|t| Self::vector(t)).collect())
    }
}

pub struct FailingEmbedder;

#[async_trait]
impl EmbeddingProvider for FailingEmbedder {
    fn model_name(&self) -> &str {
        "keyword-test"
    }

    fn dims(&self) -> usize {
        VOCAB.len() + 1
    }

    async fn embed_texts(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
        bail!("provider returned 503 Service Unavailable")
    }
}

/// Relational store whose every call fails.
pub struct FailingCatalogStore;

#[async_trait]
impl CatalogStore for FailingCatalogStore {
    async fn ensure_tenant(&self, _tenant_id: &str, _display_name: Option<&str>) -> Result<bool> {
        bail!("disk I/O error")
    }

    async fn get_tenant(&self, _tenant_id: &str) -> Result<Option<Tenant>> {
        bail!("disk I/O error")
    }

    async fn list_tenants(&self) -> Result<Vec<Tenant>> {
        bail!("disk I/O error")
    }

    async fn record_token_usage(&self, _tenant_id: &str, _tokens: i64) -> Result<i64> {
        bail!("disk I/O error")
    }

    async fn upsert_catalog(
        &self,
        _tenant_id: &str,
        _display_name: &str,
        _variants: &[ProductVariant],
    ) -> Result<CatalogWrite> {
        bail!("disk I/O error")
    }

    async fn get_variant(&self, _tenant_id: &str, _sku: &str) -> Result<Option<ProductVariant>> {
        bail!("disk I/O error")
    }

    async fn list_variants(&self, _tenant_id: &str) -> Result<Vec<ProductVariant>> {
        bail!("disk I/O error")
    }

    async fn count_variants(&self, _tenant_id: &str) -> Result<i64> {
        bail!("disk I/O error")
    }
}

/// Vector index whose every call fails.
pub struct FailingIndex;

#[async_trait]
impl VectorIndex for FailingIndex {
    async fn upsert(&self, _records: &[VectorRecord]) -> Result<()> {
        bail!("vector database is locked")
    }

    async fn query(
        &self,
        _tenant_id: &str,
        _model: &str,
        _query_vec: &[f32],
        _limit: usize,
    ) -> Result<Vec<VectorHit>> {
        bail!("vector database is locked")
    }

    async fn stored_hashes(
        &self,
        _tenant_id: &str,
        _ids: &[String],
    ) -> Result<HashMap<String, StoredHash>> {
        bail!("vector database is locked")
    }

    async fn replace_tenant(&self, _tenant_id: &str, _records: &[VectorRecord]) -> Result<u64> {
        bail!("vector database is locked")
    }

    async fn count(&self, _tenant_id: &str) -> Result<i64> {
        bail!("vector database is locked")
    }
}

pub fn table(csv: &str) -> RawTable {
    RawTable::from_csv_bytes(csv.as_bytes()).unwrap()
}

/// Two shirt variants sharing one handle; the second row relies on
/// forward-fill for its title.
pub fn shirt_table() -> RawTable {
    table(
        "Handle,Title,Vendor,Option1 Name,Option1 Value,Variant SKU,Variant Price,SEO Description\n\
         shirt,Red Cotton Shirt,Acme,Size,M,SHRT-M,19.99,A red cotton shirt\n\
         shirt,,,Size,L,SHRT-L,21.99,\n",
    )
}
