//! In-memory [`CatalogStore`] and [`VectorIndex`] implementations for tests
//! and embedding the core without a database.
//!
//! State lives in `BTreeMap`s behind `std::sync::RwLock`. Vector queries are
//! brute-force cosine similarity over the tenant's records.

use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::embedding::cosine_similarity;
use crate::models::{ProductVariant, Tenant, VectorHit, VectorRecord};

use super::{rank_hits, CatalogStore, CatalogWrite, StoredHash, VectorIndex};

fn read<T>(lock: &RwLock<T>) -> Result<RwLockReadGuard<'_, T>> {
    lock.read().map_err(|_| anyhow!("in-memory store lock poisoned"))
}

fn write<T>(lock: &RwLock<T>) -> Result<RwLockWriteGuard<'_, T>> {
    lock.write().map_err(|_| anyhow!("in-memory store lock poisoned"))
}

fn new_tenant(tenant_id: &str, display_name: Option<&str>) -> Tenant {
    Tenant {
        tenant_id: tenant_id.to_string(),
        display_name: display_name.map(str::to_string),
        tokens_used: 0,
        created_at: chrono::Utc::now().timestamp(),
    }
}

/// Relational catalog held in memory.
#[derive(Default)]
pub struct InMemoryCatalogStore {
    tenants: RwLock<BTreeMap<String, Tenant>>,
    variants: RwLock<BTreeMap<(String, String), ProductVariant>>,
}

impl InMemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CatalogStore for InMemoryCatalogStore {
    async fn ensure_tenant(&self, tenant_id: &str, display_name: Option<&str>) -> Result<bool> {
        let mut tenants = write(&self.tenants)?;
        if tenants.contains_key(tenant_id) {
            return Ok(false);
        }
        tenants.insert(tenant_id.to_string(), new_tenant(tenant_id, display_name));
        Ok(true)
    }

    async fn get_tenant(&self, tenant_id: &str) -> Result<Option<Tenant>> {
        Ok(read(&self.tenants)?.get(tenant_id).cloned())
    }

    async fn list_tenants(&self) -> Result<Vec<Tenant>> {
        Ok(read(&self.tenants)?.values().cloned().collect())
    }

    async fn record_token_usage(&self, tenant_id: &str, tokens: i64) -> Result<i64> {
        let mut tenants = write(&self.tenants)?;
        let tenant = tenants
            .entry(tenant_id.to_string())
            .or_insert_with(|| new_tenant(tenant_id, None));
        tenant.tokens_used += tokens;
        Ok(tenant.tokens_used)
    }

    async fn upsert_catalog(
        &self,
        tenant_id: &str,
        display_name: &str,
        variants: &[ProductVariant],
    ) -> Result<CatalogWrite> {
        // Both locks held for the whole write so readers never see a
        // partially applied batch.
        let mut tenants = write(&self.tenants)?;
        let mut stored = write(&self.variants)?;

        if let Some(bad) = variants.iter().find(|v| v.tenant_id != tenant_id) {
            return Err(anyhow!(
                "variant '{}' belongs to tenant '{}', not '{}'",
                bad.sku,
                bad.tenant_id,
                tenant_id
            ));
        }

        let tenant_created = !tenants.contains_key(tenant_id);
        if tenant_created {
            tenants.insert(
                tenant_id.to_string(),
                new_tenant(tenant_id, Some(display_name)),
            );
        }

        for v in variants {
            stored.insert((tenant_id.to_string(), v.sku.clone()), v.clone());
        }

        Ok(CatalogWrite {
            tenant_created,
            upserted: variants.len(),
        })
    }

    async fn get_variant(&self, tenant_id: &str, sku: &str) -> Result<Option<ProductVariant>> {
        Ok(read(&self.variants)?
            .get(&(tenant_id.to_string(), sku.to_string()))
            .cloned())
    }

    async fn list_variants(&self, tenant_id: &str) -> Result<Vec<ProductVariant>> {
        Ok(read(&self.variants)?
            .iter()
            .filter(|((t, _), _)| t == tenant_id)
            .map(|(_, v)| v.clone())
            .collect())
    }

    async fn count_variants(&self, tenant_id: &str) -> Result<i64> {
        Ok(read(&self.variants)?
            .keys()
            .filter(|(t, _)| t == tenant_id)
            .count() as i64)
    }
}

/// Vector index held in memory, keyed by record id.
#[derive(Default)]
pub struct InMemoryVectorIndex {
    records: RwLock<BTreeMap<String, VectorRecord>>,
}

impl InMemoryVectorIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every stored record.
    pub fn records(&self) -> Result<Vec<VectorRecord>> {
        Ok(read(&self.records)?.values().cloned().collect())
    }

    /// Drop every record of `tenant_id`.
    pub fn clear_tenant(&self, tenant_id: &str) -> Result<usize> {
        let mut records = write(&self.records)?;
        let before = records.len();
        records.retain(|_, r| r.metadata.tenant_id != tenant_id);
        Ok(before - records.len())
    }
}

#[async_trait]
impl VectorIndex for InMemoryVectorIndex {
    async fn upsert(&self, records: &[VectorRecord]) -> Result<()> {
        let mut stored = write(&self.records)?;
        for r in records {
            stored.insert(r.id.clone(), r.clone());
        }
        Ok(())
    }

    async fn query(
        &self,
        tenant_id: &str,
        model: &str,
        query_vec: &[f32],
        limit: usize,
    ) -> Result<Vec<VectorHit>> {
        let stored = read(&self.records)?;
        let mut hits: Vec<VectorHit> = stored
            .values()
            .filter(|r| r.metadata.tenant_id == tenant_id && r.model == model)
            .map(|r| VectorHit {
                id: r.id.clone(),
                score: cosine_similarity(query_vec, &r.embedding) as f64,
                document: r.document.clone(),
                metadata: r.metadata.clone(),
            })
            .collect();
        rank_hits(&mut hits, limit);
        Ok(hits)
    }

    async fn stored_hashes(
        &self,
        tenant_id: &str,
        ids: &[String],
    ) -> Result<HashMap<String, StoredHash>> {
        let stored = read(&self.records)?;
        Ok(ids
            .iter()
            .filter_map(|id| stored.get(id))
            .filter(|r| r.metadata.tenant_id == tenant_id)
            .map(|r| {
                (
                    r.id.clone(),
                    StoredHash {
                        content_hash: r.content_hash.clone(),
                        model: r.model.clone(),
                    },
                )
            })
            .collect())
    }

    async fn replace_tenant(&self, tenant_id: &str, records: &[VectorRecord]) -> Result<u64> {
        let mut stored = write(&self.records)?;
        let before = stored.len();
        stored.retain(|_, r| r.metadata.tenant_id != tenant_id);
        let removed = (before - stored.len()) as u64;
        for r in records {
            stored.insert(r.id.clone(), r.clone());
        }
        Ok(removed)
    }

    async fn count(&self, tenant_id: &str) -> Result<i64> {
        Ok(read(&self.records)?
            .values()
            .filter(|r| r.metadata.tenant_id == tenant_id)
            .count() as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::VectorMetadata;

    fn variant(tenant: &str, sku: &str, price: f64) -> ProductVariant {
        ProductVariant {
            tenant_id: tenant.to_string(),
            handle: "h".to_string(),
            sku: sku.to_string(),
            title: "T".to_string(),
            vendor: String::new(),
            category: String::new(),
            tags: String::new(),
            description: String::new(),
            price,
            image_url: None,
            option_pairs: Vec::new(),
            inventory_tracker: None,
            inventory_policy: None,
        }
    }

    fn record(tenant: &str, sku: &str, model: &str, embedding: Vec<f32>) -> VectorRecord {
        VectorRecord {
            id: crate::document::vector_id(tenant, sku),
            embedding,
            document: format!("doc {sku}"),
            metadata: VectorMetadata {
                tenant_id: tenant.to_string(),
                sku: sku.to_string(),
                handle: "h".to_string(),
                title: "T".to_string(),
                price: 1.0,
                inventory_policy: None,
            },
            model: model.to_string(),
            content_hash: format!("hash-{sku}"),
        }
    }

    #[tokio::test]
    async fn test_upsert_catalog_creates_tenant_once() {
        let store = InMemoryCatalogStore::new();
        let w1 = store
            .upsert_catalog("t1", "Acme", &[variant("t1", "A", 1.0)])
            .await
            .unwrap();
        let w2 = store
            .upsert_catalog("t1", "Other", &[variant("t1", "A", 2.0)])
            .await
            .unwrap();
        assert!(w1.tenant_created);
        assert!(!w2.tenant_created);

        let tenant = store.get_tenant("t1").await.unwrap().unwrap();
        assert_eq!(tenant.display_name.as_deref(), Some("Acme"));
        assert_eq!(store.count_variants("t1").await.unwrap(), 1);
        let v = store.get_variant("t1", "A").await.unwrap().unwrap();
        assert_eq!(v.price, 2.0);
    }

    #[tokio::test]
    async fn test_upsert_catalog_rejects_foreign_variants_atomically() {
        let store = InMemoryCatalogStore::new();
        let err = store
            .upsert_catalog("t1", "Acme", &[variant("t1", "A", 1.0), variant("t2", "B", 1.0)])
            .await;
        assert!(err.is_err());
        assert!(store.get_tenant("t1").await.unwrap().is_none());
        assert_eq!(store.count_variants("t1").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_record_token_usage_accumulates() {
        let store = InMemoryCatalogStore::new();
        assert_eq!(store.record_token_usage("t1", 10).await.unwrap(), 10);
        assert_eq!(store.record_token_usage("t1", 5).await.unwrap(), 15);
        let tenant = store.get_tenant("t1").await.unwrap().unwrap();
        assert_eq!(tenant.tokens_used, 15);
        assert!(tenant.display_name.is_none());
    }

    #[tokio::test]
    async fn test_query_filters_tenant_and_model() {
        let index = InMemoryVectorIndex::new();
        index
            .upsert(&[
                record("t1", "A", "m", vec![1.0, 0.0]),
                record("t2", "B", "m", vec![1.0, 0.0]),
                record("t1", "C", "other", vec![1.0, 0.0]),
            ])
            .await
            .unwrap();

        let hits = index.query("t1", "m", &[1.0, 0.0], 10).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].metadata.sku, "A");
    }

    #[tokio::test]
    async fn test_replace_tenant_leaves_other_tenants() {
        let index = InMemoryVectorIndex::new();
        index
            .upsert(&[
                record("t1", "A", "m", vec![1.0]),
                record("t1", "B", "m", vec![1.0]),
                record("t2", "A", "m", vec![1.0]),
            ])
            .await
            .unwrap();

        let removed = index
            .replace_tenant("t1", &[record("t1", "Z", "m", vec![1.0])])
            .await
            .unwrap();
        assert_eq!(removed, 2);
        assert_eq!(index.count("t1").await.unwrap(), 1);
        assert_eq!(index.count("t2").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_stored_hashes_scoped_to_tenant() {
        let index = InMemoryVectorIndex::new();
        let r = record("t1", "A", "m", vec![1.0]);
        index.upsert(std::slice::from_ref(&r)).await.unwrap();

        let found = index.stored_hashes("t1", &[r.id.clone()]).await.unwrap();
        assert_eq!(found[&r.id].content_hash, "hash-A");
        let other = index.stored_hashes("t2", &[r.id.clone()]).await.unwrap();
        assert!(other.is_empty());
    }
}
