//! Ingestion orchestrator and reindex.
//!
//! Ingesting a catalog file is one logical operation with two phases:
//!
//! 1. **Relational phase.** Normalized variants are upserted, together with
//!    the tenant row, in a single [`CatalogStore::upsert_catalog`] call. A
//!    failure here aborts the ingestion before any vector is written.
//! 2. **Vector phase.** Strictly after the relational commit, every variant
//!    is rendered into a search document, embedded, and written to the
//!    [`VectorIndex`] in one batch. Records whose content hash and model are
//!    unchanged are not re-embedded.
//!
//! When the relational store cannot be reached at all, the orchestrator
//! runs the vector phase alone and reports a [`DegradedModeWarning`]. A
//! disabled embedding provider skips the vector phase and reports the
//! number of pending vectors; [`reindex_tenant`] fills them in later.

use std::collections::HashMap;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::document::PendingVector;
use crate::embedding::{embed_batches, EmbeddingProvider};
use crate::error::{IngestError, ReindexError};
use crate::models::{ProductVariant, VectorRecord};
use crate::normalize::{normalize_catalog, NormalizeReport};
use crate::store::{CatalogSession, CatalogStore, StoredHash, VectorIndex};
use crate::table::RawTable;

/// Tunables for [`ingest_catalog`] and [`reindex_tenant`].
#[derive(Debug, Clone)]
pub struct IngestOptions {
    /// Maximum texts per embedding request.
    pub batch_size: usize,
    /// Display name for a new tenant whose first variant has no vendor.
    pub default_store_name: String,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            batch_size: 64,
            default_store_name: "My Store".to_string(),
        }
    }
}

/// The relational phase was skipped because the store was unreachable.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DegradedModeWarning {
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub tenant_id: String,
    /// Variants emitted by the normalizer and written to at least one store.
    pub processed_count: usize,
    pub normalize: NormalizeReport,
    pub tenant_created: bool,
    pub relational_written: usize,
    pub vectors_written: usize,
    pub vectors_unchanged: usize,
    /// Vectors not written because embeddings are disabled.
    pub vectors_pending: usize,
    pub degraded: Option<DegradedModeWarning>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReindexReport {
    pub tenant_id: String,
    pub variants: usize,
    pub vectors_written: usize,
    pub vectors_removed: u64,
}

/// Ingest one parsed catalog file for `tenant_id`.
///
/// # Errors
///
/// - [`IngestError::Validation`]: blank tenant id, or the normalizer
///   rejected the file. Nothing was written.
/// - [`IngestError::Persistence`]: the relational write failed and was
///   rolled back. No vectors were written.
/// - [`IngestError::Embedding`] / [`IngestError::VectorIndex`]: the vector
///   phase failed after the relational commit.
pub async fn ingest_catalog(
    session: CatalogSession<'_>,
    index: &dyn VectorIndex,
    embedder: &dyn EmbeddingProvider,
    options: &IngestOptions,
    tenant_id: &str,
    table: &RawTable,
) -> Result<IngestReport, IngestError> {
    if tenant_id.trim().is_empty() {
        return Err(IngestError::Validation("tenant id must not be blank".into()));
    }

    let catalog = normalize_catalog(table, tenant_id)?;
    let variants = catalog.variants;
    info!(
        tenant_id,
        rows = catalog.report.rows_total,
        filtered = catalog.report.rows_filtered,
        rejected = catalog.report.rows_rejected,
        emitted = catalog.report.emitted,
        "normalized catalog"
    );

    let mut report = IngestReport {
        tenant_id: tenant_id.to_string(),
        processed_count: 0,
        normalize: catalog.report,
        tenant_created: false,
        relational_written: 0,
        vectors_written: 0,
        vectors_unchanged: 0,
        vectors_pending: 0,
        degraded: None,
    };

    // Phase 1: relational.
    match session {
        CatalogSession::Connected(store) => {
            let display_name = variants
                .first()
                .map(|v| v.vendor.as_str())
                .filter(|vendor| !vendor.is_empty())
                .unwrap_or(&options.default_store_name);

            let write = store
                .upsert_catalog(tenant_id, display_name, &variants)
                .await
                .map_err(|cause| IngestError::Persistence {
                    tenant_id: tenant_id.to_string(),
                    cause,
                })?;

            if write.tenant_created {
                info!(tenant_id, display_name, "created tenant");
            }
            report.tenant_created = write.tenant_created;
            report.relational_written = write.upserted;
            info!(tenant_id, variants = write.upserted, "relational catalog committed");
        }
        CatalogSession::Unreachable(err) => {
            warn!(
                tenant_id,
                error = %format!("{:#}", err),
                "relational store unreachable; ingesting vectors only"
            );
            report.degraded = Some(DegradedModeWarning {
                reason: format!("relational store unreachable: {:#}", err),
            });
        }
    }

    // Phase 2: vectors.
    if !embedder.is_enabled() {
        report.vectors_pending = dedupe_by_id(&variants).len();
        if !variants.is_empty() {
            warn!(
                tenant_id,
                pending = report.vectors_pending,
                "embeddings disabled; skipping vector index (run reindex once a provider is configured)"
            );
        }
    } else if !variants.is_empty() {
        let pending = dedupe_by_id(&variants);
        let stored = match index.stored_hashes(tenant_id, &ids(&pending)).await {
            Ok(stored) => stored,
            Err(err) => {
                warn!(
                    tenant_id,
                    error = %format!("{:#}", err),
                    "could not read stored vector hashes; re-embedding all variants"
                );
                HashMap::new()
            }
        };

        let model = embedder.model_name();
        let (unchanged, changed): (Vec<_>, Vec<_>) = pending
            .into_iter()
            .partition(|p| is_unchanged(p, stored.get(&p.id), model));
        report.vectors_unchanged = unchanged.len();

        let records = embed_pending(embedder, changed, options.batch_size)
            .await
            .map_err(|cause| IngestError::Embedding {
                tenant_id: tenant_id.to_string(),
                cause,
            })?;

        if !records.is_empty() {
            index
                .upsert(&records)
                .await
                .map_err(|cause| IngestError::VectorIndex {
                    tenant_id: tenant_id.to_string(),
                    cause,
                })?;
        }
        report.vectors_written = records.len();
        info!(
            tenant_id,
            written = report.vectors_written,
            unchanged = report.vectors_unchanged,
            "vector index updated"
        );
    }

    let persisted = report.degraded.is_none() || embedder.is_enabled();
    report.processed_count = if persisted { variants.len() } else { 0 };

    Ok(report)
}

/// Rebuild every vector of `tenant_id` from the relational store.
///
/// The tenant's existing vectors are replaced wholesale, which also removes
/// vectors whose SKU no longer exists.
pub async fn reindex_tenant(
    store: &dyn CatalogStore,
    index: &dyn VectorIndex,
    embedder: &dyn EmbeddingProvider,
    options: &IngestOptions,
    tenant_id: &str,
) -> Result<ReindexReport, ReindexError> {
    if !embedder.is_enabled() {
        return Err(ReindexError::EmbeddingsDisabled);
    }

    let variants = store
        .list_variants(tenant_id)
        .await
        .map_err(|cause| ReindexError::Catalog {
            tenant_id: tenant_id.to_string(),
            cause,
        })?;

    let pending = dedupe_by_id(&variants);
    let records = embed_pending(embedder, pending, options.batch_size)
        .await
        .map_err(|cause| ReindexError::Embedding {
            tenant_id: tenant_id.to_string(),
            cause,
        })?;

    let removed = index
        .replace_tenant(tenant_id, &records)
        .await
        .map_err(|cause| ReindexError::VectorIndex {
            tenant_id: tenant_id.to_string(),
            cause,
        })?;

    info!(
        tenant_id,
        variants = variants.len(),
        written = records.len(),
        removed,
        "reindexed tenant"
    );

    Ok(ReindexReport {
        tenant_id: tenant_id.to_string(),
        variants: variants.len(),
        vectors_written: records.len(),
        vectors_removed: removed,
    })
}

/// One pending vector per id, in first-seen order; a later duplicate SKU
/// replaces the earlier one.
fn dedupe_by_id(variants: &[ProductVariant]) -> Vec<PendingVector> {
    let mut out: Vec<PendingVector> = Vec::with_capacity(variants.len());
    let mut positions: HashMap<String, usize> = HashMap::new();

    for v in variants {
        let pending = PendingVector::from_variant(v);
        match positions.get(&pending.id) {
            Some(&i) => {
                debug!(sku = %v.sku, "duplicate SKU in file; last row wins");
                out[i] = pending;
            }
            None => {
                positions.insert(pending.id.clone(), out.len());
                out.push(pending);
            }
        }
    }
    out
}

fn ids(pending: &[PendingVector]) -> Vec<String> {
    pending.iter().map(|p| p.id.clone()).collect()
}

fn is_unchanged(pending: &PendingVector, stored: Option<&StoredHash>, model: &str) -> bool {
    stored.is_some_and(|s| s.content_hash == pending.content_hash && s.model == model)
}

async fn embed_pending(
    embedder: &dyn EmbeddingProvider,
    pending: Vec<PendingVector>,
    batch_size: usize,
) -> anyhow::Result<Vec<VectorRecord>> {
    if pending.is_empty() {
        return Ok(Vec::new());
    }

    let texts: Vec<String> = pending.iter().map(|p| p.document.clone()).collect();
    let vectors = embed_batches(embedder, &texts, batch_size).await?;

    Ok(pending
        .into_iter()
        .zip(vectors)
        .map(|(p, embedding)| VectorRecord {
            id: p.id,
            embedding,
            document: p.document,
            metadata: p.metadata,
            model: embedder.model_name().to_string(),
            content_hash: p.content_hash,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::DisabledProvider;
    use crate::store::memory::{InMemoryCatalogStore, InMemoryVectorIndex};
    use crate::testing::*;

    async fn ingest(
        store: &InMemoryCatalogStore,
        index: &InMemoryVectorIndex,
        embedder: &dyn EmbeddingProvider,
        tenant: &str,
        table: &RawTable,
    ) -> Result<IngestReport, IngestError> {
        ingest_catalog(
            CatalogSession::Connected(store),
            index,
            embedder,
            &IngestOptions::default(),
            tenant,
            table,
        )
        .await
    }

    #[tokio::test]
    async fn test_shirt_scenario_writes_both_stores() {
        let store = InMemoryCatalogStore::new();
        let index = InMemoryVectorIndex::new();
        let embedder = KeywordEmbedder::default();

        let report = ingest(&store, &index, &embedder, "t1", &shirt_table())
            .await
            .unwrap();

        assert_eq!(report.processed_count, 2);
        assert!(report.tenant_created);
        assert_eq!(report.vectors_written, 2);
        assert!(report.degraded.is_none());

        let m = store.get_variant("t1", "SHRT-M").await.unwrap().unwrap();
        let l = store.get_variant("t1", "SHRT-L").await.unwrap().unwrap();
        assert_eq!(m.title, "Red Cotton Shirt");
        assert_eq!(l.title, "Red Cotton Shirt");
        assert_eq!(m.price, 19.99);
        assert_eq!(l.price, 21.99);

        let tenant = store.get_tenant("t1").await.unwrap().unwrap();
        assert_eq!(tenant.display_name.as_deref(), Some("Acme"));
        assert_eq!(index.count("t1").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_processed_count_excludes_rows_without_sku() {
        let store = InMemoryCatalogStore::new();
        let index = InMemoryVectorIndex::new();
        let t = table(
            "Handle,Title,Variant SKU,Variant Price\n\
             a,A,A-1,1\n\
             a,,,2\n\
             b,B,B-1,3\n\
             c,C,  ,4\n",
        );
        let report = ingest(&store, &index, &KeywordEmbedder::default(), "t1", &t)
            .await
            .unwrap();
        assert_eq!(report.normalize.rows_total, 4);
        assert_eq!(report.normalize.rows_rejected, 2);
        assert_eq!(report.processed_count, 2);
    }

    #[tokio::test]
    async fn test_default_store_name_when_vendor_blank() {
        let store = InMemoryCatalogStore::new();
        let index = InMemoryVectorIndex::new();
        let t = table("Variant SKU,Variant Price\nX,1\n");
        ingest(&store, &index, &KeywordEmbedder::default(), "t1", &t)
            .await
            .unwrap();
        let tenant = store.get_tenant("t1").await.unwrap().unwrap();
        assert_eq!(tenant.display_name.as_deref(), Some("My Store"));
    }

    #[tokio::test]
    async fn test_reingest_is_idempotent_and_skips_unchanged() {
        let store = InMemoryCatalogStore::new();
        let index = InMemoryVectorIndex::new();
        let embedder = KeywordEmbedder::default();

        ingest(&store, &index, &embedder, "t1", &shirt_table())
            .await
            .unwrap();
        let second = ingest(&store, &index, &embedder, "t1", &shirt_table())
            .await
            .unwrap();

        assert!(!second.tenant_created);
        assert_eq!(second.vectors_written, 0);
        assert_eq!(second.vectors_unchanged, 2);
        assert_eq!(embedder.texts_embedded(), 2);
        assert_eq!(store.count_variants("t1").await.unwrap(), 2);
        assert_eq!(index.count("t1").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_changed_price_is_reembedded() {
        let store = InMemoryCatalogStore::new();
        let index = InMemoryVectorIndex::new();
        let embedder = KeywordEmbedder::default();

        ingest(&store, &index, &embedder, "t1", &shirt_table())
            .await
            .unwrap();
        let t = table(
            "Handle,Title,Variant SKU,Variant Price\n\
             shirt,Red Cotton Shirt,SHRT-M,24.99\n",
        );
        let report = ingest(&store, &index, &embedder, "t1", &t).await.unwrap();
        assert_eq!(report.vectors_written, 1);
        let m = store.get_variant("t1", "SHRT-M").await.unwrap().unwrap();
        assert_eq!(m.price, 24.99);
    }

    #[tokio::test]
    async fn test_duplicate_sku_in_file_yields_one_record() {
        let store = InMemoryCatalogStore::new();
        let index = InMemoryVectorIndex::new();
        let t = table("Variant SKU,Variant Price\nA,1\nA,2\n");
        let report = ingest(&store, &index, &KeywordEmbedder::default(), "t1", &t)
            .await
            .unwrap();
        assert_eq!(report.vectors_written, 1);
        assert_eq!(store.count_variants("t1").await.unwrap(), 1);
        let records = index.records().unwrap();
        assert_eq!(records[0].metadata.price, 2.0);
    }

    #[tokio::test]
    async fn test_filtered_rows_reach_neither_store() {
        let store = InMemoryCatalogStore::new();
        let index = InMemoryVectorIndex::new();
        let t = table(
            "Handle,Variant SKU,Variant Price,Status,Published\n\
             a,A,1,active,TRUE\n\
             b,B,1,draft,TRUE\n\
             c,C,1,active,FALSE\n",
        );
        let report = ingest(&store, &index, &KeywordEmbedder::default(), "t1", &t)
            .await
            .unwrap();
        assert_eq!(report.normalize.rows_filtered, 2);
        assert!(store.get_variant("t1", "B").await.unwrap().is_none());
        assert!(store.get_variant("t1", "C").await.unwrap().is_none());
        assert_eq!(index.count("t1").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_validation_error_writes_nothing() {
        let store = InMemoryCatalogStore::new();
        let index = InMemoryVectorIndex::new();
        let t = table("Handle,Title\nh,T\n");
        let err = ingest(&store, &index, &KeywordEmbedder::default(), "t1", &t)
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::Validation(_)));
        assert!(store.get_tenant("t1").await.unwrap().is_none());
        assert_eq!(index.count("t1").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_blank_tenant_is_rejected() {
        let store = InMemoryCatalogStore::new();
        let index = InMemoryVectorIndex::new();
        let err = ingest(&store, &index, &KeywordEmbedder::default(), "  ", &shirt_table())
            .await
            .unwrap_err();
        assert_eq!(err.code(), "validation");
    }

    #[tokio::test]
    async fn test_persistence_failure_writes_no_vectors() {
        let index = InMemoryVectorIndex::new();
        let embedder = KeywordEmbedder::default();
        let err = ingest_catalog(
            CatalogSession::Connected(&FailingCatalogStore),
            &index,
            &embedder,
            &IngestOptions::default(),
            "t1",
            &shirt_table(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, IngestError::Persistence { .. }));
        assert_eq!(index.count("t1").await.unwrap(), 0);
        assert_eq!(embedder.texts_embedded(), 0);
    }

    #[tokio::test]
    async fn test_degraded_mode_writes_vectors_and_warns() {
        let index = InMemoryVectorIndex::new();
        let report = ingest_catalog(
            CatalogSession::Unreachable(anyhow::anyhow!("connection refused")),
            &index,
            &KeywordEmbedder::default(),
            &IngestOptions::default(),
            "t1",
            &shirt_table(),
        )
        .await
        .unwrap();

        let warning = report.degraded.expect("degraded warning");
        assert!(warning.reason.contains("connection refused"));
        assert_eq!(report.relational_written, 0);
        assert_eq!(report.vectors_written, 2);
        assert_eq!(report.processed_count, 2);
        assert_eq!(index.count("t1").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_disabled_provider_commits_relational_only() {
        let store = InMemoryCatalogStore::new();
        let index = InMemoryVectorIndex::new();
        let report = ingest(&store, &index, &DisabledProvider, "t1", &shirt_table())
            .await
            .unwrap();
        assert_eq!(report.processed_count, 2);
        assert_eq!(report.vectors_pending, 2);
        assert_eq!(report.vectors_written, 0);
        assert_eq!(store.count_variants("t1").await.unwrap(), 2);
        assert_eq!(index.count("t1").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_embedding_failure_after_commit() {
        let store = InMemoryCatalogStore::new();
        let index = InMemoryVectorIndex::new();
        let err = ingest(&store, &index, &FailingEmbedder, "t1", &shirt_table())
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::Embedding { .. }));
        assert!(err.to_string().contains("reindex"));
        assert_eq!(store.count_variants("t1").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_index_write_failure_is_vector_index_error() {
        let store = InMemoryCatalogStore::new();
        let err = ingest_catalog(
            CatalogSession::Connected(&store),
            &FailingIndex,
            &KeywordEmbedder::default(),
            &IngestOptions::default(),
            "t1",
            &shirt_table(),
        )
        .await
        .unwrap_err();
        // The hash lookup also fails, which only downgrades to a full embed.
        assert!(matches!(err, IngestError::VectorIndex { .. }));
    }

    #[tokio::test]
    async fn test_reindex_restores_wiped_index() {
        let store = InMemoryCatalogStore::new();
        let index = InMemoryVectorIndex::new();
        let embedder = KeywordEmbedder::default();
        ingest(&store, &index, &DisabledProvider, "t1", &shirt_table())
            .await
            .unwrap();
        assert_eq!(index.count("t1").await.unwrap(), 0);

        let report = reindex_tenant(&store, &index, &embedder, &IngestOptions::default(), "t1")
            .await
            .unwrap();
        assert_eq!(report.variants, 2);
        assert_eq!(report.vectors_written, 2);
        assert_eq!(report.vectors_removed, 0);
        assert_eq!(index.count("t1").await.unwrap(), 2);

        index.clear_tenant("t1").unwrap();
        reindex_tenant(&store, &index, &embedder, &IngestOptions::default(), "t1")
            .await
            .unwrap();
        assert_eq!(index.count("t1").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_reindex_requires_enabled_provider() {
        let store = InMemoryCatalogStore::new();
        let index = InMemoryVectorIndex::new();
        let err = reindex_tenant(
            &store,
            &index,
            &DisabledProvider,
            &IngestOptions::default(),
            "t1",
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ReindexError::EmbeddingsDisabled));
    }
}
