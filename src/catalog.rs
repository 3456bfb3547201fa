//! Application facade over the core orchestrator and retrieval service.
//!
//! A [`Catalog`] owns the process-wide pieces (the vector index and the
//! embedding provider) and opens a fresh relational pool for every call,
//! closing it on every exit path. The CLI commands and the HTTP server both
//! go through it.

use std::sync::Arc;

use anyhow::{anyhow, Result};
use serde::Serialize;
use tracing::{info, warn};

use storefront_catalog_core::error::{IngestError, ReindexError, RetrievalError};
use storefront_catalog_core::ingest::{
    ingest_catalog, reindex_tenant, IngestReport, ReindexReport,
};
use storefront_catalog_core::models::Tenant;
use storefront_catalog_core::search::{search_catalog, SearchOutcome};
use storefront_catalog_core::store::{CatalogSession, CatalogStore, VectorIndex};
use storefront_catalog_core::table::RawTable;

use crate::config::Config;
use crate::db;
use crate::embedding::{create_provider, EmbeddingProvider};
use crate::migrate::migrate_catalog;
use crate::sqlite_store::SqliteCatalogStore;
use crate::vector_index::SqliteVectorIndex;

/// Per-tenant counts across both stores.
#[derive(Debug, Clone, Serialize)]
pub struct TenantStats {
    pub tenant_id: String,
    pub display_name: Option<String>,
    pub variants: i64,
    pub vectors: i64,
    pub tokens_used: i64,
}

pub struct Catalog {
    config: Arc<Config>,
    index: Arc<dyn VectorIndex>,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl Catalog {
    /// Open the vector index and build the embedding provider from config.
    pub async fn open(config: Config) -> Result<Self> {
        let embedder = create_provider(&config.embedding)?;
        let index = SqliteVectorIndex::open(&config).await?;
        info!(
            provider = %config.embedding.provider,
            model = embedder.model_name(),
            vectors = %config.vector.path.display(),
            "catalog opened"
        );
        Ok(Self::from_parts(config, Arc::new(index), embedder))
    }

    /// Assemble a catalog from already-built parts.
    pub fn from_parts(
        config: Config,
        index: Arc<dyn VectorIndex>,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            index,
            embedder,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    async fn open_store(&self) -> Result<SqliteCatalogStore> {
        let pool = db::connect(&self.config).await?;
        if let Err(e) = migrate_catalog(&pool).await {
            pool.close().await;
            return Err(e);
        }
        Ok(SqliteCatalogStore::new(pool))
    }

    /// Parse `bytes` as CSV and ingest it for `tenant_id`.
    ///
    /// If the relational database cannot be opened the ingestion continues
    /// vector-only and the report carries a degraded-mode warning.
    pub async fn ingest_csv(
        &self,
        tenant_id: &str,
        bytes: &[u8],
    ) -> Result<IngestReport, IngestError> {
        let table = RawTable::from_csv_bytes(bytes)?;
        let options = self.config.ingest_options();

        match self.open_store().await {
            Ok(store) => {
                let result = ingest_catalog(
                    CatalogSession::Connected(&store),
                    self.index.as_ref(),
                    self.embedder.as_ref(),
                    &options,
                    tenant_id,
                    &table,
                )
                .await;
                store.close().await;
                result
            }
            Err(e) => {
                warn!(tenant_id, error = %format!("{:#}", e), "catalog database unreachable");
                ingest_catalog(
                    CatalogSession::Unreachable(anyhow!("{:#}", e)),
                    self.index.as_ref(),
                    self.embedder.as_ref(),
                    &options,
                    tenant_id,
                    &table,
                )
                .await
            }
        }
    }

    /// Semantic search within one tenant. Results are enriched from the
    /// relational store when it is reachable.
    pub async fn search(
        &self,
        tenant_id: &str,
        query: &str,
        limit: Option<usize>,
    ) -> Result<SearchOutcome, RetrievalError> {
        let params = self.config.search_params();
        let store = self.open_store().await;
        let session = match &store {
            Ok(store) => CatalogSession::Connected(store),
            Err(e) => {
                warn!(tenant_id, error = %format!("{:#}", e), "skipping enrichment");
                CatalogSession::Unreachable(anyhow!("{:#}", e))
            }
        };

        let result = search_catalog(
            &session,
            self.index.as_ref(),
            self.embedder.as_ref(),
            &params,
            tenant_id,
            query,
            limit,
        )
        .await;

        if let Ok(store) = &store {
            store.close().await;
        }
        result
    }

    /// Rebuild `tenant_id`'s vectors from the relational store.
    pub async fn reindex(&self, tenant_id: &str) -> Result<ReindexReport, ReindexError> {
        let store = self.open_store().await.map_err(|cause| ReindexError::Catalog {
            tenant_id: tenant_id.to_string(),
            cause,
        })?;
        let result = reindex_tenant(
            &store,
            self.index.as_ref(),
            self.embedder.as_ref(),
            &self.config.ingest_options(),
            tenant_id,
        )
        .await;
        store.close().await;
        result
    }

    /// Create the tenant row ahead of its first upload. Returns `true` when
    /// the tenant did not exist yet; an existing tenant is left untouched.
    pub async fn register_tenant(
        &self,
        tenant_id: &str,
        display_name: Option<&str>,
    ) -> Result<bool> {
        let store = self.open_store().await?;
        let result = store.ensure_tenant(tenant_id, display_name).await;
        store.close().await;
        if let Ok(true) = result {
            info!(tenant_id, "tenant registered");
        }
        result
    }

    /// Add `tokens` to the tenant's usage counter and return the new total.
    pub async fn record_usage(&self, tenant_id: &str, tokens: i64) -> Result<i64> {
        let store = self.open_store().await?;
        let result = store.record_token_usage(tenant_id, tokens).await;
        store.close().await;
        result
    }

    /// Counts for one tenant, or for every known tenant.
    pub async fn stats(&self, tenant_id: Option<&str>) -> Result<Vec<TenantStats>> {
        let store = self.open_store().await?;
        let result = self.collect_stats(&store, tenant_id).await;
        store.close().await;
        result
    }

    async fn collect_stats(
        &self,
        store: &SqliteCatalogStore,
        tenant_id: Option<&str>,
    ) -> Result<Vec<TenantStats>> {
        let tenants: Vec<Tenant> = match tenant_id {
            Some(id) => store.get_tenant(id).await?.into_iter().collect(),
            None => store.list_tenants().await?,
        };

        let mut stats = Vec::with_capacity(tenants.len());
        for tenant in tenants {
            stats.push(TenantStats {
                variants: store.count_variants(&tenant.tenant_id).await?,
                vectors: self.index.count(&tenant.tenant_id).await?,
                tokens_used: tenant.tokens_used,
                display_name: tenant.display_name,
                tenant_id: tenant.tenant_id,
            });
        }
        Ok(stats)
    }
}
