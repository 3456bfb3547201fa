//! SQLite-backed [`VectorIndex`].
//!
//! Vectors are stored as little-endian `f32` BLOBs in their own database
//! (`[vector].path`) alongside the rendered document and JSON metadata.
//! Queries load the tenant's vectors for the active model and rank them by
//! cosine similarity in Rust.

use std::collections::{HashMap, HashSet};

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{Row, SqliteConnection, SqlitePool};

use storefront_catalog_core::embedding::{blob_to_vec, cosine_similarity, vec_to_blob};
use storefront_catalog_core::models::{VectorHit, VectorMetadata, VectorRecord};
use storefront_catalog_core::store::{rank_hits, StoredHash, VectorIndex};

use crate::config::Config;
use crate::db;
use crate::migrate::migrate_vectors;

pub struct SqliteVectorIndex {
    pool: SqlitePool,
}

impl SqliteVectorIndex {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open the vector database from config and ensure its schema exists.
    pub async fn open(config: &Config) -> Result<Self> {
        let pool = db::connect_vectors(config).await?;
        migrate_vectors(&pool).await?;
        Ok(Self::new(pool))
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

async fn insert_record(
    conn: &mut SqliteConnection,
    record: &VectorRecord,
    now: i64,
) -> Result<()> {
    let metadata_json = serde_json::to_string(&record.metadata)?;
    sqlx::query(
        r#"
        INSERT INTO product_vectors (id, tenant_id, sku, model, dims, embedding, document,
                                     metadata_json, content_hash, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            tenant_id = excluded.tenant_id,
            sku = excluded.sku,
            model = excluded.model,
            dims = excluded.dims,
            embedding = excluded.embedding,
            document = excluded.document,
            metadata_json = excluded.metadata_json,
            content_hash = excluded.content_hash,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(&record.id)
    .bind(&record.metadata.tenant_id)
    .bind(&record.metadata.sku)
    .bind(&record.model)
    .bind(record.embedding.len() as i64)
    .bind(vec_to_blob(&record.embedding))
    .bind(&record.document)
    .bind(&metadata_json)
    .bind(&record.content_hash)
    .bind(now)
    .execute(conn)
    .await?;
    Ok(())
}

#[async_trait]
impl VectorIndex for SqliteVectorIndex {
    async fn upsert(&self, records: &[VectorRecord]) -> Result<()> {
        let now = chrono::Utc::now().timestamp();
        let mut tx = self.pool.begin().await?;
        for record in records {
            insert_record(&mut *tx, record, now).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn query(
        &self,
        tenant_id: &str,
        model: &str,
        query_vec: &[f32],
        limit: usize,
    ) -> Result<Vec<VectorHit>> {
        let rows = sqlx::query(
            r#"
            SELECT id, embedding, document, metadata_json
            FROM product_vectors
            WHERE tenant_id = ? AND model = ?
            "#,
        )
        .bind(tenant_id)
        .bind(model)
        .fetch_all(&self.pool)
        .await?;

        let mut hits = Vec::with_capacity(rows.len());
        for row in &rows {
            let id: String = row.get("id");
            let blob: Vec<u8> = row.get("embedding");
            let metadata_json: String = row.get("metadata_json");
            let metadata: VectorMetadata = serde_json::from_str(&metadata_json)
                .with_context(|| format!("corrupt metadata for vector '{}'", id))?;

            hits.push(VectorHit {
                score: cosine_similarity(query_vec, &blob_to_vec(&blob)) as f64,
                document: row.get("document"),
                metadata,
                id,
            });
        }

        rank_hits(&mut hits, limit);
        Ok(hits)
    }

    async fn stored_hashes(
        &self,
        tenant_id: &str,
        ids: &[String],
    ) -> Result<HashMap<String, StoredHash>> {
        let rows = sqlx::query(
            "SELECT id, content_hash, model FROM product_vectors WHERE tenant_id = ?",
        )
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;

        let wanted: HashSet<&str> = ids.iter().map(String::as_str).collect();
        Ok(rows
            .iter()
            .filter(|row| wanted.contains(row.get::<&str, _>("id")))
            .map(|row| {
                (
                    row.get::<String, _>("id"),
                    StoredHash {
                        content_hash: row.get("content_hash"),
                        model: row.get("model"),
                    },
                )
            })
            .collect())
    }

    async fn replace_tenant(&self, tenant_id: &str, records: &[VectorRecord]) -> Result<u64> {
        let now = chrono::Utc::now().timestamp();
        let mut tx = self.pool.begin().await?;

        let removed = sqlx::query("DELETE FROM product_vectors WHERE tenant_id = ?")
            .bind(tenant_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        for record in records {
            insert_record(&mut *tx, record, now).await?;
        }

        tx.commit().await?;
        Ok(removed)
    }

    async fn count(&self, tenant_id: &str) -> Result<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM product_vectors WHERE tenant_id = ?")
                .bind(tenant_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }
}
