//! SQLite-backed [`CatalogStore`].
//!
//! Tenants and products live in the catalog database (`[db].path`). A
//! catalog upload is written inside one transaction so a failure leaves no
//! partial batch and no orphan tenant.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};

use storefront_catalog_core::models::{OptionPair, ProductVariant, Tenant};
use storefront_catalog_core::store::{CatalogStore, CatalogWrite};

/// SQLite implementation of [`CatalogStore`].
pub struct SqliteCatalogStore {
    pool: SqlitePool,
}

impl SqliteCatalogStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Close the underlying pool, waiting for connections to be released.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

const PRODUCT_COLUMNS: &str = "tenant_id, sku, handle, title, vendor, category, tags, \
     description, price, image_url, options_json, inventory_tracker, inventory_policy";

/// Insert the tenant row unless it exists. Returns `true` when created.
async fn insert_tenant(
    conn: &mut SqliteConnection,
    tenant_id: &str,
    display_name: Option<&str>,
    now: i64,
) -> Result<bool> {
    let result = sqlx::query(
        r#"
        INSERT INTO tenants (tenant_id, display_name, tokens_used, created_at)
        VALUES (?, ?, 0, ?)
        ON CONFLICT(tenant_id) DO NOTHING
        "#,
    )
    .bind(tenant_id)
    .bind(display_name)
    .bind(now)
    .execute(conn)
    .await?;

    Ok(result.rows_affected() == 1)
}

fn row_to_tenant(row: &SqliteRow) -> Tenant {
    Tenant {
        tenant_id: row.get("tenant_id"),
        display_name: row.get("display_name"),
        tokens_used: row.get("tokens_used"),
        created_at: row.get("created_at"),
    }
}

fn row_to_variant(row: &SqliteRow) -> Result<ProductVariant> {
    let sku: String = row.get("sku");
    let options_json: String = row.get("options_json");
    let option_pairs: Vec<OptionPair> = serde_json::from_str(&options_json)
        .with_context(|| format!("corrupt options_json for sku '{}'", sku))?;

    Ok(ProductVariant {
        tenant_id: row.get("tenant_id"),
        handle: row.get("handle"),
        title: row.get("title"),
        vendor: row.get("vendor"),
        category: row.get("category"),
        tags: row.get("tags"),
        description: row.get("description"),
        price: row.get("price"),
        image_url: row.get("image_url"),
        option_pairs,
        inventory_tracker: row.get("inventory_tracker"),
        inventory_policy: row.get("inventory_policy"),
        sku,
    })
}

#[async_trait]
impl CatalogStore for SqliteCatalogStore {
    async fn ensure_tenant(&self, tenant_id: &str, display_name: Option<&str>) -> Result<bool> {
        let mut conn = self.pool.acquire().await?;
        insert_tenant(&mut *conn, tenant_id, display_name, chrono::Utc::now().timestamp()).await
    }

    async fn get_tenant(&self, tenant_id: &str) -> Result<Option<Tenant>> {
        let row = sqlx::query(
            "SELECT tenant_id, display_name, tokens_used, created_at FROM tenants WHERE tenant_id = ?",
        )
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(row_to_tenant))
    }

    async fn list_tenants(&self) -> Result<Vec<Tenant>> {
        let rows = sqlx::query(
            "SELECT tenant_id, display_name, tokens_used, created_at FROM tenants ORDER BY tenant_id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(row_to_tenant).collect())
    }

    async fn record_token_usage(&self, tenant_id: &str, tokens: i64) -> Result<i64> {
        let total: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO tenants (tenant_id, display_name, tokens_used, created_at)
            VALUES (?, NULL, ?, ?)
            ON CONFLICT(tenant_id) DO UPDATE SET
                tokens_used = tenants.tokens_used + excluded.tokens_used
            RETURNING tokens_used
            "#,
        )
        .bind(tenant_id)
        .bind(tokens)
        .bind(chrono::Utc::now().timestamp())
        .fetch_one(&self.pool)
        .await?;

        Ok(total)
    }

    async fn upsert_catalog(
        &self,
        tenant_id: &str,
        display_name: &str,
        variants: &[ProductVariant],
    ) -> Result<CatalogWrite> {
        if let Some(bad) = variants.iter().find(|v| v.tenant_id != tenant_id) {
            bail!(
                "variant '{}' belongs to tenant '{}', not '{}'",
                bad.sku,
                bad.tenant_id,
                tenant_id
            );
        }

        let now = chrono::Utc::now().timestamp();
        let mut tx = self.pool.begin().await?;

        let created = insert_tenant(&mut *tx, tenant_id, Some(display_name), now).await?;

        for v in variants {
            let options_json = serde_json::to_string(&v.option_pairs)?;
            sqlx::query(
                r#"
                INSERT INTO products (tenant_id, sku, handle, title, vendor, category, tags,
                                      description, price, image_url, options_json,
                                      inventory_tracker, inventory_policy, updated_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(tenant_id, sku) DO UPDATE SET
                    handle = excluded.handle,
                    title = excluded.title,
                    vendor = excluded.vendor,
                    category = excluded.category,
                    tags = excluded.tags,
                    description = excluded.description,
                    price = excluded.price,
                    image_url = excluded.image_url,
                    options_json = excluded.options_json,
                    inventory_tracker = excluded.inventory_tracker,
                    inventory_policy = excluded.inventory_policy,
                    updated_at = excluded.updated_at
                "#,
            )
            .bind(tenant_id)
            .bind(&v.sku)
            .bind(&v.handle)
            .bind(&v.title)
            .bind(&v.vendor)
            .bind(&v.category)
            .bind(&v.tags)
            .bind(&v.description)
            .bind(v.price)
            .bind(&v.image_url)
            .bind(&options_json)
            .bind(&v.inventory_tracker)
            .bind(&v.inventory_policy)
            .bind(now)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("failed to upsert sku '{}'", v.sku))?;
        }

        tx.commit().await?;

        Ok(CatalogWrite {
            tenant_created: created,
            upserted: variants.len(),
        })
    }

    async fn get_variant(&self, tenant_id: &str, sku: &str) -> Result<Option<ProductVariant>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM products WHERE tenant_id = ? AND sku = ?",
            PRODUCT_COLUMNS
        ))
        .bind(tenant_id)
        .bind(sku)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_variant).transpose()
    }

    async fn list_variants(&self, tenant_id: &str) -> Result<Vec<ProductVariant>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM products WHERE tenant_id = ? ORDER BY sku",
            PRODUCT_COLUMNS
        ))
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_variant).collect()
    }

    async fn count_variants(&self, tenant_id: &str) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE tenant_id = ?")
            .bind(tenant_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
