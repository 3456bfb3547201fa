use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;

/// Create both databases and their tables. Idempotent.
pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    let result = migrate_catalog(&pool).await;
    pool.close().await;
    result?;

    let pool = db::connect_vectors(config).await?;
    let result = migrate_vectors(&pool).await;
    pool.close().await;
    result
}

pub async fn migrate_catalog(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS tenants (
            tenant_id TEXT PRIMARY KEY,
            display_name TEXT,
            tokens_used INTEGER NOT NULL DEFAULT 0,
            created_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS products (
            tenant_id TEXT NOT NULL,
            sku TEXT NOT NULL,
            handle TEXT NOT NULL,
            title TEXT NOT NULL,
            vendor TEXT NOT NULL,
            category TEXT NOT NULL,
            tags TEXT NOT NULL,
            description TEXT NOT NULL,
            price REAL NOT NULL,
            image_url TEXT,
            options_json TEXT NOT NULL DEFAULT '[]',
            inventory_tracker TEXT,
            inventory_policy TEXT,
            updated_at INTEGER NOT NULL,
            PRIMARY KEY (tenant_id, sku),
            FOREIGN KEY (tenant_id) REFERENCES tenants(tenant_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_products_handle ON products(tenant_id, handle)")
        .execute(pool)
        .await?;

    Ok(())
}

pub async fn migrate_vectors(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS product_vectors (
            id TEXT PRIMARY KEY,
            tenant_id TEXT NOT NULL,
            sku TEXT NOT NULL,
            model TEXT NOT NULL,
            dims INTEGER NOT NULL,
            embedding BLOB NOT NULL,
            document TEXT NOT NULL,
            metadata_json TEXT NOT NULL,
            content_hash TEXT NOT NULL,
            updated_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_product_vectors_tenant ON product_vectors(tenant_id, model)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
