//! Per-tenant catalog statistics.
//!
//! Used by `catalog stats` to confirm that the relational store and the
//! vector index agree: after a successful ingestion with embeddings enabled,
//! `VARIANTS` and `VECTORS` match for every tenant.

use anyhow::Result;

use crate::catalog::Catalog;

pub async fn run_stats(catalog: &Catalog, tenant_id: Option<&str>) -> Result<()> {
    let stats = catalog.stats(tenant_id).await?;
    let config = catalog.config();

    println!("Storefront Catalog Stats");
    println!("========================");
    println!();
    println!(
        "  Catalog DB:  {} ({})",
        config.db.path.display(),
        format_bytes(file_size(&config.db.path))
    );
    println!(
        "  Vector DB:   {} ({})",
        config.vector.path.display(),
        format_bytes(file_size(&config.vector.path))
    );
    println!();

    if stats.is_empty() {
        match tenant_id {
            Some(id) => println!("  Unknown tenant: {}", id),
            None => println!("  No tenants."),
        }
        return Ok(());
    }

    println!(
        "  {:<24} {:<20} {:>9} {:>9} {:>12}",
        "TENANT", "STORE", "VARIANTS", "VECTORS", "TOKENS"
    );
    println!("  {}", "-".repeat(78));
    for s in &stats {
        let marker = if s.variants != s.vectors { " *" } else { "" };
        println!(
            "  {:<24} {:<20} {:>9} {:>9} {:>12}{}",
            s.tenant_id,
            s.display_name.as_deref().unwrap_or("-"),
            s.variants,
            s.vectors,
            s.tokens_used,
            marker
        );
    }

    if stats.iter().any(|s| s.variants != s.vectors) {
        println!();
        println!("  * vectors out of sync; run `catalog reindex --tenant <id>`");
    }
    println!();
    Ok(())
}

fn file_size(path: &std::path::Path) -> u64 {
    std::fs::metadata(path).map(|m| m.len()).unwrap_or(0)
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
