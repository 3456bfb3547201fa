//! `catalog ingest` and `catalog reindex`.
//!
//! Thin wrappers around [`Catalog::ingest_csv`] and [`Catalog::reindex`]
//! that print a report to stdout. Failures propagate as errors so the
//! process exits non-zero.

use anyhow::{Context, Result};
use std::path::Path;

use storefront_catalog_core::ingest::IngestReport;

use crate::catalog::Catalog;

/// Ingest the CSV file at `path` for `tenant_id` and print the report.
pub async fn run_ingest(catalog: &Catalog, path: &Path, tenant_id: &str) -> Result<()> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read catalog file: {}", path.display()))?;

    let report = catalog.ingest_csv(tenant_id, &bytes).await?;
    print_ingest_report(&report);
    Ok(())
}

fn print_ingest_report(report: &IngestReport) {
    let n = &report.normalize;
    println!("ingest {}", report.tenant_id);
    println!("  rows read: {}", n.rows_total);
    println!("  rows filtered (draft/unpublished): {}", n.rows_filtered);
    println!("  rows rejected (missing SKU): {}", n.rows_rejected);
    println!("  variants processed: {}", report.processed_count);
    if report.tenant_created {
        println!("  tenant created");
    }
    println!("  relational rows written: {}", report.relational_written);
    println!("  vectors written: {}", report.vectors_written);
    if report.vectors_unchanged > 0 {
        println!("  vectors unchanged: {}", report.vectors_unchanged);
    }
    if report.vectors_pending > 0 {
        println!(
            "  vectors pending: {} (embeddings disabled; run `catalog reindex`)",
            report.vectors_pending
        );
    }
    if let Some(warning) = &report.degraded {
        println!("  warning: degraded mode, relational write skipped: {}", warning.reason);
    }
    println!("ok");
}

/// Rebuild every vector of `tenant_id` and print a summary.
pub async fn run_reindex(catalog: &Catalog, tenant_id: &str) -> Result<()> {
    let report = catalog.reindex(tenant_id).await?;

    println!("reindex {}", report.tenant_id);
    println!("  variants: {}", report.variants);
    println!("  vectors removed: {}", report.vectors_removed);
    println!("  vectors written: {}", report.vectors_written);
    println!("ok");
    Ok(())
}
