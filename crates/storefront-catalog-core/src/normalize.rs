//! Catalog export normalizer.
//!
//! Turns a [`RawTable`] read from a storefront export into sellable
//! [`ProductVariant`]s.
//!
//! # Algorithm
//!
//! 1. Keep only the columns in [`ALLOWED_COLUMNS`]; everything else is ignored.
//! 2. Exports list parent-level fields only on the first row of a product.
//!    For every column in [`FORWARD_FILL_COLUMNS`], a blank cell is filled with
//!    the last non-blank value seen for the same `Handle`, in file order.
//! 3. Missing cells become empty strings.
//! 4. When present, `Status` must be `active` and `Published` must be truthy.
//! 5. Rows without a `Variant SKU` are rejected. `Variant Price` is coerced to
//!    a non-negative number, and anything else becomes `0.0`.
//!
//! A file lacking the `Variant SKU` or `Variant Price` column is rejected
//! outright with [`IngestError::Validation`].
//!
//! # Example
//!
//! ```rust
//! use storefront_catalog_core::normalize::normalize_catalog;
//! use storefront_catalog_core::table::RawTable;
//!
//! let csv = "Handle,Title,Variant SKU,Variant Price\n\
//!            h1,Shirt,SHRT-M,19.99\n\
//!            h1,,SHRT-L,21.99\n";
//! let table = RawTable::from_csv_bytes(csv.as_bytes()).unwrap();
//! let catalog = normalize_catalog(&table, "tenant-a").unwrap();
//! assert_eq!(catalog.variants.len(), 2);
//! assert_eq!(catalog.variants[1].title, "Shirt");
//! ```

use std::collections::HashMap;

use serde::Serialize;

use crate::error::IngestError;
use crate::models::{OptionPair, ProductVariant};
use crate::table::RawTable;

pub const HANDLE: &str = "Handle";
pub const TITLE: &str = "Title";
pub const VENDOR: &str = "Vendor";
pub const CATEGORY: &str = "Custom Product Type";
pub const TAGS: &str = "Tags";
pub const PUBLISHED: &str = "Published";
pub const SKU: &str = "Variant SKU";
pub const PRICE: &str = "Variant Price";
pub const INVENTORY_TRACKER: &str = "Variant Inventory Tracker";
pub const INVENTORY_POLICY: &str = "Variant Inventory Policy";
pub const IMAGE_SRC: &str = "Image Src";
pub const VARIANT_IMAGE: &str = "Variant Image";
pub const DESCRIPTION: &str = "SEO Description";
pub const STATUS: &str = "Status";

/// Recognized export columns. Matching is exact and case-sensitive.
pub const ALLOWED_COLUMNS: [&str; 27] = [
    HANDLE,
    TITLE,
    VENDOR,
    CATEGORY,
    TAGS,
    PUBLISHED,
    "Option1 Name",
    "Option1 Value",
    "Option2 Name",
    "Option2 Value",
    "Option3 Name",
    "Option3 Value",
    SKU,
    "Variant Grams",
    INVENTORY_TRACKER,
    INVENTORY_POLICY,
    PRICE,
    IMAGE_SRC,
    "Image Position",
    "Image Alt Text",
    "SEO Title",
    DESCRIPTION,
    VARIANT_IMAGE,
    "Variant Weight Unit",
    "Cost per item",
    "Price / International",
    STATUS,
];

/// Parent-level columns that exports leave blank on variant rows.
pub const FORWARD_FILL_COLUMNS: [&str; 8] = [
    TITLE,
    VENDOR,
    CATEGORY,
    TAGS,
    DESCRIPTION,
    IMAGE_SRC,
    STATUS,
    PUBLISHED,
];

const OPTION_COLUMNS: [(&str, &str); 3] = [
    ("Option1 Name", "Option1 Value"),
    ("Option2 Name", "Option2 Value"),
    ("Option3 Name", "Option3 Value"),
];

/// One allow-listed row: column name → cell, empty when the column is absent.
type CatalogRow = HashMap<&'static str, String>;

/// Row accounting for one normalized file.
///
/// `rows_total == rows_filtered + rows_rejected + emitted` always holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NormalizeReport {
    pub rows_total: u64,
    /// Dropped by the `Status` / `Published` filter.
    pub rows_filtered: u64,
    /// Dropped for lacking a SKU.
    pub rows_rejected: u64,
    pub emitted: u64,
}

/// Output of [`normalize_catalog`].
#[derive(Debug, Clone)]
pub struct NormalizedCatalog {
    pub variants: Vec<ProductVariant>,
    pub report: NormalizeReport,
}

/// Normalize a parsed export into sellable variants owned by `tenant_id`.
///
/// # Errors
///
/// [`IngestError::Validation`] when the `Variant SKU` or `Variant Price`
/// column is missing. Individual bad rows never fail the file.
pub fn normalize_catalog(
    table: &RawTable,
    tenant_id: &str,
) -> Result<NormalizedCatalog, IngestError> {
    let missing: Vec<&str> = [SKU, PRICE]
        .into_iter()
        .filter(|c| table.column_index(c).is_none())
        .collect();
    if !missing.is_empty() {
        return Err(IngestError::Validation(format!(
            "CSV is missing required column(s): {}",
            missing
                .iter()
                .map(|c| format!("'{}'", c))
                .collect::<Vec<_>>()
                .join(", ")
        )));
    }

    let columns: Vec<(&'static str, usize)> = ALLOWED_COLUMNS
        .iter()
        .filter_map(|&name| table.column_index(name).map(|idx| (name, idx)))
        .collect();
    let has_column = |name: &str| columns.iter().any(|(c, _)| *c == name);

    let mut rows: Vec<CatalogRow> = table
        .rows()
        .iter()
        .map(|cells| {
            columns
                .iter()
                .map(|&(name, idx)| (name, cells.get(idx).cloned().unwrap_or_default()))
                .collect()
        })
        .collect();

    if has_column(HANDLE) {
        forward_fill(&mut rows);
    }

    let filter_status = has_column(STATUS);
    let filter_published = has_column(PUBLISHED);

    let mut report = NormalizeReport {
        rows_total: rows.len() as u64,
        ..Default::default()
    };
    let mut variants = Vec::with_capacity(rows.len());

    for row in &rows {
        if filter_status && !field(row, STATUS).eq_ignore_ascii_case("active") {
            report.rows_filtered += 1;
            continue;
        }
        if filter_published && !is_truthy(field(row, PUBLISHED)) {
            report.rows_filtered += 1;
            continue;
        }

        let sku = field(row, SKU);
        if sku.is_empty() {
            report.rows_rejected += 1;
            continue;
        }

        variants.push(to_variant(row, tenant_id, sku));
        report.emitted += 1;
    }

    Ok(NormalizedCatalog { variants, report })
}

/// Fill blank parent-level cells from the last non-blank value of the same
/// handle. Rows with a blank handle belong to no group and are left as is.
fn forward_fill(rows: &mut [CatalogRow]) {
    let mut last_seen: HashMap<String, HashMap<&'static str, String>> = HashMap::new();

    for row in rows.iter_mut() {
        let handle = field(row, HANDLE).to_string();
        if handle.is_empty() {
            continue;
        }
        let group = last_seen.entry(handle).or_default();

        for col in FORWARD_FILL_COLUMNS {
            let Some(cell) = row.get_mut(col) else {
                continue;
            };
            if cell.trim().is_empty() {
                if let Some(prev) = group.get(col) {
                    *cell = prev.clone();
                }
            } else {
                group.insert(col, cell.clone());
            }
        }
    }
}

fn to_variant(row: &CatalogRow, tenant_id: &str, sku: &str) -> ProductVariant {
    let image_url = [VARIANT_IMAGE, IMAGE_SRC]
        .into_iter()
        .map(|c| field(row, c))
        .find(|v| !v.is_empty())
        .map(str::to_string);

    let option_pairs = OPTION_COLUMNS
        .iter()
        .filter_map(|&(name_col, value_col)| {
            let (name, value) = (field(row, name_col), field(row, value_col));
            (!name.is_empty() && !value.is_empty()).then(|| OptionPair::new(name, value))
        })
        .collect();

    ProductVariant {
        tenant_id: tenant_id.to_string(),
        handle: field(row, HANDLE).to_string(),
        sku: sku.to_string(),
        title: field(row, TITLE).to_string(),
        vendor: field(row, VENDOR).to_string(),
        category: field(row, CATEGORY).to_string(),
        tags: field(row, TAGS).to_string(),
        description: field(row, DESCRIPTION).to_string(),
        price: coerce_price(field(row, PRICE)),
        image_url,
        option_pairs,
        inventory_tracker: non_empty(field(row, INVENTORY_TRACKER)),
        inventory_policy: non_empty(field(row, INVENTORY_POLICY)),
    }
}

/// Trimmed cell value, empty when the column is absent.
fn field<'a>(row: &'a CatalogRow, col: &str) -> &'a str {
    row.get(col).map(|v| v.trim()).unwrap_or("")
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

fn is_truthy(value: &str) -> bool {
    ["true", "yes", "1"]
        .iter()
        .any(|t| value.eq_ignore_ascii_case(t))
}

/// Parse a price cell. Unparseable, non-finite, and negative values become
/// `0.0` instead of rejecting the row.
pub fn coerce_price(raw: &str) -> f64 {
    match raw.trim().parse::<f64>() {
        Ok(p) if p.is_finite() && p >= 0.0 => p,
        _ => 0.0,
    }
}
