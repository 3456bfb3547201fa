//! Search documents and vector identities.
//!
//! Every variant is embedded from a single rendered text line that folds in
//! the fields a shopper might describe: title, category, tags, description,
//! options, price, and inventory policy. The vector id is derived from
//! `(tenant_id, sku)` so re-ingesting a SKU overwrites its previous vector.

use sha2::{Digest, Sha256};

use crate::models::{ProductVariant, VectorMetadata};

/// Render the text that is embedded for `variant`.
///
/// ```rust
/// use storefront_catalog_core::document::render_document;
/// # use storefront_catalog_core::models::{OptionPair, ProductVariant};
/// # let variant = ProductVariant {
/// #     tenant_id: "t".into(), handle: "h".into(), sku: "SHRT-M".into(),
/// #     title: "Shirt".into(), vendor: String::new(), category: "Tops".into(),
/// #     tags: "cotton".into(), description: "Soft".into(), price: 19.99,
/// #     image_url: None, option_pairs: vec![OptionPair::new("Size", "M")],
/// #     inventory_tracker: None, inventory_policy: Some("deny".into()),
/// # };
/// assert_eq!(
///     render_document(&variant),
///     "Product: Shirt (SHRT-M). Category: Tops. Tags: cotton. Description: Soft. \
///      Options: Size: M. Price: 19.99. Inventory Policy: deny."
/// );
/// ```
pub fn render_document(variant: &ProductVariant) -> String {
    let options = variant
        .option_pairs
        .iter()
        .map(|o| format!("{}: {}", o.name, o.value))
        .collect::<Vec<_>>()
        .join(", ");

    // `{:?}` keeps the trailing `.0` on whole prices: 20.0, 19.99.
    format!(
        "Product: {} ({}). Category: {}. Tags: {}. Description: {}. Options: {}. Price: {:?}. Inventory Policy: {}.",
        variant.title,
        variant.sku,
        variant.category,
        variant.tags,
        variant.description,
        options,
        variant.price,
        variant.inventory_policy.as_deref().unwrap_or(""),
    )
}

/// Deterministic vector id for a tenant's SKU.
///
/// Hex SHA-256 of `tenant_id`, a NUL byte, and `sku`. The separator keeps
/// `("a_b", "c")` and `("a", "b_c")` apart.
pub fn vector_id(tenant_id: &str, sku: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(tenant_id.as_bytes());
    hasher.update([0u8]);
    hasher.update(sku.as_bytes());
    format!("{:x}", hasher.finalize())
}

pub fn vector_metadata(variant: &ProductVariant) -> VectorMetadata {
    VectorMetadata {
        tenant_id: variant.tenant_id.clone(),
        sku: variant.sku.clone(),
        handle: variant.handle.clone(),
        title: variant.title.clone(),
        price: variant.price,
        inventory_policy: variant.inventory_policy.clone(),
    }
}

/// Hash of everything a stored vector record is derived from.
///
/// Two records with equal hashes (and the same embedding model) are
/// interchangeable, so the embedding call can be skipped.
pub fn content_hash(document: &str, metadata: &VectorMetadata) -> String {
    let mut hasher = Sha256::new();
    hasher.update(document.as_bytes());
    hasher.update([0u8]);
    hasher.update(metadata.handle.as_bytes());
    hasher.update([0u8]);
    hasher.update(metadata.title.as_bytes());
    hasher.update([0u8]);
    hasher.update(metadata.price.to_le_bytes());
    hasher.update([0u8]);
    hasher.update(metadata.inventory_policy.as_deref().unwrap_or("").as_bytes());
    format!("{:x}", hasher.finalize())
}

/// A variant rendered for the vector index, before embedding.
#[derive(Debug, Clone)]
pub struct PendingVector {
    pub id: String,
    pub document: String,
    pub metadata: VectorMetadata,
    pub content_hash: String,
}

impl PendingVector {
    pub fn from_variant(variant: &ProductVariant) -> Self {
        let document = render_document(variant);
        let metadata = vector_metadata(variant);
        let content_hash = content_hash(&document, &metadata);
        Self {
            id: vector_id(&variant.tenant_id, &variant.sku),
            document,
            metadata,
            content_hash,
        }
    }
}
