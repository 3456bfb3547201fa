#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use storefront_catalog::catalog::Catalog;
use storefront_catalog::config::{
    Config, DbConfig, EmbeddingConfig, IngestConfig, RetrievalConfig, ServerConfig, VectorConfig,
};
use storefront_catalog::embedding::{DisabledProvider, EmbeddingProvider};
use storefront_catalog::vector_index::SqliteVectorIndex;

pub use storefront_catalog_core::testing::KeywordEmbedder;

pub const ACME_CSV: &str = "\
Handle,Title,Vendor,Variant SKU,Variant Price,SEO Description,Status
red-shirt,Red Shirt,Acme,RS-1,19.99,Bright red cotton shirt,active
blue-shirt,Blue Shirt,Acme,BS-1,24.00,Deep blue shirt,active
wool-hat,Wool Hat,Acme,WH-1,15,Warm green wool hat,active
old-mug,Old Mug,Acme,OM-1,5,Retired mug,draft
";

pub const RIVAL_CSV: &str = "\
Handle,Title,Vendor,Variant SKU,Variant Price,SEO Description
red-shirt,Red Shirt,Rival,RS-9,9.99,Red shirt red shirt
";

pub fn config(root: &Path) -> Config {
    Config {
        db: DbConfig {
            path: root.join("data/catalog.sqlite"),
        },
        vector: VectorConfig {
            path: root.join("data/vectors.sqlite"),
        },
        embedding: EmbeddingConfig::default(),
        retrieval: RetrievalConfig::default(),
        ingest: IngestConfig::default(),
        server: ServerConfig::default(),
    }
}

pub async fn catalog_with(config: Config, embedder: Arc<dyn EmbeddingProvider>) -> Catalog {
    let index = SqliteVectorIndex::open(&config).await.unwrap();
    Catalog::from_parts(config, Arc::new(index), embedder)
}

pub async fn keyword_catalog(root: &Path) -> Catalog {
    catalog_with(config(root), Arc::new(KeywordEmbedder::default())).await
}

pub async fn disabled_catalog(root: &Path) -> Catalog {
    catalog_with(config(root), Arc::new(DisabledProvider)).await
}
