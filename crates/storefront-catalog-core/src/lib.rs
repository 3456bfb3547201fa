//! # Storefront Catalog Core
//!
//! Backend-agnostic catalog logic for multi-tenant storefronts: spreadsheet
//! normalization, search-document rendering, store and embedding traits,
//! the two-phase ingestion orchestrator, and tenant-filtered retrieval.
//!
//! This crate contains no tokio, sqlx, filesystem I/O, or HTTP clients.
//! Concrete SQLite stores and embedding providers live in the
//! `storefront-catalog` crate.

pub mod document;
pub mod embedding;
pub mod error;
pub mod ingest;
pub mod models;
pub mod normalize;
pub mod search;
pub mod store;
pub mod table;

/// Deterministic providers and failing stores for tests.
#[cfg(any(test, feature = "test-util"))]
pub mod testing;
