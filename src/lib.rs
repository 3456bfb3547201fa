//! # Storefront Catalog
//!
//! Multi-tenant product catalog ingestion and semantic retrieval for
//! storefront chat assistants.
//!
//! A merchant uploads a product spreadsheet; it is normalized into one row
//! per variant, written to a relational catalog (SQLite), then embedded and
//! written to a tenant-scoped vector index. Search embeds a natural-language
//! query, ranks the tenant's vectors by cosine similarity and enriches each
//! hit with live prices from the relational catalog.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌──────────────┐   ┌───────────────┐
//! │  CSV export │──▶│  Normalizer  │──▶│ Catalog (SQL) │
//! └─────────────┘   └──────┬───────┘   └───────┬───────┘
//!                          │ embed             │ enrich
//!                          ▼                   ▼
//!                   ┌──────────────┐    ┌──────────────┐
//!                   │ Vector index │───▶│  Retrieval   │
//!                   └──────────────┘    └──────┬───────┘
//!                                      ┌───────┴───────┐
//!                                      ▼               ▼
//!                                 ┌─────────┐     ┌─────────┐
//!                                 │   CLI   │     │  HTTP   │
//!                                 └─────────┘     └─────────┘
//! ```
//!
//! The domain logic (normalizer, orchestrator, retrieval, store traits)
//! lives in the `storefront-catalog-core` crate; this crate provides the
//! SQLite stores, embedding providers, configuration and the adapters.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`catalog`] | Facade wiring config, stores and provider together |
//! | [`config`] | TOML configuration parsing |
//! | [`db`] | Database connections |
//! | [`migrate`] | Schema migrations |
//! | [`sqlite_store`] | Relational catalog store |
//! | [`vector_index`] | SQLite vector index |
//! | [`embedding`] | OpenAI, Ollama and local embedding providers |
//! | [`ingest`] | `catalog ingest` / `catalog reindex` |
//! | [`search`] | `catalog search` |
//! | [`stats`] | `catalog stats` |
//! | [`server`] | HTTP adapter |
//! | [`logging`] | tracing subscriber setup |

pub mod catalog;
pub mod config;
pub mod db;
pub mod embedding;
pub mod ingest;
pub mod logging;
pub mod migrate;
pub mod search;
pub mod server;
pub mod sqlite_store;
pub mod stats;
pub mod vector_index;
