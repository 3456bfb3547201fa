//! # Storefront Catalog CLI (`catalog`)
//!
//! Operator interface for the multi-tenant product catalog: database setup,
//! spreadsheet ingestion, semantic search, vector reindexing, statistics and
//! the HTTP adapter.
//!
//! ## Usage
//!
//! ```bash
//! catalog --config ./config/catalog.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `catalog init` | Create both databases and run schema migrations |
//! | `catalog ingest <file> --tenant <id>` | Ingest a product CSV export |
//! | `catalog search "<query>" --tenant <id>` | Semantic search within a tenant |
//! | `catalog reindex --tenant <id>` | Rebuild a tenant's vectors from the catalog |
//! | `catalog stats` | Per-tenant variant, vector and token counts |
//! | `catalog serve` | Start the HTTP adapter |
//! | `catalog completions <shell>` | Print shell completions |
//!
//! ## Examples
//!
//! ```bash
//! catalog init
//! catalog ingest ./exports/products.csv --tenant acme
//! catalog search "red cotton shirt" --tenant acme --limit 5
//! catalog stats --tenant acme
//! ```

use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use storefront_catalog::catalog::Catalog;
use storefront_catalog::{config, ingest, logging, migrate, search, server, stats};

/// Storefront Catalog: multi-tenant product ingestion and semantic search.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/catalog.example.toml` for a full example.
#[derive(Parser)]
#[command(name = "catalog", version, about)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/catalog.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the catalog and vector databases. Safe to run repeatedly.
    Init,

    /// Ingest a product spreadsheet (CSV) for one tenant.
    ///
    /// Rows are normalized, upserted into the relational catalog in a single
    /// transaction, then embedded and written to the vector index.
    Ingest {
        /// Path to the CSV export.
        file: PathBuf,

        /// Tenant (store) identifier.
        #[arg(long)]
        tenant: String,
    },

    /// Search a tenant's catalog.
    Search {
        /// Natural-language description of the product.
        query: String,

        #[arg(long)]
        tenant: String,

        /// Maximum number of results (clamped to `retrieval.max_limit`).
        #[arg(long)]
        limit: Option<usize>,

        /// Print results as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Rebuild a tenant's vectors from the relational catalog.
    ///
    /// Use after a failed vector phase, after switching embedding models,
    /// or after ingesting with embeddings disabled.
    Reindex {
        #[arg(long)]
        tenant: String,
    },

    /// Show per-tenant counts for both stores.
    Stats {
        /// Limit the report to one tenant.
        #[arg(long)]
        tenant: Option<String>,
    },

    /// Start the HTTP adapter on `[server].bind`.
    Serve,

    /// Print shell completions to stdout.
    Completions {
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        // Needs no config.
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "catalog", &mut std::io::stdout());
            Ok(())
        }
        command => {
            logging::init_logging();
            let cfg = config::load_config(&cli.config)?;
            run(command, cfg).await
        }
    }
}

async fn run(command: Commands, cfg: config::Config) -> anyhow::Result<()> {
    if let Commands::Init = command {
        migrate::run_migrations(&cfg).await?;
        println!("Databases initialized successfully.");
        return Ok(());
    }

    let catalog = Catalog::open(cfg).await?;
    match command {
        Commands::Ingest { file, tenant } => {
            ingest::run_ingest(&catalog, &file, &tenant).await?;
        }
        Commands::Search {
            query,
            tenant,
            limit,
            json,
        } => {
            search::run_search(&catalog, &tenant, &query, limit, json).await?;
        }
        Commands::Reindex { tenant } => {
            ingest::run_reindex(&catalog, &tenant).await?;
        }
        Commands::Stats { tenant } => {
            stats::run_stats(&catalog, tenant.as_deref()).await?;
        }
        Commands::Serve => {
            server::run_server(catalog).await?;
        }
        Commands::Init | Commands::Completions { .. } => {}
    }

    Ok(())
}
