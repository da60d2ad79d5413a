use anyhow::Result;
use clap::{Parser, Subcommand};
use std::sync::Arc;

use threadstock::cache::{Cache, MemoryCache, TtlConfig};
use threadstock::logging::init_tracing;
use threadstock::ops::{self, AppContext, Operation};
use threadstock::search::SearchOrchestrator;
use threadstock::storage::db::SqliteStore;
use threadstock::storage::ProductStore;
use threadstock::suppliers::registry::AdapterRegistry;
use threadstock::suppliers::sample::SampleSupplier;
use threadstock::suppliers::ssactivewear::{SsActivewearProvider, SsOptions};
use threadstock::sync::SyncPipeline;
use threadstock::util::env::{env_flag, env_opt, env_parse, init_env};

#[derive(Parser)]
#[command(name = "threadstock", about = "Supplier catalog and inventory operations")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Search the catalog across every configured supplier.
    Search {
        query: String,
        #[arg(long)]
        page: Option<u32>,
    },
    /// Warehouse x size inventory matrix for one style.
    Inventory {
        style_id: String,
        #[arg(long)]
        force: bool,
    },
    /// Page through the live supplier's catalog (operator spot checks).
    Browse {
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 10)]
        page_size: u32,
        #[arg(long)]
        category: Option<String>,
    },
    /// Current sync state and persisted product count.
    Status,
    /// Sync one page of the supplier catalog into local storage.
    PageSync {
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 10)]
        page_size: u32,
    },
    /// Bounded one-shot sync; use page-sync for anything sizable.
    FullSync {
        #[arg(long, default_value_t = 10)]
        limit: u32,
    },
    /// Refresh a single style, honoring the persisted row's freshness.
    SyncSingle {
        style_id: String,
        #[arg(long)]
        force: bool,
        #[arg(long)]
        ttl_hours: Option<i64>,
    },
}

async fn build_context() -> Result<AppContext> {
    let cache: Arc<dyn Cache> = Arc::new(MemoryCache::new());
    let ttl = TtlConfig::from_env();

    let ss_options = SsOptions::from_env();
    let fallback_styles = ss_options.fallback_styles.clone();
    let ss = Arc::new(SsActivewearProvider::new(ss_options, cache.clone(), ttl)?);

    let mut registry = AdapterRegistry::new();
    registry.register(ss.clone());
    if env_flag("ENABLE_SAMPLE_SUPPLIER", true) {
        registry.register(Arc::new(SampleSupplier::new()));
    }
    let registry = Arc::new(registry);

    let database_url =
        env_opt("DATABASE_URL").unwrap_or_else(|| "sqlite://threadstock.db?mode=rwc".to_string());
    let store: Arc<dyn ProductStore> = Arc::new(
        SqliteStore::connect(&database_url, env_parse("DB_MAX_CONNECTIONS", 5u32)).await?,
    );

    Ok(AppContext {
        registry: registry.clone(),
        orchestrator: SearchOrchestrator::new(registry.clone()),
        pipeline: SyncPipeline::new(ss, store, fallback_styles),
        cache,
        ttl,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    init_env();
    init_tracing("info,threadstock=debug")?;
    let cli = Cli::parse();
    let ctx = build_context().await?;

    let out = match cli.command {
        Command::Browse {
            page,
            page_size,
            category,
        } => {
            // Browse is an adapter capability, not an inbound operation;
            // hit the live supplier directly.
            let adapter = ctx
                .registry
                .all()
                .iter()
                .find(|a| a.capabilities().browse)
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("no browsable supplier configured"))?;
            let listing = adapter
                .browse_products(page, page_size, category.as_deref())
                .await?;
            serde_json::to_value(listing)?
        }
        Command::Search { query, page } => {
            ops::handle(&ctx, Operation::SearchProducts { query, page }).await?
        }
        Command::Inventory { style_id, force } => {
            ops::handle(&ctx, Operation::GetInventory { style_id, force }).await?
        }
        Command::Status => ops::handle(&ctx, Operation::Status).await?,
        Command::PageSync { page, page_size } => {
            ops::handle(&ctx, Operation::PageSync { page, page_size }).await?
        }
        Command::FullSync { limit } => ops::handle(&ctx, Operation::FullSync { limit }).await?,
        Command::SyncSingle {
            style_id,
            force,
            ttl_hours,
        } => {
            ops::handle(
                &ctx,
                Operation::SyncSingle {
                    style_id,
                    force,
                    ttl_hours,
                },
            )
            .await?
        }
    };

    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}
