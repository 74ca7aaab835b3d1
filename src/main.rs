use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use catalog_sync::config::Config;
use catalog_sync::constants;
use catalog_sync::infra::{ReachabilityProbe, ReqwestCatalogApi};
use catalog_sync::{
    logging, observability, BulkLoader, CatalogRecord, ConnectivityHub, FilterCriteria,
    SyncController, SyncHandle, SyncOptions, SyncState,
};

#[derive(Parser)]
#[command(name = "catalog_sync")]
#[command(about = "Keep a local catalog in sync with a read-only API and search it")]
#[command(version)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, global = true, default_value = constants::DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Override the number of index entries to load
    #[arg(long, global = true)]
    limit: Option<usize>,

    /// Serve Prometheus metrics on this address
    #[arg(long, global = true)]
    metrics_addr: Option<SocketAddr>,

    #[arg(long, global = true, default_value = constants::DEFAULT_LOG_DIR)]
    log_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load the catalog and print a summary
    Sync {
        /// Keep running and report state changes until Ctrl-C
        #[arg(long)]
        watch: bool,
    },
    /// Load the catalog and print the records matching the filters
    Search {
        /// Name fragment or id (`25`, `#025`)
        #[arg(long, short, default_value = "")]
        query: String,
        /// Category to select (repeatable)
        #[arg(long = "category", short)]
        categories: Vec<String>,
        /// Print the records that do NOT match instead
        #[arg(long)]
        exclude: bool,
        /// Print at most this many records
        #[arg(long)]
        max_results: Option<usize>,
    },
    /// Load the catalog and list the categories it uses
    Categories,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    let _log_guard = logging::init_logging(&cli.log_dir);

    let mut config = Config::load(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    if let Some(limit) = cli.limit {
        config.api.index_limit = limit;
    }
    if let Some(addr) = cli.metrics_addr {
        observability::init(addr).map_err(|e| anyhow!("{}", e))?;
    }

    let hub = ConnectivityHub::new();
    let probe = if config.connectivity.enabled {
        let probe = ReachabilityProbe::for_base_url(&config.api.base_url, &config.connectivity)?;
        Some(probe.spawn(hub.clone()))
    } else {
        None
    };

    let api = Arc::new(ReqwestCatalogApi::new(&config.api)?);
    let loader = BulkLoader::from_config(api, &config.api);
    let controller = SyncController::start(loader, hub, SyncOptions::from(&config.sync));
    let handle = controller.handle();
    info!("Syncing from {}", config.api.base_url);

    let outcome = match cli.command {
        Commands::Sync { watch } => run_sync(&handle, watch).await,
        Commands::Search {
            query,
            categories,
            exclude,
            max_results,
        } => {
            let criteria = FilterCriteria::default()
                .with_search(query)
                .with_categories(categories)
                .excluding(exclude);
            run_search(&handle, criteria, max_results).await
        }
        Commands::Categories => run_categories(&handle).await,
    };

    match outcome {
        // Let an in-flight load settle before exiting
        Ok(Finished::Done) => controller.shutdown().await,
        Ok(Finished::Interrupted) | Err(_) => drop(controller),
    }
    if let Some(task) = probe {
        task.abort();
    }
    outcome.map(|_| ())
}

enum Finished {
    Done,
    Interrupted,
}

/// Wait for the first `Ready`, reporting failures along the way.
/// Returns false when interrupted with Ctrl-C.
async fn wait_until_ready(handle: &SyncHandle) -> Result<bool> {
    let mut states = handle.subscribe_state();
    loop {
        let state = states.borrow_and_update().clone();
        match &state {
            SyncState::Ready => return Ok(true),
            SyncState::Loading => println!("🔄 Loading catalog..."),
            SyncState::Degraded {
                attempt,
                last_error,
            } => {
                warn!("Catalog unavailable (attempt {})", attempt);
                println!("⚠️  Source unavailable, retrying (attempt {}): {}", attempt, last_error);
            }
        }
        tokio::select! {
            changed = states.changed() => changed.context("sync controller stopped")?,
            _ = tokio::signal::ctrl_c() => return Ok(false),
        }
    }
}

fn print_record(record: &CatalogRecord) {
    println!(
        "{:>6} {:<24} [{}]",
        record.display_id(),
        record.name,
        record.categories.join(", ")
    );
}

async fn run_sync(handle: &SyncHandle, watch: bool) -> Result<Finished> {
    if !wait_until_ready(handle).await? {
        return Ok(Finished::Interrupted);
    }
    let catalog = handle.catalog();
    println!("\n📊 Catalog ready");
    println!("   Records: {}", catalog.len());
    println!("   Categories: {}", catalog.categories().len());

    if !watch {
        return Ok(Finished::Done);
    }

    let mut states = handle.subscribe_state();
    loop {
        tokio::select! {
            changed = states.changed() => {
                changed.context("sync controller stopped")?;
                let state = states.borrow_and_update().clone();
                println!("Sync state: {} ({} records)", state, handle.catalog().len());
            }
            _ = tokio::signal::ctrl_c() => return Ok(Finished::Interrupted),
        }
    }
}

async fn run_search(
    handle: &SyncHandle,
    criteria: FilterCriteria,
    max_results: Option<usize>,
) -> Result<Finished> {
    handle.set_criteria(criteria);
    if !wait_until_ready(handle).await? {
        return Ok(Finished::Interrupted);
    }

    let results = handle.filtered();
    let shown = max_results.unwrap_or(results.len());
    for record in results.iter().take(shown) {
        print_record(record);
    }
    if results.is_empty() {
        println!("No records match these filters.");
    }
    println!(
        "\nFound {} of {} records",
        results.len(),
        handle.catalog().len()
    );
    Ok(Finished::Done)
}

async fn run_categories(handle: &SyncHandle) -> Result<Finished> {
    if !wait_until_ready(handle).await? {
        return Ok(Finished::Interrupted);
    }
    for category in handle.category_catalog() {
        println!("{}", category);
    }
    Ok(Finished::Done)
}
