//! CLI for the scry block explorer.
//!
//! Sync pipeline: read cursor -> scan new blocks -> classify contracts -> persist -> report.

use alloy_eips::BlockId;
use alloy_primitives::{Address, B256};
use clap::{Parser, Subcommand, ValueEnum};
use scry_core::error::{ScryError, ScryResult};
use scry_core::{Cache, ScanProgress, SyncReport};
use scry_indexer::{views, CacheStore, SyncOrchestrator, ViewKind, ViewServer};
use scry_provider::{ChainReader, RpcReader};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;

#[derive(Parser, Debug)]
#[command(name = "scry", version, about = "Read-only block explorer for a private chain")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ViewArg {
    All,
    Transactions,
    Tokens,
    Network,
    Dashboard,
}

impl From<ViewArg> for ViewKind {
    fn from(arg: ViewArg) -> Self {
        match arg {
            ViewArg::All => ViewKind::All,
            ViewArg::Transactions => ViewKind::Transactions,
            ViewArg::Tokens => ViewKind::Tokens,
            ViewArg::Network => ViewKind::Network,
            ViewArg::Dashboard => ViewKind::Dashboard,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Scan new blocks into the local cache.
    Sync {
        #[arg(short, long, env = "SCRY_RPC_URL")]
        rpc_url: String,

        #[arg(short, long, env = "SCRY_DATA_DIR", default_value = "data")]
        data_dir: PathBuf,

        /// Concurrent block fetches per scan window.
        #[arg(long, default_value_t = scry_provider::DEFAULT_WINDOW)]
        window: usize,

        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Render a query view over the cached snapshot.
    View {
        #[arg(value_enum)]
        kind: ViewArg,

        #[arg(short, long, env = "SCRY_RPC_URL")]
        rpc_url: String,

        #[arg(short, long, env = "SCRY_DATA_DIR", default_value = "data")]
        data_dir: PathBuf,

        /// Run a sync pass before rendering.
        #[arg(long, default_value_t = false)]
        sync: bool,
    },

    /// Hour-bucketed transaction activity from the cached snapshot.
    Heatmap {
        #[arg(short, long, env = "SCRY_DATA_DIR", default_value = "data")]
        data_dir: PathBuf,

        /// Reduce hour buckets to per-day totals.
        #[arg(long, default_value_t = false)]
        daily: bool,
    },

    /// Look up a block by number or hash.
    Block {
        id: String,

        #[arg(short, long, env = "SCRY_RPC_URL")]
        rpc_url: String,
    },

    /// Look up a transaction by hash.
    Tx {
        hash: B256,

        #[arg(short, long, env = "SCRY_RPC_URL")]
        rpc_url: String,
    },

    /// Balance, nonce, and cached history for an address.
    Address {
        address: Address,

        #[arg(short, long, env = "SCRY_RPC_URL")]
        rpc_url: String,

        #[arg(short, long, env = "SCRY_DATA_DIR", default_value = "data")]
        data_dir: PathBuf,
    },

    /// Delete the persisted cache.
    Reset {
        #[arg(short, long, env = "SCRY_DATA_DIR", default_value = "data")]
        data_dir: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    if let Err(err) = run(cli).await {
        // The one wire error shape; the exit code stands in for a non-2xx status.
        println!("{}", views::error_body(&err));
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> ScryResult<()> {
    match cli.command {
        Commands::Sync {
            rpc_url,
            data_dir,
            window,
            json,
        } => {
            let reader = connect(&rpc_url).await?;
            let (progress_tx, mut progress_rx) = mpsc::unbounded_channel::<ScanProgress>();
            let progress_logger = tokio::spawn(async move {
                while let Some(p) = progress_rx.recv().await {
                    tracing::info!(scanned = p.scanned, total = p.total, "scan progress");
                }
            });

            let orchestrator = SyncOrchestrator::new(reader, CacheStore::new(&data_dir))
                .with_window(window)
                .with_progress(progress_tx);
            let (cache, report) = orchestrator.sync().await?;

            drop(orchestrator);
            let _ = progress_logger.await;

            if json {
                print_json(&serde_json::to_value(&report).map_err(|e| {
                    ScryError::Internal(format!("serialize report: {e}"))
                })?)?;
            } else {
                print!("{}", render_report(&report, &cache));
            }
        }

        Commands::View {
            kind,
            rpc_url,
            data_dir,
            sync,
        } => {
            let reader = connect(&rpc_url).await?;
            let store = CacheStore::new(&data_dir);

            let cache = if sync {
                let orchestrator = SyncOrchestrator::new(Arc::clone(&reader), store);
                let (cache, _) = orchestrator.sync().await?;
                cache
            } else {
                store.load()
            };

            let server = ViewServer::new(reader);
            print_json(&server.render(kind.into(), &cache).await?)?;
        }

        Commands::Heatmap { data_dir, daily } => {
            let cache = CacheStore::new(&data_dir).load();
            print_json(&views::heatmap_view(&cache, daily)?)?;
        }

        Commands::Block { id, rpc_url } => {
            let server = ViewServer::new(connect(&rpc_url).await?);
            print_json(&server.block_detail(parse_block_id(&id)?).await?)?;
        }

        Commands::Tx { hash, rpc_url } => {
            let server = ViewServer::new(connect(&rpc_url).await?);
            print_json(&server.tx_detail(hash).await?)?;
        }

        Commands::Address {
            address,
            rpc_url,
            data_dir,
        } => {
            let cache = CacheStore::new(&data_dir).load();
            let server = ViewServer::new(connect(&rpc_url).await?);
            print_json(&server.address_detail(&cache, address).await?)?;
        }

        Commands::Reset { data_dir } => {
            CacheStore::new(&data_dir).reset()?;
            println!("cache reset");
        }
    }

    Ok(())
}

async fn connect(rpc_url: &str) -> ScryResult<Arc<dyn ChainReader>> {
    Ok(Arc::new(RpcReader::connect(rpc_url).await?))
}

fn parse_block_id(input: &str) -> ScryResult<BlockId> {
    if input.starts_with("0x") {
        let hash: B256 = input
            .parse()
            .map_err(|e| ScryError::InvalidInput(format!("bad block hash {input}: {e}")))?;
        Ok(hash.into())
    } else {
        let number: u64 = input
            .parse()
            .map_err(|e| ScryError::InvalidInput(format!("bad block number {input}: {e}")))?;
        Ok(number.into())
    }
}

fn print_json(value: &serde_json::Value) -> ScryResult<()> {
    let rendered = serde_json::to_string_pretty(value)
        .map_err(|e| ScryError::Internal(format!("render output: {e}")))?;
    println!("{rendered}");
    Ok(())
}

fn render_report(report: &SyncReport, cache: &Cache) -> String {
    let mut out = String::new();
    out.push('\n');
    out.push_str("╔══════════════════════════════════════════════╗\n");
    out.push_str("║               SCRY SYNC REPORT               ║\n");
    out.push_str("╠══════════════════════════════════════════════╣\n");

    if report.no_op {
        out.push_str(&format!(
            "║  Already at height {:>22}    ║\n",
            report.end_height
        ));
    } else {
        out.push_str(&format!(
            "║  Cursor:           {:>10} -> {:>10}  ║\n",
            report.start_height, report.end_height
        ));
        out.push_str(&format!(
            "║  Blocks scanned:   {:>24}  ║\n",
            report.scanned_blocks
        ));
        out.push_str(&format!(
            "║  New transactions: {:>24}  ║\n",
            report.new_transactions
        ));
        out.push_str(&format!(
            "║  New contracts:    {:>24}  ║\n",
            report.new_contracts
        ));
        out.push_str(&format!(
            "║  New tokens:       {:>24}  ║\n",
            report.new_tokens
        ));
        out.push_str(&format!(
            "║  Elapsed:          {:>22}ms  ║\n",
            report.elapsed_ms
        ));
    }

    out.push_str("╠══════════════════════════════════════════════╣\n");
    out.push_str(&format!(
        "║  Cache: {:>6} blocks {:>6} txs {:>4} tokens ║\n",
        cache.blocks.len(),
        cache.transactions.len(),
        cache.tokens.len()
    ));

    if !report.incomplete_blocks.is_empty() {
        out.push_str(&format!(
            "║  Incomplete blocks (retrying next sync): {:>3} ║\n",
            report.incomplete_blocks.len()
        ));
    }

    out.push_str("╚══════════════════════════════════════════════╝\n");
    out
}
