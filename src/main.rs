//! regiondb node daemon.
//!
//! Starts the SQL listener and the RPC listener of one cluster node,
//! registers the node with itself and, when `--join` is given, with the
//! bootstrap peer.
//!
//! # Usage
//!
//! ```bash
//! # First node of a cluster
//! regiondb --region asia --sql-addr 127.0.0.1:5432 --rpc-addr 127.0.0.1:50051
//!
//! # Second node joining the first
//! regiondb --region eu --sql-addr 127.0.0.1:5433 --rpc-addr 127.0.0.1:50052 \
//!     --join 127.0.0.1:50051
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::net::TcpListener;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

use regiondb::cluster::ServerRegistry;
use regiondb::config::{ServerConfig, StorageKind};
use regiondb::db::Database;
use regiondb::kv::{FileKvStore, KvStore, MemoryKvStore};
use regiondb::rpc::{RpcServer, TcpPeerClient};
use regiondb::server::Server;

/// regiondb node
#[derive(Parser, Debug)]
#[command(
    name = "regiondb",
    version,
    about = "PostgreSQL-wire front-end routing partitioned inserts across a cluster"
)]
struct Args {
    /// Configuration file path
    #[arg(short = 'c', long, value_name = "FILE", env = "REGIONDB_CONFIG")]
    config: Option<PathBuf>,

    /// SQL listen address
    #[arg(long, env = "REGIONDB_SQL_ADDR")]
    sql_addr: Option<String>,

    /// RPC listen address
    #[arg(long, env = "REGIONDB_RPC_ADDR")]
    rpc_addr: Option<String>,

    /// Region label of this node
    #[arg(long, env = "REGIONDB_REGION")]
    region: Option<String>,

    /// RPC address of a node already in the cluster
    #[arg(long, env = "REGIONDB_JOIN")]
    join: Option<String>,

    /// Data directory for the metadata log
    #[arg(short = 'd', long, value_name = "DIR", env = "REGIONDB_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Keep everything in memory (no persistence)
    #[arg(long, env = "REGIONDB_MEMORY")]
    memory: bool,

    /// Log level (error, warn, info, debug, trace); RUST_LOG takes precedence
    #[arg(long, default_value = "info", env = "REGIONDB_LOG_LEVEL")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args);

    let config = load_config(&args)?;
    info!(
        sql_addr = %config.sql_addr,
        rpc_addr = %config.rpc_addr,
        region = %config.region,
        storage = ?config.storage,
        "starting regiondb"
    );

    match config.storage {
        StorageKind::Memory => run_node(config, Arc::new(MemoryKvStore::new())).await,
        StorageKind::File => {
            let path = config.metadata_log();
            let store = FileKvStore::open(&path)
                .with_context(|| format!("failed to open {}", path.display()))?;
            run_node(config, Arc::new(store)).await
        }
    }
}

fn init_logging(args: &Args) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(format!("regiondb={}", args.log_level)))
        .unwrap_or_else(|_| EnvFilter::new("regiondb=info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}

fn load_config(args: &Args) -> Result<ServerConfig> {
    let mut config = match &args.config {
        Some(path) => ServerConfig::from_file(path).context("failed to load config file")?,
        None => ServerConfig::default(),
    };

    // Command-line arguments override the file
    if let Some(addr) = &args.sql_addr {
        config.sql_addr = addr.clone();
    }
    if let Some(addr) = &args.rpc_addr {
        config.rpc_addr = addr.clone();
    }
    if let Some(region) = &args.region {
        config.region = region.clone();
    }
    if let Some(join) = &args.join {
        config.join = join.clone();
    }
    if let Some(dir) = &args.data_dir {
        config.data_dir = dir.clone();
    }
    if args.memory {
        config.storage = StorageKind::Memory;
    }

    Ok(config)
}

async fn run_node<S: KvStore + 'static>(config: ServerConfig, store: Arc<S>) -> Result<()> {
    let shutdown = CancellationToken::new();
    let registry = Arc::new(ServerRegistry::new(config.registration));
    let client = Arc::new(TcpPeerClient::new());
    let database = Arc::new(
        Database::open(store.clone(), registry.clone(), client.clone())
            .context("failed to open catalog")?,
    );

    let sql_listener = TcpListener::bind(&config.sql_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.sql_addr))?;
    let rpc_listener = TcpListener::bind(&config.rpc_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.rpc_addr))?;

    let local = config.node_descriptor();
    registry.register(local.clone())?;

    let rpc = tokio::spawn(
        RpcServer::new(rpc_listener, registry.clone(), store, shutdown.clone()).serve(),
    );

    if let Err(e) = registry.join(client.as_ref(), &local, &config.join).await {
        shutdown.cancel();
        return Err(e).context("failed to join cluster");
    }

    let sql = tokio::spawn(Server::new(sql_listener, database, shutdown.clone()).serve());

    signal::ctrl_c().await.context("failed to listen for ctrl-c")?;
    info!("shutdown signal received");
    shutdown.cancel();

    sql.await??;
    rpc.await??;
    info!("regiondb stopped");
    Ok(())
}
