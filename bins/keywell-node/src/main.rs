//! Keywell wallet node binary.
//!
//! Opens (or creates) the wallet in the data directory, serves the keypool
//! JSON-RPC interface, and relocks the wallet when an unlock period ends.

use std::path::PathBuf;
use std::process;

use clap::Parser;
use keywell_core::address::Network;
use keywell_node_lib::{spawn_relock_driver, start_rpc_server, Node, NodeConfig};
use tracing::{error, info};

/// Keywell wallet node.
#[derive(Parser, Debug)]
#[command(
    name = "keywell-node",
    version,
    about = "Keypool wallet node with JSON-RPC and regtest mining"
)]
struct Args {
    /// Config file (TOML, YAML or JSON). KEYWELL_* env vars override it.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Data directory for the wallet file
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// RPC server bind address
    #[arg(long)]
    rpc_bind: Option<String>,

    /// RPC server port
    #[arg(long)]
    rpc_port: Option<u16>,

    /// Keypool target size used when keypoolrefill is called without a size
    #[arg(long)]
    keypool: Option<usize>,

    /// Address network (mainnet, testnet, regtest)
    #[arg(long, value_parser = parse_network)]
    network: Option<Network>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Log output format ("text" or "json")
    #[arg(long, default_value = "text")]
    log_format: String,
}

fn parse_network(s: &str) -> Result<Network, String> {
    match s {
        "mainnet" => Ok(Network::Mainnet),
        "testnet" => Ok(Network::Testnet),
        "regtest" => Ok(Network::Regtest),
        other => Err(format!("unknown network: {other}")),
    }
}

impl Args {
    /// Apply CLI flags on top of the loaded config.
    fn apply(self, mut config: NodeConfig) -> (NodeConfig, String) {
        if let Some(data_dir) = self.data_dir {
            config.data_dir = data_dir;
        }
        if let Some(rpc_bind) = self.rpc_bind {
            config.rpc_bind = rpc_bind;
        }
        if let Some(rpc_port) = self.rpc_port {
            config.rpc_port = rpc_port;
        }
        if let Some(keypool) = self.keypool {
            config.wallet.keypool_size = keypool;
        }
        if let Some(network) = self.network {
            config.wallet.network = network;
        }
        if let Some(log_level) = self.log_level {
            config.log_level = log_level;
        }
        (config, self.log_format)
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let loaded = match NodeConfig::load(args.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("failed to load config: {e}");
            process::exit(1);
        }
    };
    let (config, log_format) = args.apply(loaded);

    init_logging(&config.log_level, &log_format);

    info!("Keywell node v{}", env!("CARGO_PKG_VERSION"));
    info!("network: {:?}", config.wallet.network);
    info!("data_dir: {:?}", config.data_dir);
    info!("rpc_addr: {}", config.rpc_addr());
    info!("keypool target: {}", config.wallet.keypool_size);

    let node = match Node::new(config.clone()) {
        Ok(n) => n,
        Err(e) => {
            error!("failed to start node: {}", e);
            process::exit(1);
        }
    };

    let info = node.wallet_info();
    info!(
        "wallet: keypool={} encrypted={} height={}",
        info.keypool_size,
        info.encrypted,
        node.block_count()
    );

    let rpc_handle = match start_rpc_server(&config.rpc_addr(), node.clone()).await {
        Ok((addr, handle)) => {
            info!("RPC server listening on {}", addr);
            handle
        }
        Err(e) => {
            error!("failed to start RPC server: {}", e);
            process::exit(1);
        }
    };

    let relock = spawn_relock_driver(node.clone(), config.relock_interval());

    info!("Keywell node running (Ctrl+C to stop)");

    tokio::select! {
        _ = rpc_handle.clone().stopped() => {
            info!("RPC server exited");
        }
        signal = tokio::signal::ctrl_c() => {
            if let Err(e) = signal {
                error!("failed to listen for Ctrl+C: {}", e);
            }
            info!("received Ctrl+C, shutting down...");
        }
    }

    node.shutdown();
    if let Err(e) = relock.await {
        error!("relock driver panicked: {}", e);
    }
    rpc_handle.stop().ok();
    info!("RPC server stopped");
    info!("Keywell node shutdown complete");
}

/// Initialize tracing subscriber with the given log level and output format.
///
/// Pass `format = "json"` for structured JSON output (suitable for log
/// aggregation pipelines). Any other value defaults to human-readable text.
fn init_logging(level_str: &str, format: &str) {
    use tracing_subscriber::filter::EnvFilter;
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level_str));

    if format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_level(true))
            .init();
    }
}
