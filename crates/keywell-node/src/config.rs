//! Node configuration for the Keywell wallet node.
//!
//! [`NodeConfig`] carries defaults for the data directory, RPC binding,
//! relock cadence and mining target. [`NodeConfig::load`] layers an optional
//! config file and `KEYWELL_*` environment variables over those defaults;
//! nested keys use a double underscore (`KEYWELL_WALLET__KEYPOOL_SIZE=5`).

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use keywell_core::constants::{DEFAULT_RELOCK_INTERVAL_MS, DEFAULT_RPC_PORT, REGTEST_TARGET};
use keywell_wallet::WalletConfig;

use crate::error::NodeError;

/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "KEYWELL";

/// Default nonce budget per generated block.
pub const DEFAULT_MAX_NONCE: u64 = 10_000_000;

/// Wallet file name inside the data directory.
pub const WALLET_FILE: &str = "wallet.dat";

/// Configuration for a node instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Root directory for all persistent data.
    pub data_dir: PathBuf,
    /// IP address for the JSON-RPC server to bind to.
    pub rpc_bind: String,
    /// Port for the JSON-RPC server.
    pub rpc_port: u16,
    /// Log level filter string (e.g. "info", "debug", "keywell_wallet=trace").
    pub log_level: String,
    /// How often the background driver checks for unlock expiry.
    pub relock_interval_ms: u64,
    /// Proof-of-work target for native and aux blocks.
    pub mining_target: u64,
    /// Nonces tried per block before `generate` gives up.
    pub max_nonce: u64,
    pub wallet: WalletConfig,
}

impl Default for NodeConfig {
    fn default() -> Self {
        let data_dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("keywell");

        Self {
            data_dir,
            rpc_bind: "127.0.0.1".to_string(),
            rpc_port: DEFAULT_RPC_PORT,
            log_level: "info".to_string(),
            relock_interval_ms: DEFAULT_RELOCK_INTERVAL_MS,
            mining_target: REGTEST_TARGET,
            max_nonce: DEFAULT_MAX_NONCE,
            wallet: WalletConfig::default(),
        }
    }
}

impl NodeConfig {
    /// Load defaults, then `path` (if given), then `KEYWELL_*` variables.
    pub fn load(path: Option<&Path>) -> Result<Self, NodeError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );
        builder
            .build()
            .and_then(|c| c.try_deserialize::<NodeConfig>())
            .map_err(|e| NodeError::Config(e.to_string()))
    }

    /// Path to the wallet file.
    pub fn wallet_path(&self) -> PathBuf {
        self.data_dir.join(WALLET_FILE)
    }

    /// Socket address string for the RPC server.
    pub fn rpc_addr(&self) -> String {
        format!("{}:{}", self.rpc_bind, self.rpc_port)
    }

    pub fn relock_interval(&self) -> Duration {
        Duration::from_millis(self.relock_interval_ms.max(1))
    }
}
