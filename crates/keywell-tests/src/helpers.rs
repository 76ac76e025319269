//! Shared test helpers for E2E and RPC tests.

use std::path::Path;
use std::sync::Arc;

use keywell_core::traits::ManualClock;
use keywell_node_lib::{Node, NodeConfig};
use keywell_wallet::{KdfParams, WalletConfig};

/// Wallet passphrase used throughout the suite.
pub const PASS: &str = "test";

/// Start of test time (Unix milliseconds).
pub const START_MS: u64 = 1_800_000_000_000;

/// Cheap Argon2 parameters so encryption stays fast in tests.
pub const FAST_KDF: KdfParams = KdfParams {
    m_cost_kib: 64,
    t_cost: 1,
};

/// Node config rooted at `dir` with the given keypool target.
pub fn test_config(dir: &Path, keypool_size: usize) -> NodeConfig {
    NodeConfig {
        data_dir: dir.to_path_buf(),
        rpc_port: 0,
        wallet: WalletConfig {
            keypool_size,
            kdf: FAST_KDF,
            ..WalletConfig::default()
        },
        ..NodeConfig::default()
    }
}

/// A fresh node on a manual clock, backed by a temp directory.
pub fn test_node(keypool_size: usize) -> (Arc<Node>, ManualClock, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let clock = ManualClock::new(START_MS);
    let node = open_node(dir.path(), keypool_size, &clock);
    (node, clock, dir)
}

/// Open (or reopen) the node stored in `dir`.
pub fn open_node(dir: &Path, keypool_size: usize, clock: &ManualClock) -> Arc<Node> {
    Node::with_clock(test_config(dir, keypool_size), Arc::new(clock.clone())).unwrap()
}
