//! Wallet configuration.

use serde::{Deserialize, Serialize};

use keywell_core::address::Network;
use keywell_core::constants::DEFAULT_KEYPOOL_SIZE;

use crate::encryption::KdfParams;

/// Settings for a [`Wallet`](crate::wallet::Wallet).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalletConfig {
    /// Refill target used when none is given explicitly.
    pub keypool_size: usize,
    /// Top the pool up before each reservation when keys can be generated.
    pub auto_top_up: bool,
    /// Network used to render addresses.
    pub network: Network,
    /// Argon2id cost for sealing the seed.
    pub kdf: KdfParams,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            keypool_size: DEFAULT_KEYPOOL_SIZE,
            auto_top_up: true,
            network: Network::default(),
            kdf: KdfParams::default(),
        }
    }
}
