//! Node error types.

use keywell_core::error::BlockError;
use keywell_wallet::WalletError;
use thiserror::Error;

/// Errors surfaced by node operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NodeError {
    /// Wallet failure, including keypool exhaustion.
    #[error(transparent)]
    Wallet(#[from] WalletError),

    /// Block rejected by the chain.
    #[error(transparent)]
    Block(#[from] BlockError),

    /// Aux block submission for a hash with no pending template.
    #[error("unknown aux block: {0}")]
    UnknownAuxBlock(String),

    /// Aux proof-of-work does not meet the target.
    #[error("aux proof-of-work does not meet target")]
    InvalidAuxPow,

    /// No nonce satisfied the target.
    #[error("no proof-of-work found within {0} nonces")]
    MiningFailed(u64),

    /// Configuration could not be loaded.
    #[error("config: {0}")]
    Config(String),

    /// Data directory or RPC server setup failure.
    #[error("storage: {0}")]
    Storage(String),
}

impl NodeError {
    /// True when the underlying cause is an empty keypool.
    pub fn is_pool_exhausted(&self) -> bool {
        matches!(self, NodeError::Wallet(e) if e.is_pool_exhausted())
    }
}
