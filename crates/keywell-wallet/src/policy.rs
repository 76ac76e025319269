//! Refill targets, auto top-up, and the exhaustion signal.

use crate::config::WalletConfig;
use crate::error::WalletError;

/// Decides pool sizing and when allocation must be refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolPolicy {
    target_size: usize,
    auto_top_up: bool,
}

impl PoolPolicy {
    pub fn new(target_size: usize, auto_top_up: bool) -> Self {
        Self {
            target_size,
            auto_top_up,
        }
    }

    pub fn from_config(config: &WalletConfig) -> Self {
        Self::new(config.keypool_size, config.auto_top_up)
    }

    pub fn target_size(&self) -> usize {
        self.target_size
    }

    /// Explicit target, or the configured one.
    pub fn resolve_target(&self, requested: Option<usize>) -> usize {
        requested.unwrap_or(self.target_size)
    }

    /// Whether a reservation should first top the pool up.
    pub fn wants_top_up(&self, can_generate: bool, pool_size: usize) -> bool {
        self.auto_top_up && can_generate && pool_size < self.target_size
    }

    /// The single place that turns "no available keys" into an error.
    pub fn ensure_available(&self, pool_size: usize) -> Result<(), WalletError> {
        if pool_size == 0 {
            return Err(WalletError::KeypoolRanOut);
        }
        Ok(())
    }
}
