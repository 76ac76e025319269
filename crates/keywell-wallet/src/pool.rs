//! The keypool: pre-generated keys waiting to be handed out.
//!
//! Available keys sit in a FIFO queue, oldest first. Checking a key out moves
//! it out of the queue and marks it `Reserved`; the reservation layer then
//! either marks it `Used` or puts it back at the head of the queue with its
//! original index, so an aborted reservation never burns a derivation index.

use std::collections::{HashMap, VecDeque};

use serde::{Deserialize, Serialize};
use tracing::debug;

use keywell_core::address::{Address, Network};
use keywell_core::crypto::PublicKey;
use keywell_core::types::Hash256;

use crate::error::WalletError;
use crate::keys::KeyStore;

/// Lifecycle state of a pool key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyStatus {
    Available,
    Reserved,
    Used,
}

/// A key generated into the pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolKey {
    /// Derivation index; doubles as the pool sequence number.
    pub index: u64,
    pub public_key: PublicKey,
    /// Unix seconds at generation time.
    pub created_at: u64,
}

impl PoolKey {
    pub fn pubkey_hash(&self) -> Hash256 {
        self.public_key.pubkey_hash()
    }

    pub fn address(&self, network: Network) -> Address {
        Address::from_public_key(&self.public_key, network)
    }
}

/// Ordered pool of available keys plus the status of every key it produced.
#[derive(Debug, Default)]
pub struct KeyPool {
    available: VecDeque<PoolKey>,
    status: HashMap<u64, KeyStatus>,
}

impl KeyPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a pool from persisted state.
    ///
    /// `available` must already be in hand-out order. A key listed twice, or
    /// listed both as available and used, makes the state corrupt: keeping it
    /// would hand the same key out twice or revive a used one.
    pub fn restore(
        available: Vec<PoolKey>,
        used: impl IntoIterator<Item = u64>,
    ) -> Result<Self, WalletError> {
        let mut status: HashMap<u64, KeyStatus> =
            used.into_iter().map(|i| (i, KeyStatus::Used)).collect();
        for key in &available {
            if let Some(prev) = status.insert(key.index, KeyStatus::Available) {
                return Err(WalletError::CorruptedFile(format!(
                    "key {} listed as available and {prev:?}",
                    key.index
                )));
            }
        }
        Ok(Self {
            available: available.into(),
            status,
        })
    }

    /// Number of available keys. Reserved and used keys are not counted.
    pub fn size(&self) -> usize {
        self.available.len()
    }

    pub fn is_empty(&self) -> bool {
        self.available.is_empty()
    }

    /// Generate keys until `size() == target`.
    ///
    /// Fails with [`WalletError::Locked`] whenever the store cannot derive
    /// keys, even if the target is already met. Returns the number of keys
    /// generated.
    pub fn refill(
        &mut self,
        store: &mut KeyStore,
        target: usize,
        now_secs: u64,
    ) -> Result<usize, WalletError> {
        if !store.can_generate() {
            return Err(WalletError::Locked);
        }
        let missing = target.saturating_sub(self.available.len());
        let mut fresh = Vec::with_capacity(missing);
        for _ in 0..missing {
            let generated = store.generate_key()?;
            fresh.push(PoolKey {
                index: generated.index,
                public_key: generated.public_key,
                created_at: now_secs,
            });
        }
        for key in fresh {
            self.status.insert(key.index, KeyStatus::Available);
            self.available.push_back(key);
        }
        if missing > 0 {
            debug!(generated = missing, size = self.available.len(), "keypool refilled");
        }
        Ok(missing)
    }

    /// The key that [`KeyPool::next_available`] would hand out.
    pub fn peek_oldest(&self) -> Option<&PoolKey> {
        self.available.front()
    }

    /// Check out the oldest available key, marking it `Reserved`.
    pub fn next_available(&mut self) -> Result<PoolKey, WalletError> {
        let key = self.available.pop_front().ok_or(WalletError::KeypoolRanOut)?;
        self.status.insert(key.index, KeyStatus::Reserved);
        Ok(key)
    }

    /// Put a reserved key back at the head of the queue.
    pub fn return_to_front(&mut self, key: PoolKey) -> Result<(), WalletError> {
        self.expect_reserved(key.index)?;
        self.status.insert(key.index, KeyStatus::Available);
        self.available.push_front(key);
        Ok(())
    }

    /// Mark a reserved key as permanently consumed.
    pub fn mark_used(&mut self, index: u64) -> Result<(), WalletError> {
        self.expect_reserved(index)?;
        self.status.insert(index, KeyStatus::Used);
        Ok(())
    }

    fn expect_reserved(&self, index: u64) -> Result<(), WalletError> {
        match self.status.get(&index) {
            Some(KeyStatus::Reserved) => Ok(()),
            _ => Err(WalletError::InvalidHandle(index)),
        }
    }

    /// Retire every available key (they are marked used and never handed out).
    pub fn retire_available(&mut self) -> usize {
        let retired = self.available.len();
        for key in self.available.drain(..) {
            self.status.insert(key.index, KeyStatus::Used);
        }
        retired
    }

    pub fn status(&self, index: u64) -> Option<KeyStatus> {
        self.status.get(&index).copied()
    }

    /// Available keys in hand-out order.
    pub fn available(&self) -> impl Iterator<Item = &PoolKey> {
        self.available.iter()
    }

    /// Indices of used keys, ascending.
    pub fn used_indices(&self) -> Vec<u64> {
        let mut used: Vec<u64> = self
            .status
            .iter()
            .filter(|(_, s)| **s == KeyStatus::Used)
            .map(|(i, _)| *i)
            .collect();
        used.sort_unstable();
        used
    }

    pub fn used_count(&self) -> usize {
        self.status.values().filter(|s| **s == KeyStatus::Used).count()
    }

    /// Highest index this pool ever produced.
    pub fn max_index(&self) -> Option<u64> {
        self.status.keys().max().copied()
    }
}
