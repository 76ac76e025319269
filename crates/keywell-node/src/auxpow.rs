//! Pending merged-mining templates.
//!
//! Each `getauxblock` call hands a parent-chain miner a block whose reward
//! key is reserved, not consumed. The manager remembers those templates by
//! hash together with their reservation handles; the node releases the
//! handles when a template is superseded or made stale, and commits exactly
//! one of them when its proof is accepted.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use keywell_core::constants::AUXPOW_CHAIN_ID;
use keywell_core::types::{Block, Hash256};
use keywell_wallet::ReservationHandle;

/// A template waiting for an aux proof.
#[derive(Debug, Clone)]
pub struct PendingAuxBlock {
    pub block: Block,
    pub handle: ReservationHandle,
}

/// Work description returned to the parent-chain miner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuxBlock {
    /// Block hash the proof must commit to, as hex.
    pub hash: String,
    #[serde(rename = "chainid")]
    pub chain_id: u32,
    #[serde(rename = "previousblockhash")]
    pub previous_block_hash: String,
    #[serde(rename = "coinbasevalue")]
    pub coinbase_value: u64,
    /// Target as 16 big-endian hex digits.
    pub bits: String,
    pub height: u64,
    /// Target as little-endian hex bytes.
    #[serde(rename = "_target")]
    pub target: String,
}

impl AuxBlock {
    pub fn from_block(block: &Block) -> Self {
        let target = block.header.difficulty_target;
        Self {
            hash: block.hash().to_hex(),
            chain_id: AUXPOW_CHAIN_ID,
            previous_block_hash: block.header.prev_hash.to_hex(),
            coinbase_value: block.reward,
            bits: format!("{target:016x}"),
            height: block.height,
            target: hex::encode(target.to_le_bytes()),
        }
    }

    /// Decode `_target` back into the numeric target.
    pub fn target_value(&self) -> Option<u64> {
        let bytes: [u8; 8] = hex::decode(&self.target).ok()?.try_into().ok()?;
        Some(u64::from_le_bytes(bytes))
    }
}

/// Templates handed out and not yet resolved.
#[derive(Debug, Default)]
pub struct AuxBlockManager {
    pending: HashMap<Hash256, PendingAuxBlock>,
}

impl AuxBlockManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember a template; returns its hash.
    pub fn insert(&mut self, block: Block, handle: ReservationHandle) -> Hash256 {
        let hash = block.hash();
        self.pending.insert(hash, PendingAuxBlock { block, handle });
        hash
    }

    pub fn get(&self, hash: &Hash256) -> Option<&PendingAuxBlock> {
        self.pending.get(hash)
    }

    pub fn remove(&mut self, hash: &Hash256) -> Option<PendingAuxBlock> {
        self.pending.remove(hash)
    }

    /// Forget every pending template, returning the reservations to resolve.
    ///
    /// Handles come back in checkout order.
    pub fn drain(&mut self) -> Vec<ReservationHandle> {
        let mut handles: Vec<ReservationHandle> =
            self.pending.drain().map(|(_, p)| p.handle).collect();
        handles.sort_unstable();
        handles
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::Chain;
    use keywell_wallet::{KeyPool, KeyPurpose, KeyStore, KdfParams, ReservationManager, Seed};

    fn handles(n: usize) -> Vec<ReservationHandle> {
        let mut store = KeyStore::new(Seed::from_bytes([4u8; 32]), KdfParams::default());
        let mut pool = KeyPool::new();
        pool.refill(&mut store, n, 0).unwrap();
        let mut mgr = ReservationManager::new();
        (0..n)
            .map(|_| mgr.reserve(&mut pool, KeyPurpose::AuxMining, 0).unwrap())
            .collect()
    }

    #[test]
    fn insert_get_remove() {
        let chain = Chain::new(u64::MAX);
        let block = chain.build_template(Hash256([1; 32]), 0);
        let handle = handles(1)[0];
        let mut aux = AuxBlockManager::new();
        let hash = aux.insert(block.clone(), handle);
        assert_eq!(hash, block.hash());
        assert_eq!(aux.get(&hash).unwrap().handle, handle);
        assert_eq!(aux.remove(&hash).unwrap().block, block);
        assert!(aux.is_empty());
    }

    #[test]
    fn drain_returns_handles_in_order() {
        let chain = Chain::new(u64::MAX);
        let hs = handles(3);
        let mut aux = AuxBlockManager::new();
        for (i, h) in hs.iter().enumerate() {
            aux.insert(chain.build_template(Hash256([i as u8; 32]), 0), *h);
        }
        assert_eq!(aux.len(), 3);
        assert_eq!(aux.drain(), hs);
        assert!(aux.is_empty());
    }

    #[test]
    fn aux_block_json_shape() {
        let chain = Chain::new(0x00ff_ffff_ffff_ffff);
        let block = chain.build_template(Hash256([9; 32]), 0);
        let aux = AuxBlock::from_block(&block);
        assert_eq!(aux.target_value(), Some(0x00ff_ffff_ffff_ffff));
        assert_eq!(aux.bits, "00ffffffffffffff");

        let json = serde_json::to_value(&aux).unwrap();
        assert_eq!(json["chainid"], AUXPOW_CHAIN_ID);
        assert_eq!(json["height"], 1);
        assert_eq!(json["hash"], block.hash().to_hex());
        assert!(json.get("_target").is_some());
    }
}
