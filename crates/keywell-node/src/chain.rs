//! Minimal in-memory chain.
//!
//! Just enough chain to give mining a destination for its reward keys:
//! a genesis block, an append-only list of connected blocks, and the
//! validation rules a block must pass to extend the tip.

use tracing::info;

use keywell_core::block_validation::{check_aux_pow, check_pow};
use keywell_core::constants::{BLOCK_REWARD, BLOCK_VERSION};
use keywell_core::error::BlockError;
use keywell_core::types::{Block, BlockHeader, Hash256};

/// Timestamp of the genesis block (Unix seconds).
pub const GENESIS_TIMESTAMP: u64 = 1_700_000_000;

/// Append-only chain of blocks, genesis at index 0.
#[derive(Debug, Clone)]
pub struct Chain {
    blocks: Vec<Block>,
    target: u64,
}

impl Chain {
    /// A chain holding only its genesis block.
    pub fn new(target: u64) -> Self {
        Self {
            blocks: vec![genesis_block(target)],
            target,
        }
    }

    /// Height of the tip (genesis is 0).
    pub fn height(&self) -> u64 {
        self.blocks.len() as u64 - 1
    }

    pub fn tip(&self) -> &Block {
        // Never empty: constructed with genesis and only appended to.
        &self.blocks[self.blocks.len() - 1]
    }

    pub fn tip_hash(&self) -> Hash256 {
        self.tip().hash()
    }

    pub fn target(&self) -> u64 {
        self.target
    }

    /// An unsolved block extending the tip, paying the reward to `pubkey_hash`.
    pub fn build_template(&self, pubkey_hash: Hash256, now_secs: u64) -> Block {
        let tip = self.tip();
        let height = tip.height + 1;
        Block {
            header: BlockHeader {
                version: BLOCK_VERSION,
                prev_hash: tip.hash(),
                merkle_root: Block::body_commitment(height, &pubkey_hash, BLOCK_REWARD),
                timestamp: now_secs.max(tip.header.timestamp + 1),
                difficulty_target: self.target,
                nonce: 0,
            },
            height,
            coinbase_pubkey_hash: pubkey_hash,
            reward: BLOCK_REWARD,
        }
    }

    /// Connect a block carrying its own proof-of-work.
    pub fn connect(&mut self, block: Block) -> Result<Hash256, BlockError> {
        self.check_extends_tip(&block)?;
        if !check_pow(&block) {
            return Err(BlockError::InvalidPoW);
        }
        Ok(self.append(block))
    }

    /// Connect a block whose proof-of-work was done on a parent chain.
    pub fn connect_aux(&mut self, block: Block, proof: &[u8]) -> Result<Hash256, BlockError> {
        self.check_extends_tip(&block)?;
        check_aux_pow(&block.hash(), proof, self.target)?;
        Ok(self.append(block))
    }

    fn check_extends_tip(&self, block: &Block) -> Result<(), BlockError> {
        let tip = self.tip();
        let tip_hash = tip.hash();
        if block.header.prev_hash != tip_hash {
            return Err(BlockError::InvalidPrevHash {
                expected: tip_hash.to_hex(),
                got: block.header.prev_hash.to_hex(),
            });
        }
        if block.height != tip.height + 1 {
            return Err(BlockError::InvalidHeight {
                expected: tip.height + 1,
                got: block.height,
            });
        }
        if block.header.timestamp <= tip.header.timestamp {
            return Err(BlockError::TimestampNotAfterParent);
        }
        if !block.commitment_matches() {
            return Err(BlockError::BadCommitment);
        }
        if block.header.difficulty_target > self.target {
            return Err(BlockError::InvalidPoW);
        }
        Ok(())
    }

    fn append(&mut self, block: Block) -> Hash256 {
        let hash = block.hash();
        info!(height = block.height, %hash, "connected block");
        self.blocks.push(block);
        hash
    }
}

fn genesis_block(target: u64) -> Block {
    Block {
        header: BlockHeader {
            version: BLOCK_VERSION,
            prev_hash: Hash256::ZERO,
            merkle_root: Block::body_commitment(0, &Hash256::ZERO, 0),
            timestamp: GENESIS_TIMESTAMP,
            difficulty_target: target,
            nonce: 0,
        },
        height: 0,
        coinbase_pubkey_hash: Hash256::ZERO,
        reward: 0,
    }
}
