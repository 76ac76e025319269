//! Mock proof-of-work checks for native and auxiliary mining.
//!
//! A hash satisfies a target when its first eight bytes, read little-endian,
//! do not exceed the target. Auxiliary proofs are checked the same way over
//! `sha256d(block_hash || proof)`, so a parent chain "commits" to our block by
//! hashing it together with its own solution bytes.

use crate::error::BlockError;
use crate::types::{sha256d, Block, Hash256};

/// Read the little-endian `u64` prefix of a hash.
fn hash_prefix(hash: &Hash256) -> u64 {
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&hash.0[..8]);
    u64::from_le_bytes(prefix)
}

pub fn meets_target(hash: &Hash256, target: u64) -> bool {
    hash_prefix(hash) <= target
}

/// Check the block header's own proof-of-work.
pub fn check_pow(block: &Block) -> bool {
    meets_target(&block.header.hash(), block.header.difficulty_target)
}

/// Check an auxiliary proof-of-work submitted for `block_hash`.
pub fn check_aux_pow(block_hash: &Hash256, proof: &[u8], target: u64) -> Result<(), BlockError> {
    let mut data = Vec::with_capacity(32 + proof.len());
    data.extend_from_slice(block_hash.as_bytes());
    data.extend_from_slice(proof);
    if meets_target(&sha256d(&data), target) {
        Ok(())
    } else {
        Err(BlockError::InvalidPoW)
    }
}

/// Search nonces in `[0, max_nonce]` until the header meets its target.
pub fn mine_block(block: &mut Block, max_nonce: u64) -> bool {
    for nonce in 0..=max_nonce {
        block.header.nonce = nonce;
        if check_pow(block) {
            return true;
        }
    }
    false
}

/// Search for an auxiliary proof (an 8-byte little-endian counter) for `block_hash`.
pub fn solve_aux_pow(block_hash: &Hash256, target: u64, max_tries: u64) -> Option<Vec<u8>> {
    (0..=max_tries)
        .map(|n| n.to_le_bytes().to_vec())
        .find(|proof| check_aux_pow(block_hash, proof, target).is_ok())
}
