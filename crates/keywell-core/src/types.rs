//! Hashes, block headers and blocks.
//!
//! Blocks here carry only what the wallet needs to see: the header that is
//! mined and the coinbase destination that a keypool key was reserved for.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// A 32-byte hash value.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Hash256(pub [u8; 32]);

impl Hash256 {
    /// The zero hash. Used as the genesis parent.
    pub const ZERO: Self = Self([0u8; 32]);

    /// Return the underlying bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Parse a 64-character hex string.
    pub fn from_hex(s: &str) -> Option<Self> {
        let bytes = hex::decode(s).ok()?;
        let arr: [u8; 32] = bytes.try_into().ok()?;
        Some(Self(arr))
    }

    /// Hex encoding of the raw bytes.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl From<[u8; 32]> for Hash256 {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

/// Double SHA-256 of arbitrary data.
pub fn sha256d(data: &[u8]) -> Hash256 {
    let first = Sha256::digest(data);
    Hash256(Sha256::digest(first).into())
}

/// Block header: the part that is hashed for proof-of-work.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct BlockHeader {
    /// Protocol version.
    pub version: u64,
    /// Hash of the previous block header.
    pub prev_hash: Hash256,
    /// Commitment to the block body (the coinbase).
    pub merkle_root: Hash256,
    /// Unix timestamp in seconds.
    pub timestamp: u64,
    /// Compact difficulty target.
    pub difficulty_target: u64,
    /// Proof-of-work nonce.
    pub nonce: u64,
}

impl BlockHeader {
    const HASH_SIZE: usize = 4 * 8 + 2 * 32;

    /// Double SHA-256 over the fixed little-endian header layout.
    pub fn hash(&self) -> Hash256 {
        let mut data = Vec::with_capacity(Self::HASH_SIZE);
        data.extend_from_slice(&self.version.to_le_bytes());
        data.extend_from_slice(self.prev_hash.as_bytes());
        data.extend_from_slice(self.merkle_root.as_bytes());
        data.extend_from_slice(&self.timestamp.to_le_bytes());
        data.extend_from_slice(&self.difficulty_target.to_le_bytes());
        data.extend_from_slice(&self.nonce.to_le_bytes());
        sha256d(&data)
    }
}

/// A block paying its reward to a single pubkey hash.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Block {
    /// Header with proof-of-work.
    pub header: BlockHeader,
    /// Height this block claims.
    pub height: u64,
    /// Reward destination.
    pub coinbase_pubkey_hash: Hash256,
    /// Reward amount in base units.
    pub reward: u64,
}

impl Block {
    /// BLAKE3 commitment over the coinbase fields.
    pub fn body_commitment(height: u64, coinbase_pubkey_hash: &Hash256, reward: u64) -> Hash256 {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&height.to_le_bytes());
        hasher.update(coinbase_pubkey_hash.as_bytes());
        hasher.update(&reward.to_le_bytes());
        Hash256(hasher.finalize().into())
    }

    /// Whether the header's merkle root matches the body.
    pub fn commitment_matches(&self) -> bool {
        self.header.merkle_root
            == Self::body_commitment(self.height, &self.coinbase_pubkey_hash, self.reward)
    }

    /// Shortcut for `self.header.hash()`.
    pub fn hash(&self) -> Hash256 {
        self.header.hash()
    }
}
