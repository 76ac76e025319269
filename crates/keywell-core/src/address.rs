//! Base58Check addresses.
//!
//! An address is `version || pubkey_hash || checksum` where the checksum is
//! the first four bytes of the double SHA-256 of the preceding 33 bytes.
//! The version byte selects the network.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::crypto::PublicKey;
use crate::types::{sha256d, Hash256};

const CHECKSUM_LEN: usize = 4;
const PAYLOAD_LEN: usize = 1 + 32;

/// Network an address belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Mainnet,
    Testnet,
    #[default]
    Regtest,
}

impl Network {
    /// Address version byte.
    pub fn version_byte(&self) -> u8 {
        match self {
            Network::Mainnet => 0x34,
            Network::Testnet => 0x6f,
            Network::Regtest => 0x70,
        }
    }
}

/// A pay-to-pubkey-hash address.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Address {
    network: Network,
    pubkey_hash: Hash256,
}

impl Address {
    pub fn from_pubkey_hash(pubkey_hash: Hash256, network: Network) -> Self {
        Self {
            network,
            pubkey_hash,
        }
    }

    pub fn from_public_key(public_key: &PublicKey, network: Network) -> Self {
        Self::from_pubkey_hash(public_key.pubkey_hash(), network)
    }

    pub fn pubkey_hash(&self) -> Hash256 {
        self.pubkey_hash
    }

    pub fn network(&self) -> Network {
        self.network
    }

    /// Encode as Base58Check.
    pub fn encode(&self) -> String {
        let mut raw = Vec::with_capacity(PAYLOAD_LEN + CHECKSUM_LEN);
        raw.push(self.network.version_byte());
        raw.extend_from_slice(self.pubkey_hash.as_bytes());
        let checksum = sha256d(&raw);
        raw.extend_from_slice(&checksum.as_bytes()[..CHECKSUM_LEN]);
        bs58::encode(raw).into_string()
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}
