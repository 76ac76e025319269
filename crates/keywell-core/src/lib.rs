//! # keywell-core
//! Foundation types for the Keywell wallet node: hashes, Ed25519 keys,
//! Base58Check addresses, block headers with mock proof-of-work, and the
//! injectable [`traits::Clock`].

pub mod address;
pub mod block_validation;
pub mod constants;
pub mod crypto;
pub mod error;
pub mod traits;
pub mod types;
