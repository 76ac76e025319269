//! Error types for the Keywell core crate.
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    #[error("invalid public key bytes")] InvalidPublicKey,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BlockError {
    #[error("invalid PoW")] InvalidPoW,
    #[error("invalid prev hash: expected {expected}, got {got}")] InvalidPrevHash { expected: String, got: String },
    #[error("invalid height: expected {expected}, got {got}")] InvalidHeight { expected: u64, got: u64 },
    #[error("timestamp not after parent")] TimestampNotAfterParent,
    #[error("header does not commit to block body")] BadCommitment,
}
