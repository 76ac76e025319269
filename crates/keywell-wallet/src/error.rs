//! Wallet error types.

use keywell_core::error::CryptoError;
use thiserror::Error;

/// Errors that can occur in wallet operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WalletError {
    /// No available keys left in the keypool.
    #[error("keypool ran out, please call keypoolrefill first")]
    KeypoolRanOut,

    /// New key material was requested while the wallet is locked.
    #[error("wallet is locked, unlock it with the passphrase first")]
    Locked,

    /// Unlock attempted with the wrong passphrase.
    #[error("the wallet passphrase entered was incorrect")]
    InvalidPassphrase,

    /// Commit or release on a reservation that is unknown or already resolved.
    #[error("unknown or already resolved reservation: {0}")]
    InvalidHandle(u64),

    /// Lock/unlock requested on a wallet that has no passphrase.
    #[error("wallet is not encrypted")]
    NotEncrypted,

    /// Encryption requested on a wallet that already has a passphrase.
    #[error("wallet is already encrypted")]
    AlreadyEncrypted,

    /// Encryption requested while keys derived in the clear are checked out.
    #[error("{0} reservation(s) outstanding, commit or release them before encrypting")]
    ReservationsOutstanding(usize),

    /// Encryption failure.
    #[error("encryption: {0}")]
    Encryption(String),

    /// Decryption failure other than a wrong passphrase.
    #[error("decryption: {0}")]
    Decryption(String),

    /// Wallet file is corrupted or has invalid format.
    #[error("corrupted file: {0}")]
    CorruptedFile(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    IoError(String),

    /// Serialization error.
    #[error("serialization: {0}")]
    Serialization(String),

    /// Cryptographic error from keywell-core.
    #[error(transparent)]
    Crypto(#[from] CryptoError),
}

impl WalletError {
    /// True for the one error that means "no keys left, refill and retry".
    pub fn is_pool_exhausted(&self) -> bool {
        matches!(self, WalletError::KeypoolRanOut)
    }
}
