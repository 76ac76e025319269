//! # keywell-wallet — keypool lifecycle manager.
//!
//! Hands out pre-generated keys for receiving addresses, change outputs and
//! block rewards without needing the wallet passphrase at the moment of use.
//! Keys move `Available -> Reserved -> Used` (commit) or back to
//! `Available` (release); only generating new keys needs an unlocked wallet.
//!
//! # Modules
//!
//! - [`error`] — `WalletError` enum
//! - [`encryption`] — AES-256-GCM sealing with Argon2id key derivation
//! - [`keys`] — Seed and the key material store
//! - [`pool`] — ordered pool of available keys
//! - [`reservation`] — in-flight key checkouts
//! - [`unlock`] — passphrase unlock expiry
//! - [`policy`] — refill targets and exhaustion
//! - [`config`] — `WalletConfig`
//! - [`wallet`] — the aggregate tying everything together, plus persistence

pub mod config;
pub mod encryption;
pub mod error;
pub mod keys;
pub mod policy;
pub mod pool;
pub mod reservation;
pub mod unlock;
pub mod wallet;

pub use config::WalletConfig;
pub use encryption::KdfParams;
pub use error::WalletError;
pub use keys::{KeyStore, Seed};
pub use policy::PoolPolicy;
pub use pool::{KeyPool, KeyStatus, PoolKey};
pub use reservation::{KeyPurpose, Reservation, ReservationHandle, ReservationManager};
pub use unlock::{UnlockState, UnlockTimer};
pub use wallet::{Wallet, WalletInfo};
