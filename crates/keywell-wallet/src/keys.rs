//! Seed management and the key material store.
//!
//! Keys derive deterministically from a 32-byte master seed: child `i` is the
//! Ed25519 key whose secret is `BLAKE3-derive_key(ctx, seed || i)`. Generating
//! a key therefore needs the plaintext seed. An encrypted store keeps only the
//! sealed seed at rest and holds the plaintext while unlocked, so locking is
//! exactly what prevents new key generation.

use std::fmt;

use zeroize::{Zeroize, ZeroizeOnDrop};

use keywell_core::crypto::{KeyPair, PublicKey};

use crate::encryption::{self, KdfParams};
use crate::error::WalletError;

/// BLAKE3 KDF context for child key derivation.
const KDF_CONTEXT: &str = "keywell-wallet-key-derivation-v1";

/// A 32-byte master seed.
///
/// Zeroized on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct Seed {
    bytes: [u8; 32],
}

impl Seed {
    /// Generate a random seed from the OS RNG.
    pub fn generate() -> Self {
        use rand::RngCore;
        let mut bytes = [0u8; 32];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        Self { bytes }
    }

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self { bytes }
    }

    /// Raw seed bytes. Handle with care.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.bytes
    }

    pub(crate) fn from_slice(bytes: &[u8]) -> Result<Self, WalletError> {
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| WalletError::CorruptedFile(format!("seed is {} bytes", bytes.len())))?;
        Ok(Self { bytes: arr })
    }
}

impl fmt::Debug for Seed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Seed").field("bytes", &"[REDACTED]").finish()
    }
}

/// Derive the keypair for child `index`.
fn derive_child_keypair(seed: &Seed, index: u64) -> KeyPair {
    let mut ikm = [0u8; 40];
    ikm[..32].copy_from_slice(seed.as_bytes());
    ikm[32..].copy_from_slice(&index.to_le_bytes());
    let derived = blake3::derive_key(KDF_CONTEXT, &ikm);
    ikm.zeroize();
    KeyPair::from_secret_bytes(derived)
}

/// Seed custody: in the clear, or sealed with an optional unlocked copy.
enum SeedState {
    Plain(Seed),
    Sealed {
        sealed: Vec<u8>,
        unlocked: Option<Seed>,
    },
}

/// A freshly derived key: its derivation index and public half.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedKey {
    pub index: u64,
    pub public_key: PublicKey,
}

/// Generates and custodies key material.
pub struct KeyStore {
    seed: SeedState,
    kdf: KdfParams,
    next_index: u64,
}

impl KeyStore {
    /// A new unencrypted store.
    pub fn new(seed: Seed, kdf: KdfParams) -> Self {
        Self {
            seed: SeedState::Plain(seed),
            kdf,
            next_index: 0,
        }
    }

    /// Rebuild a locked encrypted store from its sealed seed.
    pub fn from_sealed(sealed: Vec<u8>, next_index: u64, kdf: KdfParams) -> Self {
        Self {
            seed: SeedState::Sealed {
                sealed,
                unlocked: None,
            },
            kdf,
            next_index,
        }
    }

    /// Rebuild an unencrypted store.
    pub fn from_plain(seed: Seed, next_index: u64, kdf: KdfParams) -> Self {
        Self {
            seed: SeedState::Plain(seed),
            kdf,
            next_index,
        }
    }

    pub fn is_encrypted(&self) -> bool {
        matches!(self.seed, SeedState::Sealed { .. })
    }

    /// Whether the plaintext seed is in hand.
    pub fn can_generate(&self) -> bool {
        self.live_seed().is_some()
    }

    /// The next derivation index that will be used.
    pub fn next_index(&self) -> u64 {
        self.next_index
    }

    fn live_seed(&self) -> Option<&Seed> {
        match &self.seed {
            SeedState::Plain(seed) => Some(seed),
            SeedState::Sealed { unlocked, .. } => unlocked.as_ref(),
        }
    }

    /// Derive the next key, advancing the index.
    pub fn generate_key(&mut self) -> Result<GeneratedKey, WalletError> {
        let seed = self.live_seed().ok_or(WalletError::Locked)?;
        let index = self.next_index;
        let public_key = derive_child_keypair(seed, index).public_key();
        self.next_index = self.next_index.saturating_add(1);
        Ok(GeneratedKey { index, public_key })
    }

    /// Seal the plaintext seed under `passphrase` without changing state.
    ///
    /// Pair with [`KeyStore::install_sealed`] so callers can finish any work
    /// that needs the plaintext seed before it is dropped.
    pub fn seal(&self, passphrase: &[u8]) -> Result<Vec<u8>, WalletError> {
        match &self.seed {
            SeedState::Plain(seed) => encryption::encrypt(seed.as_bytes(), passphrase, self.kdf),
            SeedState::Sealed { .. } => Err(WalletError::AlreadyEncrypted),
        }
    }

    /// Replace the plaintext seed with its sealed form. The store ends locked.
    pub fn install_sealed(&mut self, sealed: Vec<u8>) -> Result<(), WalletError> {
        if self.is_encrypted() {
            return Err(WalletError::AlreadyEncrypted);
        }
        self.seed = SeedState::Sealed {
            sealed,
            unlocked: None,
        };
        Ok(())
    }

    /// Open the sealed seed, keeping the plaintext until [`KeyStore::lock`].
    pub fn unlock(&mut self, passphrase: &[u8]) -> Result<(), WalletError> {
        let SeedState::Sealed { sealed, unlocked } = &mut self.seed else {
            return Err(WalletError::NotEncrypted);
        };
        let plain = encryption::decrypt(sealed, passphrase)?;
        *unlocked = Some(Seed::from_slice(&plain)?);
        Ok(())
    }

    /// Drop (and zeroize) the plaintext seed. No-op for an unencrypted store.
    pub fn lock(&mut self) {
        if let SeedState::Sealed { unlocked, .. } = &mut self.seed {
            *unlocked = None;
        }
    }

    /// Reseal the seed under a new passphrase. Lock state is unchanged.
    pub fn change_passphrase(&mut self, old: &[u8], new: &[u8]) -> Result<(), WalletError> {
        let kdf = self.kdf;
        let SeedState::Sealed { sealed, .. } = &mut self.seed else {
            return Err(WalletError::NotEncrypted);
        };
        let plain = encryption::decrypt(sealed, old)?;
        *sealed = encryption::encrypt(&plain, new, kdf)?;
        Ok(())
    }

    /// Sealed seed bytes, if encrypted.
    pub fn sealed_seed(&self) -> Option<&[u8]> {
        match &self.seed {
            SeedState::Sealed { sealed, .. } => Some(sealed),
            SeedState::Plain(_) => None,
        }
    }

    /// Plaintext seed of an unencrypted store.
    pub(crate) fn plain_seed(&self) -> Option<&Seed> {
        match &self.seed {
            SeedState::Plain(seed) => Some(seed),
            SeedState::Sealed { .. } => None,
        }
    }
}

impl fmt::Debug for KeyStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyStore")
            .field("encrypted", &self.is_encrypted())
            .field("can_generate", &self.can_generate())
            .field("next_index", &self.next_index)
            .finish()
    }
}
