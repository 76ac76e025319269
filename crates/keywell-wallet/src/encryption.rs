//! AES-256-GCM sealing of wallet secrets.
//!
//! The sealing key is derived from the passphrase with Argon2id. The cost
//! parameters travel with the ciphertext so a wallet sealed under one
//! configuration can still be opened after the defaults change.
//!
//! # Wire format
//! ```text
//! m_cost (4 LE) || t_cost (4 LE) || salt (32) || nonce (12) || ciphertext + auth_tag
//! ```

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use argon2::{Algorithm, Argon2, Params, Version};
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::error::WalletError;

const PARAMS_LEN: usize = 8;
const SALT_LEN: usize = 32;
const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;
const HEADER_LEN: usize = PARAMS_LEN + SALT_LEN + NONCE_LEN;

/// Largest Argon2 memory cost accepted, in KiB (1 GiB).
pub const MAX_M_COST_KIB: u32 = 1024 * 1024;
/// Largest Argon2 pass count accepted.
pub const MAX_T_COST: u32 = 64;

/// Argon2id cost parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KdfParams {
    /// Memory cost in KiB.
    pub m_cost_kib: u32,
    /// Number of passes.
    pub t_cost: u32,
}

impl KdfParams {
    /// Whether the costs are within what this wallet will ever spend.
    pub fn within_bounds(&self) -> bool {
        self.m_cost_kib <= MAX_M_COST_KIB && self.t_cost <= MAX_T_COST
    }
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            m_cost_kib: Params::DEFAULT_M_COST,
            t_cost: Params::DEFAULT_T_COST,
        }
    }
}

/// Derive a 256-bit sealing key from a passphrase and salt.
pub fn derive_key(
    passphrase: &[u8],
    salt: &[u8],
    params: KdfParams,
) -> Result<Zeroizing<[u8; 32]>, WalletError> {
    let argon_params = Params::new(params.m_cost_kib, params.t_cost, 1, Some(32))
        .map_err(|e| WalletError::Encryption(format!("kdf params: {e}")))?;
    let argon = Argon2::new(Algorithm::Argon2id, Version::V0x13, argon_params);
    let mut key = Zeroizing::new([0u8; 32]);
    argon
        .hash_password_into(passphrase, salt, &mut key[..])
        .map_err(|e| WalletError::Encryption(format!("kdf: {e}")))?;
    Ok(key)
}

/// Seal plaintext under a passphrase.
///
/// Generates a random salt and nonce per call.
pub fn encrypt(
    plaintext: &[u8],
    passphrase: &[u8],
    params: KdfParams,
) -> Result<Vec<u8>, WalletError> {
    use rand::RngCore;
    if !params.within_bounds() {
        return Err(WalletError::Encryption(format!("kdf params out of range: {params:?}")));
    }
    let mut salt = [0u8; SALT_LEN];
    let mut nonce_bytes = [0u8; NONCE_LEN];
    rand::rngs::OsRng.fill_bytes(&mut salt);
    rand::rngs::OsRng.fill_bytes(&mut nonce_bytes);

    let key = derive_key(passphrase, &salt, params)?;
    let cipher = Aes256Gcm::new_from_slice(&key[..])
        .map_err(|e| WalletError::Encryption(e.to_string()))?;
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce_bytes), plaintext)
        .map_err(|e| WalletError::Encryption(e.to_string()))?;

    let mut sealed = Vec::with_capacity(HEADER_LEN + ciphertext.len());
    sealed.extend_from_slice(&params.m_cost_kib.to_le_bytes());
    sealed.extend_from_slice(&params.t_cost.to_le_bytes());
    sealed.extend_from_slice(&salt);
    sealed.extend_from_slice(&nonce_bytes);
    sealed.extend_from_slice(&ciphertext);
    Ok(sealed)
}

/// Open data sealed with [`encrypt`].
///
/// An authentication failure means the passphrase is wrong and maps to
/// [`WalletError::InvalidPassphrase`].
pub fn decrypt(sealed: &[u8], passphrase: &[u8]) -> Result<Zeroizing<Vec<u8>>, WalletError> {
    if sealed.len() < HEADER_LEN + TAG_LEN {
        return Err(WalletError::CorruptedFile(format!(
            "sealed data too short: {} < {}",
            sealed.len(),
            HEADER_LEN + TAG_LEN
        )));
    }

    let (params_bytes, rest) = sealed.split_at(PARAMS_LEN);
    let (salt, rest) = rest.split_at(SALT_LEN);
    let (nonce_bytes, ciphertext) = rest.split_at(NONCE_LEN);

    let mut m_cost = [0u8; 4];
    let mut t_cost = [0u8; 4];
    m_cost.copy_from_slice(&params_bytes[..4]);
    t_cost.copy_from_slice(&params_bytes[4..]);
    let params = KdfParams {
        m_cost_kib: u32::from_le_bytes(m_cost),
        t_cost: u32::from_le_bytes(t_cost),
    };
    // Costs come from disk; never let them size the allocation unchecked.
    if !params.within_bounds() {
        return Err(WalletError::CorruptedFile(format!(
            "kdf params out of range: {params:?}"
        )));
    }

    let key = derive_key(passphrase, salt, params)
        .map_err(|e| WalletError::Decryption(e.to_string()))?;
    let cipher = Aes256Gcm::new_from_slice(&key[..])
        .map_err(|e| WalletError::Decryption(e.to_string()))?;

    cipher
        .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
        .map(Zeroizing::new)
        .map_err(|_| WalletError::InvalidPassphrase)
}
