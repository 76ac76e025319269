//! Wallet composition: key store, keypool, reservations and unlock expiry.
//!
//! [`Wallet`] is the single owner of all keypool state. Every operation first
//! ticks the unlock timer against the injected [`Clock`], so an expired unlock
//! is observed as `Locked` no matter when the background relock last ran.
//!
//! Locking only blocks *generation*. Keys already in the pool (and keys held
//! by live reservations) stay usable, which is what lets a locked wallet keep
//! mining until its pool runs dry.

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use keywell_core::address::{Address, Network};
use keywell_core::traits::Clock;

use crate::config::WalletConfig;
use crate::error::WalletError;
use crate::keys::{KeyStore, Seed};
use crate::policy::PoolPolicy;
use crate::pool::{KeyPool, PoolKey};
use crate::reservation::{KeyPurpose, ReservationHandle, ReservationManager};
use crate::unlock::UnlockTimer;

/// Magic bytes identifying a keywell wallet file.
pub const WALLET_MAGIC: &[u8; 4] = b"KWWL";

/// Current wallet file format version.
pub const WALLET_VERSION: u32 = 1;

/// Wallet file header serialized as JSON.
#[derive(Serialize, Deserialize)]
struct WalletFileHeader {
    magic: String,
    version: u32,
}

/// How the seed is stored on disk.
#[derive(Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
enum SeedRecord {
    /// Unencrypted wallet: the raw seed, hex encoded.
    Plain { hex: String },
    /// Encrypted wallet: the sealed seed blob, hex encoded.
    Sealed { hex: String },
}

/// Wallet file body serialized as JSON.
#[derive(Serialize, Deserialize)]
struct WalletFileBody {
    network: Network,
    seed: SeedRecord,
    next_index: u64,
    /// Available keys in hand-out order.
    keypool: Vec<PoolKey>,
    used: Vec<u64>,
}

/// Snapshot reported by `getwalletinfo`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletInfo {
    /// Available keys.
    #[serde(rename = "keypoolsize")]
    pub keypool_size: usize,
    /// Keys checked out by live reservations.
    #[serde(rename = "keypoolreserved")]
    pub keypool_reserved: usize,
    /// Creation time (Unix seconds) of the next key to be handed out.
    #[serde(rename = "keypoololdest", skip_serializing_if = "Option::is_none")]
    pub keypool_oldest: Option<u64>,
    /// Only present for encrypted wallets.
    #[serde(rename = "unlocked_until", skip_serializing_if = "Option::is_none")]
    pub unlocked_until: Option<u64>,
    pub encrypted: bool,
    #[serde(rename = "keysused")]
    pub keys_used: usize,
}

/// Keypool lifecycle manager.
pub struct Wallet {
    store: KeyStore,
    pool: KeyPool,
    reservations: ReservationManager,
    timer: UnlockTimer,
    policy: PoolPolicy,
    config: WalletConfig,
    clock: Arc<dyn Clock>,
}

impl Wallet {
    /// Create a new unencrypted wallet with a random seed and an empty pool.
    pub fn create(config: WalletConfig, clock: Arc<dyn Clock>) -> Self {
        Self::from_seed(Seed::generate(), config, clock)
    }

    /// Create an unencrypted wallet from an existing seed.
    pub fn from_seed(seed: Seed, config: WalletConfig, clock: Arc<dyn Clock>) -> Self {
        let store = KeyStore::new(seed, config.kdf);
        Self::assemble(store, KeyPool::new(), config, clock)
    }

    fn assemble(
        store: KeyStore,
        pool: KeyPool,
        config: WalletConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            pool,
            reservations: ReservationManager::new(),
            timer: UnlockTimer::new(),
            policy: PoolPolicy::from_config(&config),
            config,
            clock,
        }
    }

    // --- Unlock lifecycle ---

    /// Relock if the unlock period has elapsed. Returns true if it just did.
    pub fn tick(&mut self) -> bool {
        if self.timer.tick(self.clock.now_ms()) {
            self.store.lock();
            info!("wallet unlock expired, relocked");
            return true;
        }
        false
    }

    /// Encrypt the seed under `passphrase`.
    ///
    /// Keys in the pool were generated while the seed was in the clear, so
    /// they are retired and the pool is regenerated before sealing. The
    /// wallet ends `Locked`. Refused while any reservation is live, since a
    /// released key would otherwise return to the encrypted pool.
    pub fn encrypt(&mut self, passphrase: &[u8]) -> Result<(), WalletError> {
        self.tick();
        if self.store.is_encrypted() {
            return Err(WalletError::AlreadyEncrypted);
        }
        if !self.reservations.is_empty() {
            return Err(WalletError::ReservationsOutstanding(self.reservations.len()));
        }
        let sealed = self.store.seal(passphrase)?;
        let retired = self.pool.retire_available();
        let now_secs = self.clock.now_secs();
        let generated = self
            .pool
            .refill(&mut self.store, self.policy.target_size(), now_secs)?;
        self.store.install_sealed(sealed)?;
        self.timer.lock();
        info!(retired, generated, "wallet encrypted");
        Ok(())
    }

    /// Unlock for `duration_secs` seconds (`0` = until [`Wallet::lock`]).
    ///
    /// On a wrong passphrase the wallet state is unchanged.
    pub fn unlock(&mut self, passphrase: &[u8], duration_secs: u64) -> Result<(), WalletError> {
        self.tick();
        if !self.store.is_encrypted() {
            return Err(WalletError::NotEncrypted);
        }
        if let Err(e) = self.store.unlock(passphrase) {
            warn!("wallet unlock failed: {e}");
            return Err(e);
        }
        self.timer.unlock(self.clock.now_ms(), duration_secs);
        info!(duration_secs, "wallet unlocked");
        Ok(())
    }

    /// Force the wallet to `Locked`. Idempotent for encrypted wallets.
    pub fn lock(&mut self) -> Result<(), WalletError> {
        if !self.store.is_encrypted() {
            return Err(WalletError::NotEncrypted);
        }
        self.store.lock();
        self.timer.lock();
        debug!("wallet locked");
        Ok(())
    }

    pub fn change_passphrase(&mut self, old: &[u8], new: &[u8]) -> Result<(), WalletError> {
        self.tick();
        self.store.change_passphrase(old, new)?;
        info!("wallet passphrase changed");
        Ok(())
    }

    // --- Pool operations ---

    /// Top the pool up to `target` (or the configured size).
    ///
    /// Returns the number of keys generated. Fails with
    /// [`WalletError::Locked`] while locked, even if nothing is missing.
    pub fn refill(&mut self, target: Option<usize>) -> Result<usize, WalletError> {
        self.tick();
        let target = self.policy.resolve_target(target);
        let generated = self
            .pool
            .refill(&mut self.store, target, self.clock.now_secs())?;
        info!(target, generated, size = self.pool.size(), "keypool refill");
        Ok(generated)
    }

    /// Check out the oldest available key.
    ///
    /// Tops the pool up first when auto top-up is on and keys can be
    /// generated. Fails with [`WalletError::KeypoolRanOut`] when no key is
    /// available.
    pub fn reserve(&mut self, purpose: KeyPurpose) -> Result<ReservationHandle, WalletError> {
        self.tick();
        if self
            .policy
            .wants_top_up(self.store.can_generate(), self.pool.size())
        {
            self.pool
                .refill(&mut self.store, self.policy.target_size(), self.clock.now_secs())?;
        }
        if let Err(e) = self.policy.ensure_available(self.pool.size()) {
            warn!(?purpose, "keypool exhausted");
            return Err(e);
        }
        self.reservations
            .reserve(&mut self.pool, purpose, self.clock.now_ms())
    }

    /// Consume a reserved key. Allowed while locked.
    pub fn commit(&mut self, handle: ReservationHandle) -> Result<PoolKey, WalletError> {
        self.tick();
        self.reservations.commit(&mut self.pool, handle)
    }

    /// Return a reserved key to the head of the pool. Allowed while locked.
    pub fn release(&mut self, handle: ReservationHandle) -> Result<(), WalletError> {
        self.tick();
        self.reservations.release(&mut self.pool, handle)
    }

    /// Public half of the key behind a live reservation.
    pub fn reserved_key(&self, handle: ReservationHandle) -> Result<PoolKey, WalletError> {
        self.reservations
            .get(handle)
            .map(|r| r.key.clone())
            .ok_or(WalletError::InvalidHandle(handle.id()))
    }

    // --- Addresses ---

    /// Reserve and commit a receiving key.
    pub fn get_new_address(&mut self) -> Result<Address, WalletError> {
        self.consume(KeyPurpose::Receive)
    }

    /// Reserve and commit a change key.
    pub fn get_raw_change_address(&mut self) -> Result<Address, WalletError> {
        self.consume(KeyPurpose::Change)
    }

    fn consume(&mut self, purpose: KeyPurpose) -> Result<Address, WalletError> {
        let handle = self.reserve(purpose)?;
        let key = self.commit(handle)?;
        Ok(key.address(self.config.network))
    }

    // --- Queries ---

    /// Available keys. Reserved keys are not counted.
    pub fn pool_size(&self) -> usize {
        self.pool.size()
    }

    pub fn reserved_count(&self) -> usize {
        self.reservations.len()
    }

    pub fn used_count(&self) -> usize {
        self.pool.used_count()
    }

    /// Unlock expiry in Unix seconds, `0` when locked or unencrypted.
    pub fn unlocked_until(&self) -> u64 {
        self.timer.unlocked_until(self.clock.now_ms())
    }

    pub fn is_encrypted(&self) -> bool {
        self.store.is_encrypted()
    }

    /// True for an encrypted wallet outside an unlock period.
    pub fn is_locked(&self) -> bool {
        self.store.is_encrypted() && !self.timer.is_unlocked_at(self.clock.now_ms())
    }

    /// Creation time of the next key to be handed out.
    pub fn oldest_key_time(&self) -> Option<u64> {
        self.pool.peek_oldest().map(|k| k.created_at)
    }

    pub fn network(&self) -> Network {
        self.config.network
    }

    pub fn config(&self) -> &WalletConfig {
        &self.config
    }

    pub fn wallet_info(&self) -> WalletInfo {
        let encrypted = self.is_encrypted();
        WalletInfo {
            keypool_size: self.pool_size(),
            keypool_reserved: self.reserved_count(),
            keypool_oldest: self.oldest_key_time(),
            unlocked_until: encrypted.then(|| self.unlocked_until()),
            encrypted,
            keys_used: self.used_count(),
        }
    }

    // --- Persistence ---

    /// Save the wallet to a file.
    ///
    /// # File format
    /// ```text
    /// header_len (4 bytes LE) || header_json || body_json
    /// ```
    /// An encrypted wallet stores only its sealed seed. Keys held by live
    /// reservations are written back as available at the head of the pool,
    /// so a restart behaves like releasing every reservation.
    pub fn save_to_file(&self, path: &Path) -> Result<(), WalletError> {
        let header = WalletFileHeader {
            magic: String::from_utf8_lossy(WALLET_MAGIC).to_string(),
            version: WALLET_VERSION,
        };
        let header_json =
            serde_json::to_vec(&header).map_err(|e| WalletError::Serialization(e.to_string()))?;

        let seed = match (self.store.sealed_seed(), self.store.plain_seed()) {
            (Some(sealed), _) => SeedRecord::Sealed {
                hex: hex::encode(sealed),
            },
            (None, Some(seed)) => SeedRecord::Plain {
                hex: hex::encode(seed.as_bytes()),
            },
            (None, None) => {
                return Err(WalletError::Serialization("seed unavailable".into()));
            }
        };
        let keypool: Vec<PoolKey> = self
            .reservations
            .iter()
            .map(|r| r.key.clone())
            .chain(self.pool.available().cloned())
            .collect();
        let body = WalletFileBody {
            network: self.config.network,
            seed,
            next_index: self.store.next_index(),
            keypool,
            used: self.pool.used_indices(),
        };
        let body_json = Zeroizing::new(
            serde_json::to_vec(&body).map_err(|e| WalletError::Serialization(e.to_string()))?,
        );

        let header_len = header_json.len() as u32;
        let mut file_data = Zeroizing::new(Vec::with_capacity(
            4 + header_json.len() + body_json.len(),
        ));
        file_data.extend_from_slice(&header_len.to_le_bytes());
        file_data.extend_from_slice(&header_json);
        file_data.extend_from_slice(&body_json);

        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, &file_data[..]).map_err(|e| WalletError::IoError(e.to_string()))?;
        std::fs::rename(&tmp, path).map_err(|e| WalletError::IoError(e.to_string()))?;
        debug!(path = %path.display(), keys = body.keypool.len(), "wallet saved");
        Ok(())
    }

    /// Load a wallet from a file. Encrypted wallets come back `Locked`.
    ///
    /// The file's network must match `config.network`.
    pub fn load_from_file(
        path: &Path,
        config: WalletConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, WalletError> {
        let file_data = Zeroizing::new(
            std::fs::read(path).map_err(|e| WalletError::IoError(e.to_string()))?,
        );

        let Some(len_bytes) = file_data.first_chunk::<4>() else {
            return Err(WalletError::CorruptedFile("file too short".into()));
        };
        let header_len = u32::from_le_bytes(*len_bytes) as usize;
        if file_data.len() < 4 + header_len {
            return Err(WalletError::CorruptedFile("header truncated".into()));
        }

        let header: WalletFileHeader = serde_json::from_slice(&file_data[4..4 + header_len])
            .map_err(|e| WalletError::CorruptedFile(format!("invalid header: {e}")))?;
        if header.magic != String::from_utf8_lossy(WALLET_MAGIC).as_ref() {
            return Err(WalletError::CorruptedFile("invalid magic bytes".into()));
        }
        if header.version != WALLET_VERSION {
            return Err(WalletError::CorruptedFile(format!(
                "unsupported version: {}",
                header.version
            )));
        }

        let body: WalletFileBody = serde_json::from_slice(&file_data[4 + header_len..])
            .map_err(|e| WalletError::CorruptedFile(format!("invalid body: {e}")))?;
        if body.network != config.network {
            return Err(WalletError::CorruptedFile(format!(
                "wallet is for {:?}, configured for {:?}",
                body.network, config.network
            )));
        }
        if let Some(bad) = body
            .keypool
            .iter()
            .map(|k| k.index)
            .chain(body.used.iter().copied())
            .find(|i| *i >= body.next_index)
        {
            return Err(WalletError::CorruptedFile(format!(
                "key index {bad} beyond next index {}",
                body.next_index
            )));
        }

        let store = match &body.seed {
            SeedRecord::Plain { hex } => {
                let bytes = Zeroizing::new(
                    hex::decode(hex)
                        .map_err(|e| WalletError::CorruptedFile(format!("invalid seed: {e}")))?,
                );
                KeyStore::from_plain(Seed::from_slice(&bytes)?, body.next_index, config.kdf)
            }
            SeedRecord::Sealed { hex } => {
                let sealed = hex::decode(hex)
                    .map_err(|e| WalletError::CorruptedFile(format!("invalid seed: {e}")))?;
                KeyStore::from_sealed(sealed, body.next_index, config.kdf)
            }
        };
        let pool = KeyPool::restore(body.keypool, body.used)?;
        let wallet = Self::assemble(store, pool, config, clock);
        debug!(
            path = %path.display(),
            pool = wallet.pool_size(),
            encrypted = wallet.is_encrypted(),
            "wallet loaded"
        );
        Ok(wallet)
    }
}

impl std::fmt::Debug for Wallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wallet")
            .field("network", &self.config.network)
            .field("store", &self.store)
            .field("pool_size", &self.pool.size())
            .field("reserved", &self.reservations.len())
            .field("unlock", &self.timer.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encryption::KdfParams;
    use crate::pool::KeyStatus;
    use crate::unlock::NO_EXPIRY;
    use keywell_core::traits::ManualClock;
    use std::time::Duration;

    const FAST: KdfParams = KdfParams {
        m_cost_kib: 64,
        t_cost: 1,
    };
    const START_MS: u64 = 1_700_000_000_000;
    const PASS: &[u8] = b"test";

    fn config(keypool_size: usize, auto_top_up: bool) -> WalletConfig {
        WalletConfig {
            keypool_size,
            auto_top_up,
            network: Network::Regtest,
            kdf: FAST,
        }
    }

    fn plain_wallet(keypool_size: usize) -> (Wallet, ManualClock) {
        let clock = ManualClock::new(START_MS);
        let w = Wallet::from_seed(
            Seed::from_bytes([7u8; 32]),
            config(keypool_size, true),
            Arc::new(clock.clone()),
        );
        (w, clock)
    }

    /// Encrypted, locked wallet whose pool holds `keypool_size` keys.
    fn locked_wallet(keypool_size: usize) -> (Wallet, ManualClock) {
        let clock = ManualClock::new(START_MS);
        let mut w = Wallet::from_seed(
            Seed::from_bytes([9u8; 32]),
            config(keypool_size, true),
            Arc::new(clock.clone()),
        );
        w.encrypt(PASS).unwrap();
        (w, clock)
    }

    #[test]
    fn create_starts_unencrypted_and_empty() {
        let w = Wallet::create(config(5, true), Arc::new(ManualClock::new(0)));
        assert!(!w.is_encrypted());
        assert!(!w.is_locked());
        assert_eq!(w.pool_size(), 0);
        assert_eq!(w.unlocked_until(), 0);
    }

    #[test]
    fn unencrypted_wallet_tops_up_on_demand() {
        let (mut w, _) = plain_wallet(3);
        let addr = w.get_new_address().unwrap();
        assert_eq!(addr.network(), Network::Regtest);
        assert_eq!(w.pool_size(), 2);
        w.get_raw_change_address().unwrap();
        w.get_new_address().unwrap();
        w.get_new_address().unwrap();
        assert_eq!(w.used_count(), 4);
    }

    #[test]
    fn lock_and_unlock_need_encryption() {
        let (mut w, _) = plain_wallet(1);
        assert_eq!(w.lock().unwrap_err(), WalletError::NotEncrypted);
        assert_eq!(w.unlock(PASS, 10).unwrap_err(), WalletError::NotEncrypted);
        assert_eq!(
            w.change_passphrase(PASS, b"x").unwrap_err(),
            WalletError::NotEncrypted
        );
    }

    #[test]
    fn encrypt_regenerates_pool_and_locks() {
        let (mut w, _) = plain_wallet(2);
        w.refill(None).unwrap();
        let before = w.pool.peek_oldest().cloned();

        w.encrypt(PASS).unwrap();
        assert!(w.is_encrypted());
        assert!(w.is_locked());
        assert_eq!(w.pool_size(), 2);
        assert_eq!(w.used_count(), 2);
        assert_ne!(w.pool.peek_oldest().cloned(), before);
        assert_eq!(w.encrypt(b"again").unwrap_err(), WalletError::AlreadyEncrypted);
    }

    #[test]
    fn encrypt_refuses_while_keys_are_reserved() {
        let (mut w, _) = plain_wallet(2);
        w.refill(None).unwrap();
        let handle = w.reserve(KeyPurpose::AuxMining).unwrap();
        let clear_index = w.reserved_key(handle).unwrap().index;

        assert_eq!(
            w.encrypt(PASS).unwrap_err(),
            WalletError::ReservationsOutstanding(1)
        );
        assert!(!w.is_encrypted());

        w.release(handle).unwrap();
        w.encrypt(PASS).unwrap();
        let handle = w.reserve(KeyPurpose::Receive).unwrap();
        assert_ne!(w.reserved_key(handle).unwrap().index, clear_index);
        assert_eq!(w.pool.status(clear_index), Some(KeyStatus::Used));
    }

    #[test]
    fn locked_pool_exhausts_after_n_keys() {
        let (mut w, _) = locked_wallet(3);
        for _ in 0..3 {
            w.get_new_address().unwrap();
        }
        let err = w.get_new_address().unwrap_err();
        assert!(err.is_pool_exhausted());
        assert_eq!(w.pool_size(), 0);
    }

    #[test]
    fn refill_requires_unlock() {
        let (mut w, _) = locked_wallet(1);
        assert_eq!(w.refill(Some(3)).unwrap_err(), WalletError::Locked);
        // Even a no-op refill is refused while locked.
        assert_eq!(w.refill(Some(1)).unwrap_err(), WalletError::Locked);
        assert_eq!(w.pool_size(), 1);

        w.unlock(PASS, 60).unwrap();
        assert_eq!(w.refill(Some(3)).unwrap(), 2);
        assert_eq!(w.pool_size(), 3);
    }

    #[test]
    fn wrong_passphrase_changes_nothing() {
        let (mut w, _) = locked_wallet(1);
        assert_eq!(w.unlock(b"nope", 60).unwrap_err(), WalletError::InvalidPassphrase);
        assert!(w.is_locked());
        assert_eq!(w.unlocked_until(), 0);
    }

    #[test]
    fn unlock_expires_on_the_clock() {
        let (mut w, clock) = locked_wallet(1);
        w.unlock(PASS, 1).unwrap();
        assert_eq!(w.unlocked_until(), START_MS / 1000 + 1);
        w.refill(Some(2)).unwrap();

        clock.advance(Duration::from_millis(1_100));
        // Reads honor expiry before any tick.
        assert!(w.is_locked());
        assert_eq!(w.unlocked_until(), 0);
        assert!(w.tick());
        assert!(!w.tick());
        assert_eq!(w.refill(Some(3)).unwrap_err(), WalletError::Locked);
    }

    #[test]
    fn expired_unlock_blocks_refill_without_explicit_tick() {
        let (mut w, clock) = locked_wallet(1);
        w.unlock(PASS, 5).unwrap();
        clock.advance(Duration::from_secs(5));
        assert_eq!(w.refill(Some(4)).unwrap_err(), WalletError::Locked);
    }

    #[test]
    fn zero_duration_unlock_never_expires() {
        let (mut w, clock) = locked_wallet(1);
        w.unlock(PASS, 0).unwrap();
        assert_eq!(w.unlocked_until(), NO_EXPIRY);
        clock.advance(Duration::from_secs(1_000_000));
        assert!(!w.tick());
        w.refill(Some(2)).unwrap();
        w.lock().unwrap();
        w.lock().unwrap();
        assert!(w.is_locked());
    }

    #[test]
    fn release_restores_the_same_key() {
        let (mut w, _) = locked_wallet(2);
        let h = w.reserve(KeyPurpose::AuxMining).unwrap();
        let key = w.reserved_key(h).unwrap();
        assert_eq!(w.pool_size(), 1);
        w.release(h).unwrap();
        assert_eq!(w.pool_size(), 2);

        let again = w.reserve(KeyPurpose::AuxMining).unwrap();
        assert_eq!(w.reserved_key(again).unwrap(), key);
        assert_eq!(w.release(h).unwrap_err(), WalletError::InvalidHandle(h.id()));
    }

    #[test]
    fn reservation_survives_lock() {
        let (mut w, _) = locked_wallet(1);
        w.unlock(PASS, 0).unwrap();
        let h = w.reserve(KeyPurpose::Mining).unwrap();
        w.lock().unwrap();
        let key = w.commit(h).unwrap();
        assert_eq!(w.pool.status(key.index), Some(KeyStatus::Used));
    }

    #[test]
    fn locked_wallet_does_not_top_up() {
        let (mut w, _) = locked_wallet(2);
        w.get_new_address().unwrap();
        assert_eq!(w.pool_size(), 1);
        w.unlock(PASS, 0).unwrap();
        w.get_new_address().unwrap();
        // Topped up to 2 before handing one out.
        assert_eq!(w.pool_size(), 1);
        assert_eq!(w.used_count(), 2);
    }

    #[test]
    fn change_passphrase_keeps_lock_state() {
        let (mut w, _) = locked_wallet(1);
        w.change_passphrase(PASS, b"new").unwrap();
        assert!(w.is_locked());
        assert_eq!(w.unlock(PASS, 10).unwrap_err(), WalletError::InvalidPassphrase);
        w.unlock(b"new", 10).unwrap();
    }

    #[test]
    fn wallet_info_reports_pool() {
        let (mut w, _) = locked_wallet(3);
        let _h = w.reserve(KeyPurpose::Mining).unwrap();
        let info = w.wallet_info();
        assert_eq!(info.keypool_size, 2);
        assert_eq!(info.keypool_reserved, 1);
        assert_eq!(info.keypool_oldest, Some(START_MS / 1000));
        assert_eq!(info.unlocked_until, Some(0));
        assert!(info.encrypted);

        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["keypoolsize"], 2);
        assert_eq!(json["unlocked_until"], 0);
    }

    #[test]
    fn wallet_info_omits_unlock_for_plain_wallet() {
        let (w, _) = plain_wallet(1);
        let json = serde_json::to_value(w.wallet_info()).unwrap();
        assert!(json.get("unlocked_until").is_none());
        assert!(json.get("keypoololdest").is_none());
    }

    #[test]
    fn save_load_encrypted_comes_back_locked() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wallet.dat");

        let (mut w, clock) = locked_wallet(3);
        w.get_new_address().unwrap();
        let h = w.reserve(KeyPurpose::AuxMining).unwrap();
        let reserved = w.reserved_key(h).unwrap();
        w.unlock(PASS, 0).unwrap();
        w.save_to_file(&path).unwrap();

        let mut loaded =
            Wallet::load_from_file(&path, config(3, true), Arc::new(clock.clone())).unwrap();
        assert!(loaded.is_encrypted());
        assert!(loaded.is_locked());
        assert_eq!(loaded.pool_size(), 2);
        assert_eq!(loaded.reserved_count(), 0);
        assert_eq!(loaded.used_count(), w.used_count());

        // The in-flight reservation reloads at the head of the pool.
        let again = loaded.reserve(KeyPurpose::AuxMining).unwrap();
        assert_eq!(loaded.reserved_key(again).unwrap(), reserved);

        loaded.unlock(PASS, 10).unwrap();
        loaded.refill(Some(3)).unwrap();
        let fresh: Vec<u64> = loaded.pool.available().map(|k| k.index).collect();
        assert!(fresh.iter().all(|i| *i < loaded.store.next_index()));
        assert!(!fresh.contains(&reserved.index));
    }

    #[test]
    fn save_load_plain_keeps_generating() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wallet.dat");

        let (mut w, clock) = plain_wallet(2);
        w.get_new_address().unwrap();
        w.save_to_file(&path).unwrap();

        let mut loaded =
            Wallet::load_from_file(&path, config(2, true), Arc::new(clock)).unwrap();
        assert!(!loaded.is_encrypted());
        assert_eq!(loaded.pool_size(), 1);
        loaded.refill(None).unwrap();
        assert_eq!(loaded.store.next_index(), 3);
    }

    #[test]
    fn load_rejects_bad_files() {
        let dir = tempfile::tempdir().unwrap();
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::new(0));

        let short = dir.path().join("short");
        std::fs::write(&short, [1u8, 0]).unwrap();
        assert!(matches!(
            Wallet::load_from_file(&short, config(1, true), clock.clone()),
            Err(WalletError::CorruptedFile(_))
        ));

        let bad_magic = dir.path().join("magic");
        let header = br#"{"magic":"NOPE","version":1}"#;
        let mut data = (header.len() as u32).to_le_bytes().to_vec();
        data.extend_from_slice(header);
        std::fs::write(&bad_magic, data).unwrap();
        assert!(matches!(
            Wallet::load_from_file(&bad_magic, config(1, true), clock.clone()),
            Err(WalletError::CorruptedFile(_))
        ));

        let missing = dir.path().join("missing");
        assert!(matches!(
            Wallet::load_from_file(&missing, config(1, true), clock),
            Err(WalletError::IoError(_))
        ));
    }

    /// Rewrite the JSON body of a saved wallet file in place.
    fn edit_body(path: &Path, edit: impl FnOnce(&mut serde_json::Value)) {
        let data = std::fs::read(path).unwrap();
        let header_len = u32::from_le_bytes(data[..4].try_into().unwrap()) as usize;
        let mut body: serde_json::Value = serde_json::from_slice(&data[4 + header_len..]).unwrap();
        edit(&mut body);
        let mut out = data[..4 + header_len].to_vec();
        out.extend_from_slice(&serde_json::to_vec(&body).unwrap());
        std::fs::write(path, out).unwrap();
    }

    #[test]
    fn load_rejects_key_listed_twice() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wallet.dat");
        let (mut w, clock) = plain_wallet(2);
        w.refill(None).unwrap();
        w.save_to_file(&path).unwrap();

        edit_body(&path, |body| {
            let pool = body["keypool"].as_array_mut().unwrap();
            let first = pool[0].clone();
            pool.push(first);
        });
        assert!(matches!(
            Wallet::load_from_file(&path, config(2, true), Arc::new(clock)),
            Err(WalletError::CorruptedFile(_))
        ));
    }

    #[test]
    fn load_rejects_used_key_back_in_pool() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wallet.dat");
        let (mut w, clock) = plain_wallet(2);
        w.refill(None).unwrap();
        w.get_new_address().unwrap();
        w.save_to_file(&path).unwrap();

        // Index 0 was consumed; list it as available again.
        edit_body(&path, |body| {
            let used = body["used"][0].clone();
            let mut revived = body["keypool"][0].clone();
            revived["index"] = used;
            body["keypool"].as_array_mut().unwrap().push(revived);
        });
        assert!(matches!(
            Wallet::load_from_file(&path, config(2, true), Arc::new(clock)),
            Err(WalletError::CorruptedFile(_))
        ));
    }

    #[test]
    fn load_rejects_network_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wallet.dat");
        let (w, clock) = plain_wallet(1);
        w.save_to_file(&path).unwrap();

        let mut cfg = config(1, true);
        cfg.network = Network::Mainnet;
        assert!(matches!(
            Wallet::load_from_file(&path, cfg, Arc::new(clock)),
            Err(WalletError::CorruptedFile(_))
        ));
    }
}
