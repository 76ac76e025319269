//! Node composition.
//!
//! The [`Node`] owns the wallet, the chain and the pending aux templates,
//! each behind its own lock. Operations that touch more than one take the
//! locks in the fixed order wallet, chain, aux, and hold them for the whole
//! operation, so no caller observes a half-applied reservation.
//!
//! The wallet file is rewritten after every change to durable wallet state
//! (encryption, passphrase change, refill, committed keys).

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use keywell_core::address::Address;
use keywell_core::block_validation::{check_aux_pow, mine_block};
use keywell_core::traits::{Clock, SystemClock};
use keywell_core::types::Hash256;
use keywell_wallet::{KeyPurpose, Wallet, WalletError, WalletInfo};

use crate::auxpow::{AuxBlock, AuxBlockManager};
use crate::chain::Chain;
use crate::config::NodeConfig;
use crate::error::NodeError;

/// Wallet node: keypool wallet, in-memory chain and aux-block manager.
pub struct Node {
    wallet: Mutex<Wallet>,
    chain: RwLock<Chain>,
    aux: Mutex<AuxBlockManager>,
    clock: Arc<dyn Clock>,
    shutdown: watch::Sender<bool>,
    config: NodeConfig,
}

impl Node {
    /// Open (or create) the wallet in `config.data_dir` using the system clock.
    pub fn new(config: NodeConfig) -> Result<Arc<Self>, NodeError> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Open (or create) the wallet with an injected clock.
    ///
    /// A fresh wallet is unencrypted and gets its keypool filled to the
    /// configured size before it is first written.
    pub fn with_clock(config: NodeConfig, clock: Arc<dyn Clock>) -> Result<Arc<Self>, NodeError> {
        std::fs::create_dir_all(&config.data_dir)
            .map_err(|e| NodeError::Storage(format!("create data_dir: {e}")))?;

        let path = config.wallet_path();
        let wallet = if path.exists() {
            let wallet = Wallet::load_from_file(&path, config.wallet.clone(), Arc::clone(&clock))?;
            info!(path = %path.display(), encrypted = wallet.is_encrypted(), "wallet loaded");
            wallet
        } else {
            let mut wallet = Wallet::create(config.wallet.clone(), Arc::clone(&clock));
            wallet.refill(None)?;
            wallet.save_to_file(&path)?;
            info!(path = %path.display(), keys = wallet.pool_size(), "wallet created");
            wallet
        };

        let (shutdown, _) = watch::channel(false);
        Ok(Arc::new(Self {
            wallet: Mutex::new(wallet),
            chain: RwLock::new(Chain::new(config.mining_target)),
            aux: Mutex::new(AuxBlockManager::new()),
            clock,
            shutdown,
            config,
        }))
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    fn persist(&self, wallet: &Wallet) -> Result<(), NodeError> {
        wallet.save_to_file(&self.config.wallet_path())?;
        Ok(())
    }

    // --- Shutdown ---

    /// Signal background tasks to stop.
    pub fn shutdown(&self) {
        self.shutdown.send_replace(true);
    }

    pub fn subscribe_shutdown(&self) -> watch::Receiver<bool> {
        self.shutdown.subscribe()
    }

    // --- Wallet ---

    pub fn get_new_address(&self) -> Result<Address, NodeError> {
        let mut wallet = self.wallet.lock();
        let address = wallet.get_new_address()?;
        self.persist(&wallet)?;
        Ok(address)
    }

    pub fn get_raw_change_address(&self) -> Result<Address, NodeError> {
        let mut wallet = self.wallet.lock();
        let address = wallet.get_raw_change_address()?;
        self.persist(&wallet)?;
        Ok(address)
    }

    /// Refill to `new_size` (or the configured size). Returns keys generated.
    pub fn keypool_refill(&self, new_size: Option<usize>) -> Result<usize, NodeError> {
        let mut wallet = self.wallet.lock();
        let generated = wallet.refill(new_size)?;
        if generated > 0 {
            self.persist(&wallet)?;
        }
        Ok(generated)
    }

    pub fn wallet_passphrase(&self, passphrase: &[u8], timeout_secs: u64) -> Result<(), NodeError> {
        Ok(self.wallet.lock().unlock(passphrase, timeout_secs)?)
    }

    pub fn wallet_lock(&self) -> Result<(), NodeError> {
        Ok(self.wallet.lock().lock()?)
    }

    pub fn wallet_passphrase_change(&self, old: &[u8], new: &[u8]) -> Result<(), NodeError> {
        let mut wallet = self.wallet.lock();
        wallet.change_passphrase(old, new)?;
        self.persist(&wallet)
    }

    /// Encrypt the wallet. Pending aux templates are dropped first since the
    /// keypool they reserved from is about to be retired.
    pub fn encrypt_wallet(&self, passphrase: &[u8]) -> Result<(), NodeError> {
        let mut wallet = self.wallet.lock();
        if wallet.is_encrypted() {
            return Err(WalletError::AlreadyEncrypted.into());
        }
        Self::release_pending(&mut wallet, &mut self.aux.lock())?;
        wallet.encrypt(passphrase)?;
        self.persist(&wallet)
    }

    pub fn wallet_info(&self) -> WalletInfo {
        self.wallet.lock().wallet_info()
    }

    /// Apply unlock expiry. Returns true if the wallet just relocked.
    pub fn tick_wallet(&self) -> bool {
        self.wallet.lock().tick()
    }

    // --- Chain ---

    pub fn block_count(&self) -> u64 {
        self.chain.read().height()
    }

    pub fn best_block_hash(&self) -> Hash256 {
        self.chain.read().tip_hash()
    }

    /// Mine `n` blocks, each paying a freshly reserved keypool key.
    ///
    /// Stops at the first failure; blocks already mined stay connected.
    pub fn generate(&self, n: u64) -> Result<Vec<Hash256>, NodeError> {
        let mut hashes = Vec::new();
        for _ in 0..n {
            hashes.push(self.mine_one()?);
        }
        Ok(hashes)
    }

    fn mine_one(&self) -> Result<Hash256, NodeError> {
        let mut wallet = self.wallet.lock();
        let handle = wallet.reserve(KeyPurpose::Mining)?;
        let mined = wallet
            .reserved_key(handle)
            .map_err(NodeError::from)
            .and_then(|key| self.mine_to(key.pubkey_hash()));

        match mined {
            Ok(hash) => {
                wallet.commit(handle)?;
                Self::release_pending(&mut wallet, &mut self.aux.lock())?;
                self.persist(&wallet)?;
                Ok(hash)
            }
            Err(e) => {
                wallet.release(handle)?;
                warn!("block generation failed: {e}");
                Err(e)
            }
        }
    }

    /// Mine and connect a block paying `pubkey_hash`.
    fn mine_to(&self, pubkey_hash: Hash256) -> Result<Hash256, NodeError> {
        let mut chain = self.chain.write();
        let mut block = chain.build_template(pubkey_hash, self.clock.now_secs());
        let max_nonce = self.config.max_nonce;
        if !mine_block(&mut block, max_nonce) {
            return Err(NodeError::MiningFailed(max_nonce));
        }
        Ok(chain.connect(block)?)
    }

    // --- Merged mining ---

    /// Build a new aux template, superseding any pending ones.
    pub fn create_aux_block(&self) -> Result<AuxBlock, NodeError> {
        let mut wallet = self.wallet.lock();
        let chain = self.chain.read();
        let mut aux = self.aux.lock();

        Self::release_pending(&mut wallet, &mut aux)?;
        let handle = wallet.reserve(KeyPurpose::AuxMining)?;
        let key = wallet.reserved_key(handle)?;
        let block = chain.build_template(key.pubkey_hash(), self.clock.now_secs());
        let info = AuxBlock::from_block(&block);
        let hash = aux.insert(block, handle);
        debug!(%hash, %handle, index = key.index, "aux block created");
        Ok(info)
    }

    /// Accept an aux proof for a pending template.
    ///
    /// On [`NodeError::InvalidAuxPow`] the template and its reservation stay
    /// pending so the miner can retry.
    pub fn submit_aux_block(&self, hash: &Hash256, proof: &[u8]) -> Result<Hash256, NodeError> {
        let mut wallet = self.wallet.lock();
        let mut chain = self.chain.write();
        let mut aux = self.aux.lock();

        let pending = aux
            .get(hash)
            .ok_or_else(|| NodeError::UnknownAuxBlock(hash.to_hex()))?;
        if check_aux_pow(hash, proof, chain.target()).is_err() {
            warn!(%hash, "aux proof rejected");
            return Err(NodeError::InvalidAuxPow);
        }
        let connected = chain.connect_aux(pending.block.clone(), proof)?;

        if let Some(accepted) = aux.remove(hash) {
            wallet.commit(accepted.handle)?;
        }
        Self::release_pending(&mut wallet, &mut aux)?;
        self.persist(&wallet)?;
        info!(%connected, "aux block accepted");
        Ok(connected)
    }

    /// Number of aux templates awaiting a proof.
    pub fn pending_aux_blocks(&self) -> usize {
        self.aux.lock().len()
    }

    /// Release the reservations of every pending aux template.
    fn release_pending(wallet: &mut Wallet, aux: &mut AuxBlockManager) -> Result<(), NodeError> {
        let stale = aux.drain();
        if !stale.is_empty() {
            debug!(count = stale.len(), "releasing pending aux templates");
        }
        for handle in stale {
            wallet.release(handle)?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Node")
            .field("data_dir", &self.config.data_dir)
            .field("height", &self.chain.read().height())
            .field("pending_aux", &self.aux.lock().len())
            .finish()
    }
}
