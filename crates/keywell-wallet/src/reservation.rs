//! In-flight key checkouts.
//!
//! A [`ReservationHandle`] has exactly two legal resolutions: `commit`
//! (the key is consumed) or `release` (the key returns to the head of the
//! pool). Handle ids are never reused, so resolving a handle twice fails with
//! [`WalletError::InvalidHandle`].

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::WalletError;
use crate::pool::{KeyPool, PoolKey};

/// Opaque reservation id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ReservationHandle(u64);

impl ReservationHandle {
    pub fn id(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ReservationHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Why a key was checked out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyPurpose {
    Receive,
    Change,
    Mining,
    AuxMining,
}

/// A live checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reservation {
    pub handle: ReservationHandle,
    pub key: PoolKey,
    pub purpose: KeyPurpose,
    pub created_at_ms: u64,
}

/// Tracks live reservations against a [`KeyPool`].
#[derive(Debug, Default)]
pub struct ReservationManager {
    next_id: u64,
    live: BTreeMap<ReservationHandle, Reservation>,
}

impl ReservationManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check out the pool's oldest available key.
    pub fn reserve(
        &mut self,
        pool: &mut KeyPool,
        purpose: KeyPurpose,
        now_ms: u64,
    ) -> Result<ReservationHandle, WalletError> {
        let key = pool.next_available()?;
        let handle = ReservationHandle(self.next_id);
        self.next_id += 1;
        debug!(%handle, index = key.index, ?purpose, "key reserved");
        self.live.insert(
            handle,
            Reservation {
                handle,
                key,
                purpose,
                created_at_ms: now_ms,
            },
        );
        Ok(handle)
    }

    /// Consume the reserved key for good.
    pub fn commit(
        &mut self,
        pool: &mut KeyPool,
        handle: ReservationHandle,
    ) -> Result<PoolKey, WalletError> {
        let index = self.get_live(handle)?.key.index;
        pool.mark_used(index)?;
        let reservation = self.take(handle)?;
        debug!(%handle, index, "reservation committed");
        Ok(reservation.key)
    }

    /// Return the reserved key to the head of the pool, unmodified.
    pub fn release(
        &mut self,
        pool: &mut KeyPool,
        handle: ReservationHandle,
    ) -> Result<(), WalletError> {
        let key = self.get_live(handle)?.key.clone();
        let index = key.index;
        pool.return_to_front(key)?;
        self.take(handle)?;
        debug!(%handle, index, "reservation released");
        Ok(())
    }

    pub fn get(&self, handle: ReservationHandle) -> Option<&Reservation> {
        self.live.get(&handle)
    }

    fn get_live(&self, handle: ReservationHandle) -> Result<&Reservation, WalletError> {
        self.live
            .get(&handle)
            .ok_or(WalletError::InvalidHandle(handle.0))
    }

    fn take(&mut self, handle: ReservationHandle) -> Result<Reservation, WalletError> {
        self.live
            .remove(&handle)
            .ok_or(WalletError::InvalidHandle(handle.0))
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    /// Live reservations in checkout order.
    pub fn iter(&self) -> impl Iterator<Item = &Reservation> {
        self.live.values()
    }
}
