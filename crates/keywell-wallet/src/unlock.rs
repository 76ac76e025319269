//! Passphrase unlock expiry.
//!
//! The timer owns no clock. Callers pass the current time, and
//! [`UnlockTimer::tick`] flips an expired unlock back to `Locked`. The wallet
//! ticks before every operation and the node also ticks on a fixed interval,
//! so an unlock never outlives its requested duration.

use serde::{Deserialize, Serialize};

/// Longest accepted unlock duration (about three years).
pub const MAX_UNLOCK_SECS: u64 = 100_000_000;

/// Reported by `unlocked_until` for an unlock with no expiry.
pub const NO_EXPIRY: u64 = u64::MAX;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnlockState {
    Locked,
    /// `expiry_ms == None` stays unlocked until an explicit lock.
    Unlocked { expiry_ms: Option<u64> },
}

#[derive(Debug, Clone)]
pub struct UnlockTimer {
    state: UnlockState,
}

impl Default for UnlockTimer {
    fn default() -> Self {
        Self {
            state: UnlockState::Locked,
        }
    }
}

impl UnlockTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start an unlock period. `duration_secs == 0` means no expiry.
    ///
    /// The caller validates the passphrase first.
    pub fn unlock(&mut self, now_ms: u64, duration_secs: u64) {
        let expiry_ms = match duration_secs {
            0 => None,
            secs => Some(now_ms.saturating_add(secs.min(MAX_UNLOCK_SECS) * 1000)),
        };
        self.state = UnlockState::Unlocked { expiry_ms };
    }

    pub fn lock(&mut self) {
        self.state = UnlockState::Locked;
    }

    /// Relock if the unlock period has elapsed. Returns true on that transition.
    pub fn tick(&mut self, now_ms: u64) -> bool {
        if self.expired_at(now_ms) {
            self.state = UnlockState::Locked;
            return true;
        }
        false
    }

    fn expired_at(&self, now_ms: u64) -> bool {
        matches!(self.state, UnlockState::Unlocked { expiry_ms: Some(expiry) } if now_ms >= expiry)
    }

    pub fn state(&self) -> UnlockState {
        self.state
    }

    /// Unlocked as of `now_ms`, whether or not `tick` has run since expiry.
    pub fn is_unlocked_at(&self, now_ms: u64) -> bool {
        matches!(self.state, UnlockState::Unlocked { .. }) && !self.expired_at(now_ms)
    }

    /// `0` when locked (or expired), otherwise the expiry in Unix seconds,
    /// rounded up. [`NO_EXPIRY`] for an open-ended unlock.
    pub fn unlocked_until(&self, now_ms: u64) -> u64 {
        match self.state {
            _ if !self.is_unlocked_at(now_ms) => 0,
            UnlockState::Unlocked { expiry_ms: Some(expiry) } => expiry.div_ceil(1000),
            UnlockState::Unlocked { expiry_ms: None } => NO_EXPIRY,
            UnlockState::Locked => 0,
        }
    }
}
