//! Background driver for unlock expiry.
//!
//! Every wallet operation already ticks the unlock timer, but between calls
//! the plaintext seed would stay in memory past its deadline. This task ticks
//! on a fixed interval so an expired unlock is relocked (and the seed
//! zeroized) without waiting for the next request.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::node::Node;

/// Spawn the relock loop. It exits when the node signals shutdown and
/// returns how many expiries it handled.
pub fn spawn_relock_driver(node: Arc<Node>, interval: Duration) -> JoinHandle<u64> {
    let mut shutdown = node.subscribe_shutdown();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut relocks = 0u64;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if node.tick_wallet() {
                        relocks += 1;
                        info!("unlock period elapsed, wallet relocked");
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        debug!(relocks, "relock driver stopped");
        relocks
    })
}
