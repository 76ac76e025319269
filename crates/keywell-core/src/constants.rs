//! Protocol and wallet constants.

/// Default number of keys a refill generates when no explicit size is given.
pub const DEFAULT_KEYPOOL_SIZE: usize = 100;

/// Default JSON-RPC port.
pub const DEFAULT_RPC_PORT: u16 = 18442;

/// Block reward paid to the coinbase destination, in base units.
pub const BLOCK_REWARD: u64 = 50 * COIN;

/// Base units per coin.
pub const COIN: u64 = 100_000_000;

/// Target spacing between blocks.
pub const BLOCK_TIME_SECS: u64 = 60;

/// Easiest possible difficulty target (every hash qualifies).
pub const REGTEST_TARGET: u64 = u64::MAX;

/// Chain identifier advertised to auxiliary-PoW parent chains.
pub const AUXPOW_CHAIN_ID: u32 = 0x0001;

/// Interval at which the node's relock driver ticks the unlock timer.
pub const DEFAULT_RELOCK_INTERVAL_MS: u64 = 250;

/// Current block header version.
pub const BLOCK_VERSION: u64 = 1;
