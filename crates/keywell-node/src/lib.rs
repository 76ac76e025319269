//! # keywell-node — wallet node: mining integration, RPC, orchestration.
//!
//! Composes the keypool wallet with a minimal chain so that block production
//! exercises the reservation lifecycle:
//! - [`node::Node`] — the wallet, chain and aux-block manager behind locks
//! - [`chain::Chain`] — in-memory block chain with mock proof-of-work
//! - [`auxpow::AuxBlockManager`] — pending merged-mining templates
//! - [`rpc`] — JSON-RPC server for external access
//! - [`relock`] — background driver for unlock expiry
//! - [`config::NodeConfig`] — node configuration

pub mod auxpow;
pub mod chain;
pub mod config;
pub mod error;
pub mod node;
pub mod relock;
pub mod rpc;

pub use config::NodeConfig;
pub use error::NodeError;
pub use node::Node;
pub use relock::spawn_relock_driver;
pub use rpc::start_rpc_server;
