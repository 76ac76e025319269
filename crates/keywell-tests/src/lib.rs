//! End-to-end test suite for Keywell.
//!
//! Integration tests drive a [`Node`](keywell_node_lib::Node) directly and
//! over JSON-RPC through the full keypool lifecycle: encryption, refill,
//! exhaustion, unlock expiry, mining and merged-mining templates.

pub mod helpers;
