//! JSON-RPC server for the Keywell wallet node.
//!
//! Uses jsonrpsee 0.24 to expose the Bitcoin-style wallet and mining calls
//! that drive the keypool. Wallet errors map onto stable numeric codes so
//! clients can tell "keypool exhausted" apart from every other failure.

use std::net::SocketAddr;
use std::sync::Arc;

use jsonrpsee::core::async_trait;
use jsonrpsee::proc_macros::rpc;
use jsonrpsee::server::{Server, ServerHandle};
use jsonrpsee::types::ErrorObjectOwned;
use serde::{Deserialize, Serialize};

use keywell_core::types::Hash256;
use keywell_wallet::{WalletError, WalletInfo};

use crate::auxpow::AuxBlock;
use crate::error::NodeError;
use crate::node::Node;

/// Misc error.
pub const RPC_MISC_ERROR: i32 = -1;
/// Unspecified wallet problem, including unknown reservation handles.
pub const RPC_WALLET_ERROR: i32 = -4;
/// Invalid, missing or duplicate parameter.
pub const RPC_INVALID_PARAMETER: i32 = -8;
/// Keypool ran out; unlock and call keypoolrefill first.
pub const RPC_WALLET_KEYPOOL_RAN_OUT: i32 = -12;
/// Wallet must be unlocked with walletpassphrase first.
pub const RPC_WALLET_UNLOCK_NEEDED: i32 = -13;
/// The wallet passphrase entered was incorrect.
pub const RPC_WALLET_PASSPHRASE_INCORRECT: i32 = -14;
/// Command given in wrong wallet encryption state.
pub const RPC_WALLET_WRONG_ENC_STATE: i32 = -15;

/// `getauxblock` result: a new template, or the verdict on a submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AuxBlockResponse {
    Template(AuxBlock),
    Submitted(bool),
}

/// Create a JSON-RPC error.
fn rpc_error(code: i32, msg: &str) -> ErrorObjectOwned {
    ErrorObjectOwned::owned(code, msg.to_string(), None::<()>)
}

/// Stable RPC code for a wallet error.
pub fn wallet_error_code(e: &WalletError) -> i32 {
    match e {
        WalletError::KeypoolRanOut => RPC_WALLET_KEYPOOL_RAN_OUT,
        WalletError::Locked => RPC_WALLET_UNLOCK_NEEDED,
        WalletError::InvalidPassphrase => RPC_WALLET_PASSPHRASE_INCORRECT,
        WalletError::NotEncrypted | WalletError::AlreadyEncrypted => RPC_WALLET_WRONG_ENC_STATE,
        _ => RPC_WALLET_ERROR,
    }
}

/// Stable RPC code for a node error.
pub fn node_error_code(e: &NodeError) -> i32 {
    match e {
        NodeError::Wallet(w) => wallet_error_code(w),
        NodeError::UnknownAuxBlock(_) => RPC_INVALID_PARAMETER,
        _ => RPC_MISC_ERROR,
    }
}

fn node_rpc_error(e: NodeError) -> ErrorObjectOwned {
    rpc_error(node_error_code(&e), &e.to_string())
}

/// Parse a 64-character hex string into a Hash256.
pub fn parse_hash(hex_str: &str) -> Result<Hash256, ErrorObjectOwned> {
    Hash256::from_hex(hex_str)
        .ok_or_else(|| rpc_error(RPC_INVALID_PARAMETER, "hash must be 64 hex characters"))
}

fn require_passphrase(passphrase: &str) -> Result<(), ErrorObjectOwned> {
    if passphrase.is_empty() {
        return Err(rpc_error(RPC_INVALID_PARAMETER, "passphrase can not be empty"));
    }
    Ok(())
}

/// The Keywell JSON-RPC interface.
#[rpc(server)]
pub trait KeywellRpc {
    /// Returns a new receiving address, consuming one keypool key.
    #[method(name = "getnewaddress")]
    async fn get_new_address(&self) -> Result<String, ErrorObjectOwned>;

    /// Returns a new change address, consuming one keypool key.
    #[method(name = "getrawchangeaddress")]
    async fn get_raw_change_address(&self) -> Result<String, ErrorObjectOwned>;

    /// Fills the keypool to `newsize` (or the configured size).
    #[method(name = "keypoolrefill")]
    async fn keypool_refill(&self, newsize: Option<usize>) -> Result<(), ErrorObjectOwned>;

    /// Unlocks the wallet for `timeout` seconds (0 = until walletlock).
    #[method(name = "walletpassphrase")]
    async fn wallet_passphrase(
        &self,
        passphrase: String,
        timeout: u64,
    ) -> Result<(), ErrorObjectOwned>;

    /// Locks the wallet.
    #[method(name = "walletlock")]
    async fn wallet_lock(&self) -> Result<(), ErrorObjectOwned>;

    /// Changes the wallet passphrase.
    #[method(name = "walletpassphrasechange")]
    async fn wallet_passphrase_change(
        &self,
        oldpassphrase: String,
        newpassphrase: String,
    ) -> Result<(), ErrorObjectOwned>;

    /// Encrypts the wallet; it ends locked.
    #[method(name = "encryptwallet")]
    async fn encrypt_wallet(&self, passphrase: String) -> Result<String, ErrorObjectOwned>;

    /// Returns keypool and encryption state.
    #[method(name = "getwalletinfo")]
    async fn get_wallet_info(&self) -> Result<WalletInfo, ErrorObjectOwned>;

    /// Mines `nblocks` blocks to keypool keys; returns their hashes.
    #[method(name = "generate")]
    async fn generate(&self, nblocks: u64) -> Result<Vec<String>, ErrorObjectOwned>;

    /// Without arguments, creates a merged-mining template. With `hash` and
    /// `auxpow`, submits a solved template.
    #[method(name = "getauxblock")]
    async fn get_aux_block(
        &self,
        hash: Option<String>,
        auxpow: Option<String>,
    ) -> Result<AuxBlockResponse, ErrorObjectOwned>;

    /// Returns the current block count (chain tip height).
    #[method(name = "getblockcount")]
    async fn get_block_count(&self) -> Result<u64, ErrorObjectOwned>;
}

/// Implementation of the Keywell JSON-RPC server.
pub struct RpcServerImpl {
    node: Arc<Node>,
}

impl RpcServerImpl {
    /// Create a new RPC server implementation wrapping the given node.
    pub fn new(node: Arc<Node>) -> Self {
        Self { node }
    }
}

#[async_trait]
impl KeywellRpcServer for RpcServerImpl {
    async fn get_new_address(&self) -> Result<String, ErrorObjectOwned> {
        let address = self.node.get_new_address().map_err(node_rpc_error)?;
        Ok(address.to_string())
    }

    async fn get_raw_change_address(&self) -> Result<String, ErrorObjectOwned> {
        let address = self.node.get_raw_change_address().map_err(node_rpc_error)?;
        Ok(address.to_string())
    }

    async fn keypool_refill(&self, newsize: Option<usize>) -> Result<(), ErrorObjectOwned> {
        self.node.keypool_refill(newsize).map_err(node_rpc_error)?;
        Ok(())
    }

    async fn wallet_passphrase(
        &self,
        passphrase: String,
        timeout: u64,
    ) -> Result<(), ErrorObjectOwned> {
        require_passphrase(&passphrase)?;
        self.node
            .wallet_passphrase(passphrase.as_bytes(), timeout)
            .map_err(node_rpc_error)
    }

    async fn wallet_lock(&self) -> Result<(), ErrorObjectOwned> {
        self.node.wallet_lock().map_err(node_rpc_error)
    }

    async fn wallet_passphrase_change(
        &self,
        oldpassphrase: String,
        newpassphrase: String,
    ) -> Result<(), ErrorObjectOwned> {
        require_passphrase(&oldpassphrase)?;
        require_passphrase(&newpassphrase)?;
        self.node
            .wallet_passphrase_change(oldpassphrase.as_bytes(), newpassphrase.as_bytes())
            .map_err(node_rpc_error)
    }

    async fn encrypt_wallet(&self, passphrase: String) -> Result<String, ErrorObjectOwned> {
        require_passphrase(&passphrase)?;
        self.node
            .encrypt_wallet(passphrase.as_bytes())
            .map_err(node_rpc_error)?;
        Ok("wallet encrypted; the keypool has been regenerated".to_string())
    }

    async fn get_wallet_info(&self) -> Result<WalletInfo, ErrorObjectOwned> {
        Ok(self.node.wallet_info())
    }

    async fn generate(&self, nblocks: u64) -> Result<Vec<String>, ErrorObjectOwned> {
        let hashes = self.node.generate(nblocks).map_err(node_rpc_error)?;
        Ok(hashes.iter().map(Hash256::to_hex).collect())
    }

    async fn get_aux_block(
        &self,
        hash: Option<String>,
        auxpow: Option<String>,
    ) -> Result<AuxBlockResponse, ErrorObjectOwned> {
        match (hash, auxpow) {
            (None, None) => {
                let template = self.node.create_aux_block().map_err(node_rpc_error)?;
                Ok(AuxBlockResponse::Template(template))
            }
            (Some(hash), Some(auxpow)) => {
                let hash = parse_hash(&hash)?;
                let proof = hex::decode(&auxpow)
                    .map_err(|_| rpc_error(RPC_INVALID_PARAMETER, "invalid hex in auxpow"))?;
                match self.node.submit_aux_block(&hash, &proof) {
                    Ok(_) => Ok(AuxBlockResponse::Submitted(true)),
                    Err(NodeError::InvalidAuxPow) => Ok(AuxBlockResponse::Submitted(false)),
                    Err(e) => Err(node_rpc_error(e)),
                }
            }
            _ => Err(rpc_error(
                RPC_INVALID_PARAMETER,
                "getauxblock takes either no arguments or both hash and auxpow",
            )),
        }
    }

    async fn get_block_count(&self) -> Result<u64, ErrorObjectOwned> {
        Ok(self.node.block_count())
    }
}

/// Start the JSON-RPC server on the given address.
///
/// Returns the bound address (useful with port 0) and a [`ServerHandle`]
/// that can be used to stop the server.
pub async fn start_rpc_server(
    addr: &str,
    node: Arc<Node>,
) -> Result<(SocketAddr, ServerHandle), NodeError> {
    let server = Server::builder()
        .build(addr)
        .await
        .map_err(|e| NodeError::Storage(format!("RPC server error: {e}")))?;
    let local_addr = server
        .local_addr()
        .map_err(|e| NodeError::Storage(format!("RPC server error: {e}")))?;

    let rpc_impl = RpcServerImpl::new(node);
    let handle = server.start(rpc_impl.into_rpc());

    Ok((local_addr, handle))
}

#[cfg(test)]
mod tests {
    use super::*;
    use keywell_core::error::BlockError;

    #[test]
    fn wallet_error_codes_are_stable() {
        assert_eq!(wallet_error_code(&WalletError::KeypoolRanOut), -12);
        assert_eq!(wallet_error_code(&WalletError::Locked), -13);
        assert_eq!(wallet_error_code(&WalletError::InvalidPassphrase), -14);
        assert_eq!(wallet_error_code(&WalletError::NotEncrypted), -15);
        assert_eq!(wallet_error_code(&WalletError::AlreadyEncrypted), -15);
        assert_eq!(wallet_error_code(&WalletError::InvalidHandle(1)), -4);
    }

    #[test]
    fn node_error_codes() {
        assert_eq!(node_error_code(&WalletError::KeypoolRanOut.into()), -12);
        assert_eq!(node_error_code(&NodeError::UnknownAuxBlock("aa".into())), -8);
        assert_eq!(node_error_code(&BlockError::InvalidPoW.into()), -1);
    }

    #[test]
    fn rpc_error_carries_message() {
        let err = node_rpc_error(WalletError::KeypoolRanOut.into());
        assert_eq!(err.code(), -12);
        assert!(err.message().contains("keypool ran out"));
    }

    #[test]
    fn parse_hash_rejects_garbage() {
        assert!(parse_hash("zz").is_err());
        let hash = Hash256([7; 32]);
        assert_eq!(parse_hash(&hash.to_hex()).unwrap(), hash);
    }

    #[test]
    fn aux_response_serializes_untagged() {
        let json = serde_json::to_value(AuxBlockResponse::Submitted(true)).unwrap();
        assert_eq!(json, serde_json::Value::Bool(true));
    }
}
