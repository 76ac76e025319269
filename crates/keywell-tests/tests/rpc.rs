//! The keypool lifecycle over JSON-RPC.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use jsonrpsee::core::client::{ClientT, Error as ClientError};
use jsonrpsee::http_client::{HttpClient, HttpClientBuilder};
use jsonrpsee::rpc_params;
use jsonrpsee::server::ServerHandle;
use serde_json::Value;

use keywell_core::block_validation::solve_aux_pow;
use keywell_core::traits::ManualClock;
use keywell_core::types::Hash256;
use keywell_node_lib::auxpow::AuxBlock;
use keywell_node_lib::{start_rpc_server, Node};
use keywell_tests::helpers::{test_node, PASS};
use keywell_wallet::WalletInfo;

struct Harness {
    client: HttpClient,
    clock: ManualClock,
    node: Arc<Node>,
    handle: ServerHandle,
    _dir: tempfile::TempDir,
}

async fn start(keypool_size: usize) -> Harness {
    let (node, clock, dir) = test_node(keypool_size);
    let (addr, handle): (SocketAddr, ServerHandle) =
        start_rpc_server(&node.config().rpc_addr(), Arc::clone(&node))
            .await
            .unwrap();
    let client = HttpClientBuilder::default()
        .build(format!("http://{addr}"))
        .unwrap();
    Harness {
        client,
        clock,
        node,
        handle,
        _dir: dir,
    }
}

fn error_code(err: ClientError) -> i32 {
    match err {
        ClientError::Call(obj) => obj.code(),
        other => panic!("expected a call error, got {other:?}"),
    }
}

async fn wallet_info(client: &HttpClient) -> WalletInfo {
    client.request("getwalletinfo", rpc_params![]).await.unwrap()
}

#[tokio::test]
async fn exhaustion_is_reported_as_keypool_ran_out() {
    let h = start(1).await;
    let _: String = h
        .client
        .request("encryptwallet", rpc_params![PASS])
        .await
        .unwrap();

    let addr: String = h.client.request("getnewaddress", rpc_params![]).await.unwrap();
    assert!(!addr.is_empty());

    let err = h
        .client
        .request::<String, _>("getnewaddress", rpc_params![])
        .await
        .unwrap_err();
    assert_eq!(error_code(err), -12);

    let err = h
        .client
        .request::<Value, _>("keypoolrefill", rpc_params![3])
        .await
        .unwrap_err();
    assert_eq!(error_code(err), -13);

    h.handle.stop().unwrap();
}

#[tokio::test]
async fn walletinfo_tracks_unlock_expiry() {
    let h = start(2).await;

    // Unencrypted wallets report no unlock field at all.
    let raw: Value = h.client.request("getwalletinfo", rpc_params![]).await.unwrap();
    assert!(raw.get("unlocked_until").is_none());
    assert_eq!(raw["keypoolsize"], 2);

    let err = h
        .client
        .request::<Value, _>("walletlock", rpc_params![])
        .await
        .unwrap_err();
    assert_eq!(error_code(err), -15);

    let _: String = h
        .client
        .request("encryptwallet", rpc_params![PASS])
        .await
        .unwrap();
    let err = h
        .client
        .request::<Value, _>("walletpassphrase", rpc_params!["wrong", 10])
        .await
        .unwrap_err();
    assert_eq!(error_code(err), -14);

    let _: Value = h
        .client
        .request("walletpassphrase", rpc_params![PASS, 1])
        .await
        .unwrap();
    assert!(wallet_info(&h.client).await.unlocked_until.unwrap() > 0);

    h.clock.advance(Duration::from_millis(1_100));
    let info = wallet_info(&h.client).await;
    assert_eq!(info.unlocked_until, Some(0));
    assert!(info.encrypted);

    h.handle.stop().unwrap();
}

#[tokio::test]
async fn getauxblock_create_and_submit() {
    let h = start(2).await;

    let template: AuxBlock = h.client.request("getauxblock", rpc_params![]).await.unwrap();
    assert_eq!(wallet_info(&h.client).await.keypool_reserved, 1);

    let hash = Hash256::from_hex(&template.hash).unwrap();
    let target = template.target_value().unwrap();
    let proof = solve_aux_pow(&hash, target, 100_000).unwrap();
    let ok: bool = h
        .client
        .request("getauxblock", rpc_params![&template.hash, hex::encode(&proof)])
        .await
        .unwrap();
    assert!(ok);

    let count: u64 = h.client.request("getblockcount", rpc_params![]).await.unwrap();
    assert_eq!(count, 1);
    let info = wallet_info(&h.client).await;
    assert_eq!(info.keypool_reserved, 0);
    assert_eq!(info.keys_used, 1);

    let err = h
        .client
        .request::<bool, _>("getauxblock", rpc_params![&template.hash, hex::encode(&proof)])
        .await
        .unwrap_err();
    assert_eq!(error_code(err), -8);

    h.handle.stop().unwrap();
}

#[tokio::test]
async fn generate_returns_block_hashes() {
    let h = start(3).await;
    let hashes: Vec<String> = h.client.request("generate", rpc_params![2]).await.unwrap();
    assert_eq!(hashes.len(), 2);
    assert_eq!(hashes[1], h.node.best_block_hash().to_hex());
    assert_eq!(wallet_info(&h.client).await.keys_used, 2);

    h.handle.stop().unwrap();
}
