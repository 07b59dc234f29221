#![allow(dead_code)]

use std::{future::Future, sync::Arc, time::Duration};

use ledger_core::{Block, BlockValidator, LedgerState, ProofOfWork, Timestamp, Transaction};
use ledger_node::{directory::DirectoryState, NodeConfig, NodeState, RelayPolicy};
use ledger_storage::JsonFileStore;
use serde_json::Value;
use tempfile::{tempdir, TempDir};
use tokio::net::TcpListener;

pub const DIFFICULTY: usize = 3;

/// A node served on an ephemeral port with its snapshot in a temp dir.
pub struct TestNode {
    pub node: NodeState,
    pub addr: String,
    pub url: String,
    pub dir: TempDir,
}

pub fn pow() -> ProofOfWork {
    ProofOfWork::with_zeros(DIFFICULTY)
}

pub fn snapshot_path(dir: &TempDir, port: u16) -> std::path::PathBuf {
    dir.path().join(format!("blockchain_{port}.json"))
}

pub async fn spawn_node() -> TestNode {
    spawn_node_with(RelayPolicy::OriginOnly).await
}

pub async fn spawn_node_with(relay: RelayPolicy) -> TestNode {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind node");
    let addr = listener.local_addr().expect("local addr").to_string();
    let dir = tempdir().expect("Failed to create temp dir");
    let config = NodeConfig::new(&addr)
        .expect("node config")
        .with_pow(pow())
        .with_relay(relay)
        .with_peer_timeout(Duration::from_millis(500));
    let store = Arc::new(JsonFileStore::new(snapshot_path(&dir, config.port())));
    let node = NodeState::open(config, store).expect("open node");
    tokio::spawn(ledger_node::serve(
        listener,
        node.clone(),
        std::future::pending(),
    ));
    TestNode {
        node,
        url: format!("http://{addr}"),
        addr,
        dir,
    }
}

/// Directory service on an ephemeral port; returns its `host:port`.
pub async fn spawn_directory() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind directory");
    let addr = listener.local_addr().expect("local addr").to_string();
    let state = DirectoryState::new(Duration::from_millis(500)).expect("directory state");
    tokio::spawn(ledger_node::serve_directory(
        listener,
        state,
        std::future::pending(),
    ));
    addr
}

/// Serve a fixed `/chain` body, standing in for a peer.
pub async fn spawn_fake_peer(body: Value) -> String {
    use axum::{routing::get, Json, Router};

    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind fake peer");
    let addr = listener.local_addr().expect("local addr").to_string();
    let app = Router::new().route("/chain", get(move || async move { Json(body) }));
    tokio::spawn(async move { axum::serve(listener, app).await });
    addr
}

/// Connect every pair of nodes in both directions.
pub async fn mesh(nodes: &[&TestNode]) {
    for a in nodes {
        for b in nodes {
            if a.addr != b.addr {
                a.node.add_peer(&b.addr).await.expect("add peer");
            }
        }
    }
}

pub async fn wait_until<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    for _ in 0..100 {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    false
}

pub fn tx(sender: &str, recipient: &str, amount: u64) -> Transaction {
    Transaction {
        sender: sender.to_string(),
        recipient: recipient.to_string(),
        amount,
        time: Timestamp::Fractional(1_600_000_000.0 + amount as f64),
    }
}

pub async fn mine(url: &str) -> Block {
    let body: Value = reqwest::get(format!("{url}/mine"))
        .await
        .expect("mine request")
        .json()
        .await
        .expect("mine body");
    serde_json::from_value(body["block"].clone()).expect("mined block")
}

pub async fn submit(url: &str, tx: &Transaction) -> reqwest::StatusCode {
    reqwest::Client::new()
        .post(format!("{url}/transactions/new"))
        .json(tx)
        .send()
        .await
        .expect("submit request")
        .status()
}

/// A valid chain of `blocks` blocks after genesis, built offline.
pub fn offline_chain(blocks: usize) -> Vec<Block> {
    let mut ledger = LedgerState::new(BlockValidator::new(pow()));
    for b in 0..blocks {
        ledger.submit_transaction(tx(&format!("offline_{b}"), "sink", b as u64));
        let proof = pow().search(ledger.last_block().proof);
        ledger.seal_block(proof, None);
    }
    ledger.chain().to_vec()
}
