//! Optional directory service nodes can bootstrap their peer sets from.
//!
//! A joining node is introduced to every node already registered (each is
//! asked to add the newcomer) and receives the list of those nodes in return.
//! The directory's view and each node's own peer set are kept independently
//! and are not reconciled; they can drift apart when nodes die without
//! unregistering.

use crate::{
    client::{PeerClient, PeerList, PortRequest},
    state::NodeState,
};
use axum::{
    extract::{rejection::JsonRejection, ConnectInfo, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use ledger_core::PeerRegistry;
use serde_json::json;
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::sync::RwLock;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

#[derive(Clone)]
pub struct DirectoryState {
    peers: Arc<RwLock<PeerRegistry>>,
    client: PeerClient,
}

impl DirectoryState {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self {
            peers: Arc::new(RwLock::new(PeerRegistry::new())),
            client: PeerClient::new(timeout)?,
        })
    }

    pub async fn peers(&self) -> Vec<String> {
        self.peers.read().await.peers()
    }
}

/// Routes must be served with `into_make_service_with_connect_info::<SocketAddr>()`
/// so the caller's IP is known.
pub fn router(state: DirectoryState) -> Router {
    Router::new()
        .route("/register", post(register))
        .route("/unregister", post(unregister))
        .route("/peers", get(list_peers))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn bad_request(text: String) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "message": text }))).into_response()
}

async fn register(
    State(dir): State<DirectoryState>,
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
    payload: Result<Json<PortRequest>, JsonRejection>,
) -> Response {
    let Json(PortRequest { port }) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return bad_request(rejection.body_text()),
    };
    let joiner = SocketAddr::new(remote.ip(), port).to_string();

    // Record the joiner and read everyone else under one lock, so two
    // concurrent joiners always see each other from one side or the other.
    let (prior, registered) = {
        let mut peers = dir.peers.write().await;
        if let Err(err) = peers.add_peer(&joiner) {
            return bad_request(err.to_string());
        }
        let prior: Vec<String> = peers
            .peers()
            .into_iter()
            .filter(|peer| *peer != joiner)
            .collect();
        (prior, peers.len())
    };

    for peer in &prior {
        if let Err(err) = dir.client.introduce(peer, std::slice::from_ref(&joiner)).await {
            warn!(%err, %joiner, "could not introduce new node");
        }
    }
    info!(%joiner, known = prior.len(), registered, "node registered");
    Json(PeerList { peers: prior }).into_response()
}

async fn unregister(
    State(dir): State<DirectoryState>,
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
    payload: Result<Json<PortRequest>, JsonRejection>,
) -> Response {
    let Json(PortRequest { port }) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return bad_request(rejection.body_text()),
    };
    let leaver = SocketAddr::new(remote.ip(), port).to_string();
    match dir.peers.write().await.remove_peer(&leaver) {
        Ok(removed) => {
            info!(%leaver, removed, "node unregistered");
            Json(json!({ "message": format!("{leaver} unregistered") })).into_response()
        }
        Err(err) => bad_request(err.to_string()),
    }
}

async fn list_peers(State(dir): State<DirectoryState>) -> Json<PeerList> {
    Json(PeerList {
        peers: dir.peers().await,
    })
}

/// Register `node` with the directory and add every peer it returns.
pub async fn join(node: &NodeState, directory: &str) -> anyhow::Result<usize> {
    let peers = node
        .client()
        .join_directory(directory, node.config().port())
        .await?;
    let mut added = 0;
    for peer in &peers {
        match node.add_peer(peer).await {
            Ok(true) => added += 1,
            Ok(false) => {}
            Err(err) => warn!(%err, "directory returned a bad address"),
        }
    }
    info!(directory, added, "joined directory");
    Ok(added)
}

/// Remove `node` from the directory on graceful shutdown.
pub async fn leave(node: &NodeState, directory: &str) -> anyhow::Result<()> {
    node.client()
        .leave_directory(directory, node.config().port())
        .await?;
    info!(directory, "left directory");
    Ok(())
}
