use crate::{
    client::{ChainResponse, RegisterNodes},
    consensus, gossip, miner,
    state::NodeState,
};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use ledger_core::{Block, BlockVerdict, Submission, TransactionEnvelope};
use serde::Serialize;
use serde_json::json;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

#[derive(Serialize)]
struct Health {
    status: &'static str,
}

fn message(status: StatusCode, text: impl Into<String>) -> Response {
    (status, Json(json!({ "message": text.into() }))).into_response()
}

pub fn router(node: NodeState) -> Router {
    Router::new()
        .route("/health", get(|| async { Json(Health { status: "ok" }) }))
        .route("/chain", get(full_chain))
        .route("/transactions/new", post(new_transaction))
        .route("/transactions/pending", get(pending_transactions))
        .route("/blocks/receive", post(receive_block))
        .route("/nodes/resolve", get(resolve))
        .route("/nodes/register", post(register_nodes))
        .route("/nodes", get(list_nodes))
        .route("/mine", get(mine))
        .layer(TraceLayer::new_for_http())
        .with_state(node)
}

async fn full_chain(State(node): State<NodeState>) -> Json<ChainResponse> {
    let chain = node.chain().await;
    Json(ChainResponse {
        length: chain.len() as u64,
        chain,
    })
}

async fn new_transaction(
    State(node): State<NodeState>,
    payload: Result<Json<TransactionEnvelope>, JsonRejection>,
) -> Response {
    let Json(envelope) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            return message(
                StatusCode::BAD_REQUEST,
                format!("missing or malformed fields (sender, recipient, amount, time): {rejection}"),
            )
        }
    };
    match gossip::receive_transaction(&node, envelope).await {
        Submission::Accepted { block_index } => (
            StatusCode::CREATED,
            Json(json!({
                "message": format!("transaction will be added to block {block_index}"),
                "index": block_index,
            })),
        )
            .into_response(),
        Submission::Duplicate => message(StatusCode::OK, "duplicate"),
    }
}

async fn pending_transactions(State(node): State<NodeState>) -> Response {
    let transactions = node.pending().await;
    Json(json!({ "count": transactions.len(), "transactions": transactions })).into_response()
}

async fn receive_block(
    State(node): State<NodeState>,
    payload: Result<Json<Block>, JsonRejection>,
) -> Response {
    let Json(block) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return message(StatusCode::BAD_REQUEST, rejection.body_text()),
    };
    match gossip::receive_block(&node, block).await {
        BlockVerdict::Accept => message(StatusCode::CREATED, "block accepted"),
        BlockVerdict::Stale => message(StatusCode::OK, "already have this block or a later one"),
        BlockVerdict::NeedsFullResync => {
            let node = node.clone();
            tokio::spawn(async move {
                consensus::resolve_conflicts(&node).await;
            });
            message(StatusCode::CONFLICT, "chain resync needed")
        }
        BlockVerdict::Invalid(err) => message(StatusCode::BAD_REQUEST, err.to_string()),
    }
}

async fn resolve(State(node): State<NodeState>) -> Response {
    let replaced = consensus::resolve_conflicts(&node).await;
    let chain = node.chain().await;
    Json(json!({ "replaced": replaced, "chain": chain })).into_response()
}

async fn register_nodes(
    State(node): State<NodeState>,
    payload: Result<Json<RegisterNodes>, JsonRejection>,
) -> Response {
    let Json(RegisterNodes { nodes }) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return message(StatusCode::BAD_REQUEST, rejection.body_text()),
    };
    if nodes.is_empty() {
        return message(StatusCode::BAD_REQUEST, "supply a non-empty list of nodes");
    }
    match node.add_peers(&nodes).await {
        Ok(added) => {
            info!(added, "peers registered");
            (
                StatusCode::CREATED,
                Json(json!({
                    "message": format!("{added} new node(s) added"),
                    "total_nodes": node.peers().await,
                })),
            )
                .into_response()
        }
        Err(err) => message(StatusCode::BAD_REQUEST, err.to_string()),
    }
}

async fn list_nodes(State(node): State<NodeState>) -> Response {
    Json(json!({ "nodes": node.peers().await })).into_response()
}

async fn mine(State(node): State<NodeState>) -> Response {
    match miner::mine(&node).await {
        Ok(block) => Json(json!({ "message": "new block forged", "block": block })).into_response(),
        Err(err) => {
            error!(%err, "mining failed");
            message(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
    }
}
