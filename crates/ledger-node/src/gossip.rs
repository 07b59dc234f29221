//! Best-effort flooding of transactions and blocks.
//!
//! Every push is a single attempt per peer with the client's timeout. Failures
//! are logged and never reach the request that triggered the flood.

use crate::state::NodeState;
use ledger_core::{Block, BlockVerdict, Submission, Transaction, TransactionEnvelope};
use reqwest::StatusCode;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, info, warn};

/// Accept a transaction into the pool and flood it if the relay policy says so.
pub async fn receive_transaction(node: &NodeState, envelope: TransactionEnvelope) -> Submission {
    let TransactionEnvelope {
        transaction,
        propagated,
    } = envelope;
    let outcome = node.ledger_mut().await.submit_transaction(transaction.clone());
    if let Submission::Accepted { block_index } = outcome {
        debug!(block_index, propagated, "transaction queued");
        if node.config().relay.should_flood(propagated) {
            broadcast_transaction(node, transaction);
        }
    }
    outcome
}

/// Push a transaction, marked as propagated, to every known peer.
pub fn broadcast_transaction(node: &NodeState, tx: Transaction) -> JoinHandle<()> {
    let node = node.clone();
    tokio::spawn(async move {
        let envelope = TransactionEnvelope::propagated(tx);
        let mut sends = JoinSet::new();
        for peer in node.peers().await {
            let client = node.client().clone();
            let envelope = envelope.clone();
            sends.spawn(async move {
                let result = client.send_transaction(&peer, &envelope).await;
                (peer, result)
            });
        }
        while let Some(joined) = sends.join_next().await {
            match joined {
                Ok((peer, Ok(status))) => debug!(%peer, %status, "transaction pushed"),
                Ok((_, Err(err))) => warn!(peer = err.peer(), %err, "transaction gossip failed"),
                Err(err) => warn!(%err, "transaction gossip task failed"),
            }
        }
    })
}

/// Push a freshly sealed block to every known peer.
pub fn broadcast_block(node: &NodeState, block: Block) -> JoinHandle<()> {
    let node = node.clone();
    tokio::spawn(async move {
        let index = block.index;
        let mut sends = JoinSet::new();
        for peer in node.peers().await {
            let client = node.client().clone();
            let block = block.clone();
            sends.spawn(async move {
                let result = client.send_block(&peer, &block).await;
                (peer, result)
            });
        }
        while let Some(joined) = sends.join_next().await {
            match joined {
                Ok((peer, Ok(StatusCode::CONFLICT))) => {
                    info!(%peer, index, "peer is behind and will resync")
                }
                Ok((peer, Ok(status))) if status.is_client_error() => {
                    warn!(%peer, index, %status, "peer rejected block")
                }
                Ok((peer, Ok(status))) => debug!(%peer, index, %status, "block pushed"),
                Ok((_, Err(err))) => warn!(peer = err.peer(), %err, index, "block gossip failed"),
                Err(err) => warn!(%err, "block gossip task failed"),
            }
        }
    })
}

/// Apply a block pushed by a peer and persist it when accepted. Scheduling a
/// resync on [`BlockVerdict::NeedsFullResync`] is left to the caller.
pub async fn receive_block(node: &NodeState, block: Block) -> BlockVerdict {
    let mut ledger = node.ledger_mut().await;
    let verdict = ledger.receive_block(block);
    if verdict == BlockVerdict::Accept {
        node.persist(&ledger).await;
    }
    verdict
}
