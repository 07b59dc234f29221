//! Longest-valid-chain conflict resolution.

use crate::state::NodeState;
use ledger_core::Block;
use tracing::{debug, info, warn};

/// Ask every peer for its chain and adopt the longest one that is strictly
/// longer than ours and passes full validation. Returns whether the local
/// chain was replaced.
///
/// Peers are asked one after another in registry order. Between equally long
/// valid candidates the first one seen wins; the protocol gives no meaning to
/// that order. Unreachable peers are skipped. Block count is the only weight:
/// difficulty is uniform, so cumulative work is not compared.
pub async fn resolve_conflicts(node: &NodeState) -> bool {
    let validator = node.validator().await;
    let mut max_length = node.height().await;
    let mut best: Option<(String, Vec<Block>)> = None;

    for peer in node.peers().await {
        let response = match node.client().fetch_chain(&peer).await {
            Ok(response) => response,
            Err(err) => {
                warn!(peer = err.peer(), %err, "skipping peer during resolve");
                continue;
            }
        };
        if response.length != response.chain.len() as u64 {
            warn!(%peer, reported = response.length, actual = response.chain.len(), "peer misreported its chain length");
            continue;
        }
        if response.length <= max_length {
            debug!(%peer, length = response.length, max_length, "peer chain is not longer");
            continue;
        }
        if let Err(err) = validator.validate_chain(&response.chain) {
            warn!(%peer, %err, "peer offered an invalid longer chain");
            continue;
        }
        max_length = response.length;
        best = Some((peer, response.chain));
    }

    let Some((peer, chain)) = best else {
        debug!("no longer valid chain among peers");
        return false;
    };

    let mut ledger = node.ledger_mut().await;
    // The local chain may have grown while peers were being queried.
    if chain.len() as u64 <= ledger.height() {
        info!(%peer, "local chain caught up during resolve; keeping it");
        return false;
    }
    match ledger.replace_chain(chain) {
        Ok(()) => {
            node.persist(&ledger).await;
            info!(%peer, height = ledger.height(), "adopted longer chain");
            true
        }
        Err(err) => {
            warn!(%peer, %err, "candidate chain rejected at replacement");
            false
        }
    }
}
