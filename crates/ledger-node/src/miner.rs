use crate::{gossip, state::NodeState};
use anyhow::Context;
use ledger_core::{
    constants::{REWARD_AMOUNT, REWARD_SENDER},
    Block, Timestamp, Transaction,
};
use tracing::info;

/// Find a proof for the current tip, seal the pending pool plus a reward
/// transaction into a block, persist it and push it to peers.
///
/// The search runs on the blocking pool so request handling is not starved.
/// If the tip changes while searching (a peer's block arrived, or the chain
/// was replaced) the proof is stale and the search restarts on the new tip.
pub async fn mine(node: &NodeState) -> anyhow::Result<Block> {
    let pow = node.config().pow;
    mine_with(node, move |last_proof| pow.search_parallel(last_proof)).await
}

async fn mine_with<F>(node: &NodeState, search: F) -> anyhow::Result<Block>
where
    F: Fn(u64) -> u64 + Clone + Send + 'static,
{
    let _only_miner = node.mining_lock().lock().await;

    loop {
        let tip = node.last_block().await;
        let tip_hash = tip.hash();
        let last_proof = tip.proof;
        let search = search.clone();
        let proof = tokio::task::spawn_blocking(move || search(last_proof))
            .await
            .context("proof-of-work worker failed")?;

        let mut ledger = node.ledger_mut().await;
        if ledger.last_hash() != tip_hash {
            info!(index = tip.index, "tip moved while mining; searching again");
            continue;
        }
        ledger.submit_transaction(Transaction {
            sender: REWARD_SENDER.to_string(),
            recipient: node.config().node_id.clone(),
            amount: REWARD_AMOUNT,
            time: Timestamp::now(),
        });
        let block = ledger.seal_block(proof, Some(tip_hash));
        node.persist(&ledger).await;
        drop(ledger);

        info!(index = block.index, proof, txs = block.transactions.len(), "mined block");
        gossip::broadcast_block(node, block.clone());
        return Ok(block);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NodeConfig;
    use ledger_core::{BlockValidator, BlockVerdict, LedgerState, ProofOfWork};
    use ledger_storage::JsonFileStore;
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        mpsc, Arc, Mutex,
    };

    fn peer_block(pow: ProofOfWork) -> Block {
        let mut ledger = LedgerState::new(BlockValidator::new(pow));
        ledger.submit_transaction(Transaction {
            sender: "alice".to_string(),
            recipient: "bob".to_string(),
            amount: 10,
            time: Timestamp::Fractional(1_600_000_000.0),
        });
        let proof = pow.search(ledger.last_block().proof);
        ledger.seal_block(proof, None)
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn search_restarts_when_the_tip_moves() {
        let dir = tempfile::tempdir().unwrap();
        let pow = ProofOfWork::with_zeros(2);
        let config = NodeConfig::new("127.0.0.1:5000").unwrap().with_pow(pow);
        let store = Arc::new(JsonFileStore::new(dir.path().join("blockchain_5000.json")));
        let node = NodeState::open(config, store).unwrap();

        // The first search parks until the test has moved the tip.
        let (started_tx, mut started_rx) = tokio::sync::mpsc::unbounded_channel();
        let (release_tx, release_rx) = mpsc::channel::<()>();
        let release_rx = Arc::new(Mutex::new(release_rx));
        let calls = Arc::new(AtomicUsize::new(0));
        let search = {
            let calls = Arc::clone(&calls);
            move |last_proof: u64| {
                if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    started_tx.send(last_proof).unwrap();
                    release_rx.lock().unwrap().recv().unwrap();
                }
                pow.search(last_proof)
            }
        };
        let miner = tokio::spawn({
            let node = node.clone();
            async move { mine_with(&node, search).await }
        });

        assert_eq!(started_rx.recv().await, Some(100));
        let arrived = peer_block(pow);
        assert_eq!(
            gossip::receive_block(&node, arrived.clone()).await,
            BlockVerdict::Accept
        );
        release_tx.send(()).unwrap();

        let block = miner.await.unwrap().unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(block.index, 3);
        assert_eq!(block.previous_hash, arrived.hash());
        assert!(pow.valid_proof(arrived.proof, block.proof));

        let chain = node.chain().await;
        assert_eq!(chain.len(), 3);
        assert_eq!(chain[1], arrived);
        assert_eq!(BlockValidator::new(pow).validate_chain(&chain), Ok(()));
    }
}
