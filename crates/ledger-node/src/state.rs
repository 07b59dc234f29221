use crate::{client::PeerClient, config::NodeConfig};
use anyhow::Context;
use ledger_core::{
    ledger::bootstrap, AddressError, Block, BlockValidator, ChainStore, LedgerState, PeerRegistry,
    Transaction,
};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock, RwLockWriteGuard};
use tracing::error;

/// Everything one node owns, cheap to clone into handlers and background tasks.
///
/// The ledger sits behind a single writer lock: sealing, accepting a pushed
/// block and replacing the chain never interleave. The peer set has its own
/// lock and is not part of the ledger's consistency domain.
#[derive(Clone)]
pub struct NodeState {
    ledger: Arc<RwLock<LedgerState>>,
    peers: Arc<RwLock<PeerRegistry>>,
    store: Arc<dyn ChainStore>,
    client: PeerClient,
    config: Arc<NodeConfig>,
    mining: Arc<Mutex<()>>,
}

impl NodeState {
    /// Load (or create) the chain snapshot and build the node. An unreadable
    /// or invalid snapshot is returned as an error; callers must not go on.
    pub fn open(config: NodeConfig, store: Arc<dyn ChainStore>) -> anyhow::Result<Self> {
        let validator = BlockValidator::new(config.pow);
        let ledger = bootstrap(store.as_ref(), validator)
            .context("refusing to start on unknown ledger state")?;
        let peers = PeerRegistry::with_own_address(&config.advertise)?;
        let client = PeerClient::new(config.peer_timeout)?;
        Ok(Self {
            ledger: Arc::new(RwLock::new(ledger)),
            peers: Arc::new(RwLock::new(peers)),
            store,
            client,
            config: Arc::new(config),
            mining: Arc::new(Mutex::new(())),
        })
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn client(&self) -> &PeerClient {
        &self.client
    }

    pub async fn chain(&self) -> Vec<Block> {
        self.ledger.read().await.chain().to_vec()
    }

    pub async fn height(&self) -> u64 {
        self.ledger.read().await.height()
    }

    pub async fn last_block(&self) -> Block {
        self.ledger.read().await.last_block().clone()
    }

    pub async fn pending(&self) -> Vec<Transaction> {
        self.ledger.read().await.pending().to_vec()
    }

    pub async fn validator(&self) -> BlockValidator {
        *self.ledger.read().await.validator()
    }

    pub async fn peers(&self) -> Vec<String> {
        self.peers.read().await.peers()
    }

    pub async fn add_peer(&self, address: &str) -> Result<bool, AddressError> {
        self.peers.write().await.add_peer(address)
    }

    /// Add several peers, all or nothing.
    pub async fn add_peers(&self, addresses: &[String]) -> Result<usize, AddressError> {
        for address in addresses {
            ledger_core::peers::normalize_address(address)?;
        }
        let mut peers = self.peers.write().await;
        let mut added = 0;
        for address in addresses {
            if peers.add_peer(address)? {
                added += 1;
            }
        }
        Ok(added)
    }

    pub async fn remove_peer(&self, address: &str) -> Result<bool, AddressError> {
        self.peers.write().await.remove_peer(address)
    }

    pub(crate) async fn ledger_mut(&self) -> RwLockWriteGuard<'_, LedgerState> {
        self.ledger.write().await
    }

    pub(crate) fn mining_lock(&self) -> &Mutex<()> {
        &self.mining
    }

    /// Write the chain snapshot on the blocking pool. Call with the write
    /// guard still held so the snapshot never runs behind the in-memory chain.
    /// A failed write is logged; the next successful one catches up.
    pub(crate) async fn persist(&self, ledger: &LedgerState) {
        let store = Arc::clone(&self.store);
        let chain = ledger.chain().to_vec();
        let height = ledger.height();
        match tokio::task::spawn_blocking(move || store.save_chain(&chain)).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => error!(%err, height, "failed to persist chain"),
            Err(err) => error!(%err, height, "persist worker failed"),
        }
    }
}
