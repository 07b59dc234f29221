use crate::{
    error::{PersistenceError, ValidationError},
    genesis_block, header_hash, merkle_root,
    store::ChainStore,
    validation::{BlockValidator, BlockVerdict},
    Block, Hash, Timestamp, Transaction,
};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    /// Queued; it will land in the block with this index.
    Accepted { block_index: u64 },
    Duplicate,
}

/// The canonical chain plus the pool of transactions waiting for a block.
/// Everything that mutates either goes through here.
#[derive(Debug, Clone)]
pub struct LedgerState {
    chain: Vec<Block>,
    pending: Vec<Transaction>,
    validator: BlockValidator,
}

impl LedgerState {
    /// A ledger holding only the genesis block.
    pub fn new(validator: BlockValidator) -> Self {
        Self {
            chain: vec![genesis_block()],
            pending: Vec::new(),
            validator,
        }
    }

    /// Adopt an existing chain after checking every invariant.
    pub fn from_chain(chain: Vec<Block>, validator: BlockValidator) -> Result<Self, ValidationError> {
        validator.validate_chain(&chain)?;
        Ok(Self {
            chain,
            pending: Vec::new(),
            validator,
        })
    }

    pub fn chain(&self) -> &[Block] {
        &self.chain
    }

    /// Number of blocks, genesis included.
    pub fn height(&self) -> u64 {
        self.chain.len() as u64
    }

    pub fn last_block(&self) -> &Block {
        // Construction guarantees at least the genesis block.
        &self.chain[self.chain.len() - 1]
    }

    pub fn last_hash(&self) -> Hash {
        header_hash(self.last_block())
    }

    pub fn pending(&self) -> &[Transaction] {
        &self.pending
    }

    pub fn validator(&self) -> &BlockValidator {
        &self.validator
    }

    pub fn submit_transaction(&mut self, tx: Transaction) -> Submission {
        if self.pending.contains(&tx) {
            debug!(sender = %tx.sender, "duplicate transaction ignored");
            return Submission::Duplicate;
        }
        self.pending.push(tx);
        Submission::Accepted {
            block_index: self.height() + 1,
        }
    }

    /// Seal the pending pool into a new block on top of the chain and clear
    /// the pool.
    pub fn seal_block(&mut self, proof: u64, previous_hash: Option<Hash>) -> Block {
        let transactions = std::mem::take(&mut self.pending);
        let block = Block {
            index: self.height() + 1,
            timestamp: Timestamp::now(),
            merkle_root: merkle_root(&transactions),
            transactions,
            proof,
            previous_hash: previous_hash.unwrap_or_else(|| self.last_hash()),
        };
        info!(
            index = block.index,
            timestamp = %block.timestamp,
            txs = block.transactions.len(),
            "sealed block"
        );
        self.chain.push(block.clone());
        block
    }

    /// Apply a block pushed by a peer. Only `Accept` mutates the ledger: the
    /// block is appended and its transactions leave the pool.
    pub fn receive_block(&mut self, block: Block) -> BlockVerdict {
        let verdict = self
            .validator
            .validate_incoming_block(self.last_block(), &block);
        match &verdict {
            BlockVerdict::Accept => {
                self.prune_pending(&block.transactions);
                info!(index = block.index, txs = block.transactions.len(), "accepted block from peer");
                self.chain.push(block);
            }
            BlockVerdict::Stale => debug!(index = block.index, "stale block ignored"),
            BlockVerdict::NeedsFullResync => {
                info!(index = block.index, local = self.height(), "peer is ahead; resync needed")
            }
            BlockVerdict::Invalid(err) => warn!(index = block.index, %err, "rejected block from peer"),
        }
        verdict
    }

    /// Swap in a whole chain. Length comparison is the caller's job; this
    /// only guarantees the new chain is valid. Pending transactions that the
    /// new chain already contains are dropped.
    pub fn replace_chain(&mut self, chain: Vec<Block>) -> Result<(), ValidationError> {
        self.validator.validate_chain(&chain)?;
        for block in &chain {
            self.prune_pending(&block.transactions);
        }
        info!(old = self.chain.len(), new = chain.len(), "chain replaced");
        self.chain = chain;
        Ok(())
    }

    fn prune_pending(&mut self, included: &[Transaction]) {
        if included.is_empty() {
            return;
        }
        self.pending.retain(|tx| !included.contains(tx));
    }
}

/// Load the stored chain or start from genesis.
///
/// A snapshot that cannot be decoded or fails validation is an error; callers
/// treat it as fatal. A missing snapshot is created from genesis right away.
pub fn bootstrap<S>(store: &S, validator: BlockValidator) -> Result<LedgerState, PersistenceError>
where
    S: ChainStore + ?Sized,
{
    match store.load_chain()? {
        Some(chain) => {
            let ledger = LedgerState::from_chain(chain, validator)?;
            info!(height = ledger.height(), "loaded chain snapshot");
            Ok(ledger)
        }
        None => {
            let ledger = LedgerState::new(validator);
            store.save_chain(ledger.chain())?;
            info!("no snapshot found; initialised from genesis");
            Ok(ledger)
        }
    }
}
