use crate::backend_error;
use ledger_core::{Block, ChainStore, PersistenceError};
use sled::{Batch, Db};
use std::path::Path;
use tracing::info;

const TREE_BLOCKS: &str = "blocks";
const KEY_LENGTH: &[u8] = b"chain_length";

/// One bincode-encoded block per key (big-endian position), plus the chain
/// length, all in one tree. Every save is a single batch on that tree, so a
/// reader sees either the old snapshot or the new one, never a mix.
#[derive(Clone)]
pub struct SledStore {
    db: Db,
}

impl SledStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, PersistenceError> {
        let db = sled::open(path).map_err(backend_error)?;
        info!("sled store opened");
        Ok(Self { db })
    }

    fn blocks(&self) -> Result<sled::Tree, PersistenceError> {
        self.db.open_tree(TREE_BLOCKS).map_err(backend_error)
    }

    fn stored_length_in(tree: &sled::Tree) -> Result<Option<u64>, PersistenceError> {
        let Some(raw) = tree.get(KEY_LENGTH).map_err(backend_error)? else {
            return Ok(None);
        };
        let arr = <[u8; 8]>::try_from(&raw[..])
            .map_err(|_| PersistenceError::Corrupt("chain length key has the wrong size".into()))?;
        Ok(Some(u64::from_be_bytes(arr)))
    }

    /// Drop everything, used by tests and by operators resetting a node.
    pub fn clear(&self) -> Result<(), PersistenceError> {
        self.blocks()?.clear().map_err(backend_error)?;
        self.db.flush().map_err(backend_error)?;
        Ok(())
    }
}

impl ChainStore for SledStore {
    fn load_chain(&self) -> Result<Option<Vec<Block>>, PersistenceError> {
        let tree = self.blocks()?;
        let Some(length) = Self::stored_length_in(&tree)? else {
            return Ok(None);
        };
        let mut chain = Vec::with_capacity(length as usize);
        for position in 0..length {
            let raw = tree
                .get(position.to_be_bytes())
                .map_err(backend_error)?
                .ok_or_else(|| PersistenceError::Corrupt(format!("block at position {position} is missing")))?;
            let block: Block = bincode::deserialize(&raw).map_err(|e| {
                PersistenceError::Corrupt(format!("block at position {position}: {e}"))
            })?;
            chain.push(block);
        }
        Ok(Some(chain))
    }

    fn save_chain(&self, chain: &[Block]) -> Result<(), PersistenceError> {
        let tree = self.blocks()?;
        let previous = Self::stored_length_in(&tree)?.unwrap_or(0);

        let mut batch = Batch::default();
        for (position, block) in chain.iter().enumerate() {
            let bytes = bincode::serialize(block).map_err(backend_error)?;
            batch.insert(&(position as u64).to_be_bytes()[..], bytes);
        }
        for position in chain.len() as u64..previous {
            batch.remove(&position.to_be_bytes()[..]);
        }
        batch.insert(KEY_LENGTH, &(chain.len() as u64).to_be_bytes()[..]);
        tree.apply_batch(batch).map_err(backend_error)?;
        self.db.flush().map_err(backend_error)?;
        Ok(())
    }
}
