use crate::{error::PersistenceError, Block};

/// Trait the storage backends implement so the ledger can persist its chain.
/// This lives in `ledger-core` to avoid a circular dependency.
pub trait ChainStore: Send + Sync {
    /// `Ok(None)` when nothing has been stored yet.
    fn load_chain(&self) -> Result<Option<Vec<Block>>, PersistenceError>;
    /// Replace the stored snapshot with `chain`.
    fn save_chain(&self, chain: &[Block]) -> Result<(), PersistenceError>;
}
