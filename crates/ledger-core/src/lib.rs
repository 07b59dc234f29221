pub mod canonical;
pub mod constants;
pub mod error;
pub mod ledger;
pub mod peers;
pub mod pow;
pub mod store;
pub mod timestamp;
pub mod validation;

use constants::{GENESIS_INDEX, GENESIS_PREVIOUS_HASH, GENESIS_PROOF, GENESIS_TIMESTAMP};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

pub use error::{AddressError, NetworkError, PersistenceError, ValidationError};
pub use ledger::{LedgerState, Submission};
pub use peers::PeerRegistry;
pub use pow::ProofOfWork;
pub use store::ChainStore;
pub use timestamp::Timestamp;
pub use validation::{BlockValidator, BlockVerdict};

/// Lowercase hex SHA-256 digest.
pub type Hash = String;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub sender: String,
    pub recipient: String,
    pub amount: u64,
    pub time: Timestamp,
}

/// Wire form of a transaction. `propagated` only lives while the transaction is
/// being flooded; it is never stored or hashed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransactionEnvelope {
    #[serde(flatten)]
    pub transaction: Transaction,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub propagated: bool,
}

impl TransactionEnvelope {
    pub fn fresh(transaction: Transaction) -> Self {
        Self {
            transaction,
            propagated: false,
        }
    }

    pub fn propagated(transaction: Transaction) -> Self {
        Self {
            transaction,
            propagated: true,
        }
    }
}

impl From<Transaction> for TransactionEnvelope {
    fn from(transaction: Transaction) -> Self {
        Self::fresh(transaction)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub index: u64,
    pub timestamp: Timestamp,
    pub transactions: Vec<Transaction>,
    pub proof: u64,
    pub previous_hash: Hash,
    /// Older snapshots predate this field; they load with an empty root.
    #[serde(default)]
    pub merkle_root: Hash,
}

/// The hashed part of a block. Transactions are covered only through
/// `merkle_root`.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct BlockHeader<'a> {
    pub index: u64,
    pub timestamp: Timestamp,
    pub proof: u64,
    pub previous_hash: &'a str,
    pub merkle_root: &'a str,
}

impl Block {
    pub fn header(&self) -> BlockHeader<'_> {
        BlockHeader {
            index: self.index,
            timestamp: self.timestamp,
            proof: self.proof,
            previous_hash: &self.previous_hash,
            merkle_root: &self.merkle_root,
        }
    }

    pub fn hash(&self) -> Hash {
        header_hash(self)
    }

    /// True when `merkle_root` matches the block's own transaction list.
    pub fn has_valid_merkle_root(&self) -> bool {
        self.merkle_root == merkle_root(&self.transactions)
    }
}

pub fn sha256_hex(bytes: &[u8]) -> Hash {
    hex::encode(Sha256::digest(bytes))
}

fn canonical_digest<T: Serialize + ?Sized>(value: &T) -> Hash {
    // Ledger records hold only strings, integers and floats; serde_json encodes all of them.
    let bytes = canonical::to_canonical_bytes(value).expect("ledger records encode as JSON");
    sha256_hex(&bytes)
}

/// SHA-256 of the canonical header `{index, merkle_root, previous_hash, proof, timestamp}`.
pub fn header_hash(block: &Block) -> Hash {
    canonical_digest(&block.header())
}

/// Flat digest of the canonical transaction list. Named after the field it
/// fills; it is not a hash tree.
pub fn merkle_root(txs: &[Transaction]) -> Hash {
    canonical_digest(txs)
}

/// The fixed first block every node starts from.
pub fn genesis_block() -> Block {
    Block {
        index: GENESIS_INDEX,
        timestamp: Timestamp::Whole(GENESIS_TIMESTAMP),
        transactions: vec![],
        proof: GENESIS_PROOF,
        previous_hash: GENESIS_PREVIOUS_HASH.to_string(),
        merkle_root: merkle_root(&[]),
    }
}
