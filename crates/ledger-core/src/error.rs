use thiserror::Error;

/// A block or chain broke one of the ledger invariants. The offending unit is
/// rejected as a whole.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("chain is empty")]
    EmptyChain,
    #[error("block 1 does not match the genesis block")]
    GenesisMismatch,
    #[error("block {index}: previous_hash does not match the header hash of its predecessor")]
    BrokenLink { index: u64 },
    #[error("block {index}: proof of work is invalid")]
    InvalidProof { index: u64 },
    #[error("block {index}: merkle_root does not match its transactions")]
    MerkleMismatch { index: u64 },
    #[error("block {index}: expected index {expected}")]
    IndexOutOfSequence { index: u64, expected: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    #[error("peer address is empty")]
    Empty,
    #[error("peer address `{0}` has no host")]
    MissingHost(String),
    #[error("peer address `{0}` has no port")]
    MissingPort(String),
    #[error("peer address `{0}` has an invalid port")]
    InvalidPort(String),
    #[error("peer address `{0}` uses an unsupported scheme")]
    UnsupportedScheme(String),
}

/// The stored chain snapshot could not be read or written. At startup this is
/// fatal: the node must not run on unknown ledger state.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("snapshot i/o failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("snapshot is corrupt: {0}")]
    Corrupt(String),
    #[error("snapshot failed validation: {0}")]
    Invalid(#[from] ValidationError),
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// A peer could not be reached or answered garbage. Never fatal; the peer is
/// skipped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NetworkError {
    #[error("peer {peer} unreachable: {reason}")]
    Unreachable { peer: String, reason: String },
    #[error("peer {peer} answered with status {status}")]
    Status { peer: String, status: u16 },
    #[error("peer {peer} sent an undecodable response: {reason}")]
    Decode { peer: String, reason: String },
}

impl NetworkError {
    pub fn peer(&self) -> &str {
        match self {
            NetworkError::Unreachable { peer, .. }
            | NetworkError::Status { peer, .. }
            | NetworkError::Decode { peer, .. } => peer,
        }
    }
}
