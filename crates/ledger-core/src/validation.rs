use crate::{error::ValidationError, genesis_block, header_hash, pow::ProofOfWork, Block};
use tracing::{debug, warn};

/// Outcome of checking a block pushed directly by a peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockVerdict {
    /// Extends the local tip; append it.
    Accept,
    /// We already hold a block at that height or later.
    Stale,
    /// The sender is more than one block ahead; fetch full chains instead.
    NeedsFullResync,
    Invalid(ValidationError),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BlockValidator {
    pow: ProofOfWork,
}

impl BlockValidator {
    pub fn new(pow: ProofOfWork) -> Self {
        Self { pow }
    }

    pub fn pow(&self) -> &ProofOfWork {
        &self.pow
    }

    /// Check every chain invariant front to back and stop at the first
    /// violation.
    pub fn validate_chain(&self, chain: &[Block]) -> Result<(), ValidationError> {
        match self.scan(chain) {
            Ok(()) => {
                debug!(length = chain.len(), "chain validated");
                Ok(())
            }
            Err(err) => {
                warn!(length = chain.len(), %err, "chain validation failed");
                Err(err)
            }
        }
    }

    fn scan(&self, chain: &[Block]) -> Result<(), ValidationError> {
        let (first, rest) = chain.split_first().ok_or(ValidationError::EmptyChain)?;
        if *first != genesis_block() {
            return Err(ValidationError::GenesisMismatch);
        }

        let mut previous = first;
        for block in rest {
            if block.previous_hash != header_hash(previous) {
                return Err(ValidationError::BrokenLink { index: block.index });
            }
            if !self.pow.valid_proof(previous.proof, block.proof) {
                return Err(ValidationError::InvalidProof { index: block.index });
            }
            if !block.has_valid_merkle_root() {
                return Err(ValidationError::MerkleMismatch { index: block.index });
            }
            let expected = previous.index + 1;
            if block.index != expected {
                return Err(ValidationError::IndexOutOfSequence {
                    index: block.index,
                    expected,
                });
            }
            previous = block;
        }
        Ok(())
    }

    /// Lighter check for a single block pushed by a peer on top of our tip.
    pub fn validate_incoming_block(&self, last: &Block, candidate: &Block) -> BlockVerdict {
        if candidate.previous_hash != header_hash(last) {
            if candidate.index > last.index + 1 {
                return BlockVerdict::NeedsFullResync;
            }
            return BlockVerdict::Invalid(ValidationError::BrokenLink {
                index: candidate.index,
            });
        }
        if !self.pow.valid_proof(last.proof, candidate.proof) {
            return BlockVerdict::Invalid(ValidationError::InvalidProof {
                index: candidate.index,
            });
        }
        if candidate.index <= last.index {
            return BlockVerdict::Stale;
        }
        if !candidate.has_valid_merkle_root() {
            return BlockVerdict::Invalid(ValidationError::MerkleMismatch {
                index: candidate.index,
            });
        }
        if candidate.index != last.index + 1 {
            return BlockVerdict::Invalid(ValidationError::IndexOutOfSequence {
                index: candidate.index,
                expected: last.index + 1,
            });
        }
        BlockVerdict::Accept
    }
}
