use crate::constants::{DEFAULT_DIFFICULTY_ZEROS, HASH_HEX_SIZE, POW_SEARCH_CHUNK};
use rayon::prelude::*;
use sha2::{Digest, Sha256};
use tracing::debug;

/// Proof-of-work predicate and nonce search.
///
/// A proof `p` is valid after `last` when the hex SHA-256 of the decimal
/// concatenation `"{last}{p}"` starts with `zeros` `0` digits. The difficulty is
/// fixed per node; it is not negotiated with peers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProofOfWork {
    zeros: usize,
}

impl Default for ProofOfWork {
    fn default() -> Self {
        Self::with_zeros(DEFAULT_DIFFICULTY_ZEROS)
    }
}

impl ProofOfWork {
    pub fn with_zeros(zeros: usize) -> Self {
        Self {
            zeros: zeros.min(HASH_HEX_SIZE),
        }
    }

    pub fn zeros(&self) -> usize {
        self.zeros
    }

    pub fn valid_proof(&self, last_proof: u64, proof: u64) -> bool {
        let digest = Sha256::digest(format!("{last_proof}{proof}").as_bytes());
        count_leading_zero_nibbles(&digest) >= self.zeros as u32
    }

    /// Scan 0, 1, 2, ... and return the first valid proof. Blocks the calling
    /// thread until one is found.
    pub fn search(&self, last_proof: u64) -> u64 {
        let mut proof = 0u64;
        while !self.valid_proof(last_proof, proof) {
            proof += 1;
        }
        proof
    }

    /// Same answer as [`ProofOfWork::search`], with each chunk of candidates
    /// checked across the rayon pool.
    pub fn search_parallel(&self, last_proof: u64) -> u64 {
        let mut start = 0u64;
        loop {
            let end = start.saturating_add(POW_SEARCH_CHUNK);
            let found = (start..end)
                .into_par_iter()
                .find_first(|proof| self.valid_proof(last_proof, *proof));
            if let Some(proof) = found {
                debug!(last_proof, proof, "proof found");
                return proof;
            }
            start = end;
        }
    }
}

/// Number of leading zero hex digits in a digest.
pub fn count_leading_zero_nibbles(hash: &[u8]) -> u32 {
    let mut total = 0u32;
    for b in hash {
        if *b == 0 {
            total += 2;
        } else {
            if *b < 0x10 {
                total += 1;
            }
            break;
        }
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    #[test]
    fn leading_zero_nibbles_examples() {
        let mut h = [0u8; 32];
        assert_eq!(count_leading_zero_nibbles(&h), 64);
        h[0] = 0x0F;
        assert_eq!(count_leading_zero_nibbles(&h), 1);
        h[0] = 0xF0;
        assert_eq!(count_leading_zero_nibbles(&h), 0);
        h = [0u8; 32];
        h[1] = 0x08;
        assert_eq!(count_leading_zero_nibbles(&h), 3);
        h[1] = 0x80;
        assert_eq!(count_leading_zero_nibbles(&h), 2);
    }

    #[test]
    fn valid_proof_known_values() {
        let pow = ProofOfWork::default();
        // sha256("10035293") = 0000c415...
        assert!(pow.valid_proof(100, 35293));
        assert!(!pow.valid_proof(100, 35292));
        assert!(pow.valid_proof(35293, 35089));
    }

    #[test]
    fn valid_proof_is_deterministic() {
        let pow = ProofOfWork::default();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..1000 {
            let (a, b): (u64, u64) = (rng.gen(), rng.gen());
            assert_eq!(pow.valid_proof(a, b), pow.valid_proof(a, b));
        }
    }

    #[test]
    fn search_finds_first_valid_proof() {
        let pow = ProofOfWork::default();
        assert_eq!(pow.search(100), 35293);
        assert_eq!(pow.search(35293), 35089);
    }

    #[test]
    fn parallel_search_matches_sequential() {
        let pow = ProofOfWork::default();
        assert_eq!(pow.search_parallel(100), 35293);
        assert_eq!(pow.search_parallel(35293), pow.search(35293));
    }

    #[test]
    fn acceptance_rate_is_about_one_in_65536() {
        // Two hex zeros keep the sample cheap; the rate scales as 16^-zeros.
        let pow = ProofOfWork::with_zeros(2);
        let mut rng = StdRng::seed_from_u64(42);
        let last: u64 = rng.gen();
        let hits = (0..256_000u64).filter(|p| pow.valid_proof(last, *p)).count();
        // Expected 1000; allow a generous band.
        assert!((800..1200).contains(&hits), "hits = {hits}");

        let full = ProofOfWork::default();
        let hits = (0..655_360u64).filter(|p| full.valid_proof(last, *p)).count();
        assert!((1..=30).contains(&hits), "hits = {hits}");
    }

    #[test]
    fn zero_difficulty_accepts_everything() {
        let pow = ProofOfWork::with_zeros(0);
        assert!(pow.valid_proof(1, 2));
        assert_eq!(pow.search(12345), 0);
    }

    #[test]
    fn difficulty_is_capped_at_digest_length() {
        assert_eq!(ProofOfWork::with_zeros(1000).zeros(), 64);
    }
}
