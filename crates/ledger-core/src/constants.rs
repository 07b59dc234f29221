/// Hex digits in a SHA-256 digest.
pub const HASH_HEX_SIZE: usize = 64;

pub const GENESIS_INDEX: u64 = 1;
/// Written as a JSON integer; the genesis hash depends on that form.
pub const GENESIS_TIMESTAMP: u64 = 1_500_000_000;
pub const GENESIS_PROOF: u64 = 100;
pub const GENESIS_PREVIOUS_HASH: &str = "1";

/// Number of leading `0` hex digits a proof digest must carry (16 bits).
pub const DEFAULT_DIFFICULTY_ZEROS: usize = 4;
/// Candidates handed to rayon per round of the parallel search.
pub const POW_SEARCH_CHUNK: u64 = 1 << 16;

/// Sender used for the miner's reward transaction.
pub const REWARD_SENDER: &str = "0";
pub const REWARD_AMOUNT: u64 = 1;
