#![allow(dead_code)]

use std::fs;

use ledger_core::{BlockValidator, LedgerState, ProofOfWork, Timestamp, Transaction};
use ledger_storage::{JsonFileStore, SledStore};
use tempfile::{tempdir, TempDir};

pub fn create_temp_dir() -> (TempDir, std::path::PathBuf) {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let db_path = temp_dir.path().to_path_buf();
    (temp_dir, db_path)
}

pub fn remove_temp_dir(temp_dir: TempDir) {
    let db_path = temp_dir.path().to_path_buf();
    temp_dir.close().expect("Failed to delete temp dir");
    let _ = fs::remove_dir_all(&db_path);
    assert!(!db_path.exists(), "Database directory should be removed");
}

pub fn create_temp_store() -> (TempDir, SledStore) {
    let (temp_dir, db_path) = create_temp_dir();
    let store = SledStore::open(db_path.join("sled")).expect("Failed to open SledStore");
    (temp_dir, store)
}

pub fn create_json_store() -> (TempDir, JsonFileStore) {
    let (temp_dir, db_path) = create_temp_dir();
    let store = JsonFileStore::new(db_path.join("blockchain_5000.json"));
    (temp_dir, store)
}

pub fn validator() -> BlockValidator {
    BlockValidator::new(ProofOfWork::with_zeros(2))
}

/// A valid ledger with `blocks` blocks after genesis, each carrying `txs_per_block`
/// transactions.
pub fn mined_ledger(blocks: usize, txs_per_block: usize) -> LedgerState {
    let mut ledger = LedgerState::new(validator());
    for b in 0..blocks {
        for t in 0..txs_per_block {
            ledger.submit_transaction(Transaction {
                sender: format!("addr_from_{b}_{t}"),
                recipient: format!("addr_to_{t}"),
                amount: (b * 100 + t) as u64,
                time: Timestamp::Fractional(1_600_000_000.0 + (b * txs_per_block + t) as f64),
            });
        }
        let proof = ledger.validator().pow().search(ledger.last_block().proof);
        ledger.seal_block(proof, None);
    }
    ledger
}

pub fn teardown_store(temp_dir: TempDir, store: SledStore) {
    store.clear().expect("Failed to clear the store");
    drop(store);
    remove_temp_dir(temp_dir);
}
