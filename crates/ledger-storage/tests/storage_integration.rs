mod helpers;

use helpers::*;
use ledger_core::{genesis_block, ledger::bootstrap, ChainStore, PersistenceError, ValidationError};
use ledger_storage::{open_store, JsonFileStore, SledStore, StoreKind};
use std::fs;

#[test]
fn test_json_store_round_trips_chain() -> anyhow::Result<()> {
    let (temp_dir, store) = create_json_store();
    let ledger = mined_ledger(5, 3);
    store.save_chain(ledger.chain())?;
    let loaded = store.load_chain()?.expect("snapshot should exist");
    assert_eq!(loaded, ledger.chain());
    assert_eq!(validator().validate_chain(&loaded), Ok(()));
    remove_temp_dir(temp_dir);
    Ok(())
}

#[test]
fn test_sled_store_round_trips_chain() -> anyhow::Result<()> {
    let (temp_dir, store) = create_temp_store();
    let ledger = mined_ledger(5, 3);
    store.save_chain(ledger.chain())?;
    let loaded = store.load_chain()?.expect("snapshot should exist");
    assert_eq!(loaded, ledger.chain());
    teardown_store(temp_dir, store);
    Ok(())
}

#[test]
fn test_empty_stores_report_no_snapshot() -> anyhow::Result<()> {
    let (json_dir, json) = create_json_store();
    assert!(json.load_chain()?.is_none());
    let (sled_dir, sled) = create_temp_store();
    assert!(sled.load_chain()?.is_none());
    remove_temp_dir(json_dir);
    teardown_store(sled_dir, sled);
    Ok(())
}

#[test]
fn test_json_store_persists_across_reopen() -> anyhow::Result<()> {
    let (temp_dir, db_path) = create_temp_dir();
    let path = db_path.join("nested").join("blockchain_5001.json");
    let ledger = mined_ledger(2, 1);
    {
        let store = JsonFileStore::new(&path);
        store.save_chain(ledger.chain())?;
    }
    {
        let store = JsonFileStore::new(&path);
        assert_eq!(store.load_chain()?.as_deref(), Some(ledger.chain()));
    }
    remove_temp_dir(temp_dir);
    Ok(())
}

#[test]
fn test_sled_store_persists_across_reopen() -> anyhow::Result<()> {
    let (temp_dir, db_path) = create_temp_dir();
    let ledger = mined_ledger(3, 2);
    {
        let store = SledStore::open(db_path.join("sled"))?;
        store.save_chain(ledger.chain())?;
    }
    {
        let store = SledStore::open(db_path.join("sled"))?;
        assert_eq!(store.load_chain()?.as_deref(), Some(ledger.chain()));
    }
    remove_temp_dir(temp_dir);
    Ok(())
}

#[test]
fn test_sled_store_overwrites_with_replacement_chain() -> anyhow::Result<()> {
    let (temp_dir, store) = create_temp_store();
    store.save_chain(mined_ledger(6, 1).chain())?;
    let shorter = mined_ledger(2, 4);
    store.save_chain(shorter.chain())?;
    let loaded = store.load_chain()?.expect("snapshot should exist");
    assert_eq!(loaded.len(), 3);
    assert_eq!(loaded, shorter.chain());
    teardown_store(temp_dir, store);
    Ok(())
}

#[test]
fn test_sled_store_shrink_leaves_one_consistent_tree() -> anyhow::Result<()> {
    let (temp_dir, db_path) = create_temp_dir();
    let shorter = mined_ledger(2, 1);
    {
        let store = SledStore::open(db_path.join("sled"))?;
        store.save_chain(mined_ledger(5, 1).chain())?;
        store.save_chain(shorter.chain())?;
    }
    {
        let raw = sled::open(db_path.join("sled"))?;
        let blocks = raw.open_tree("blocks")?;
        let length = blocks.get(b"chain_length")?.expect("length stored with the blocks");
        assert_eq!(&length[..], &3u64.to_be_bytes()[..]);
        assert!(raw.get(b"chain_length")?.is_none());
        for position in 3u64..6 {
            assert!(blocks.get(position.to_be_bytes())?.is_none());
        }
    }
    let store = SledStore::open(db_path.join("sled"))?;
    assert_eq!(store.load_chain()?.as_deref(), Some(shorter.chain()));
    teardown_store(temp_dir, store);
    Ok(())
}

#[test]
fn test_json_store_rejects_garbage() -> anyhow::Result<()> {
    let (temp_dir, store) = create_json_store();
    fs::write(store.path(), b"{ not json")?;
    assert!(matches!(store.load_chain(), Err(PersistenceError::Corrupt(_))));
    remove_temp_dir(temp_dir);
    Ok(())
}

#[test]
fn test_sled_store_rejects_corrupt_block() -> anyhow::Result<()> {
    let (temp_dir, db_path) = create_temp_dir();
    {
        let store = SledStore::open(db_path.join("sled"))?;
        store.save_chain(mined_ledger(2, 1).chain())?;
    }
    {
        let raw = sled::open(db_path.join("sled"))?;
        let blocks = raw.open_tree("blocks")?;
        blocks.insert(1u64.to_be_bytes(), vec![0xFFu8; 3])?;
        raw.flush()?;
    }
    let store = SledStore::open(db_path.join("sled"))?;
    assert!(matches!(store.load_chain(), Err(PersistenceError::Corrupt(_))));
    drop(store);
    remove_temp_dir(temp_dir);
    Ok(())
}

#[test]
fn test_bootstrap_creates_genesis_snapshot() -> anyhow::Result<()> {
    let (temp_dir, store) = create_json_store();
    let ledger = bootstrap(&store, validator())?;
    assert_eq!(ledger.height(), 1);
    assert_eq!(store.load_chain()?, Some(vec![genesis_block()]));
    remove_temp_dir(temp_dir);
    Ok(())
}

#[test]
fn test_bootstrap_refuses_tampered_snapshot() -> anyhow::Result<()> {
    let (temp_dir, store) = create_json_store();
    let mut chain = mined_ledger(3, 2).chain().to_vec();
    chain[2].transactions[1].recipient = "mallory".into();
    store.save_chain(&chain)?;
    let err = bootstrap(&store, validator()).expect_err("tampered snapshot must not load");
    assert!(matches!(
        err,
        PersistenceError::Invalid(ValidationError::MerkleMismatch { index: 3 })
    ));
    remove_temp_dir(temp_dir);
    Ok(())
}

#[test]
fn test_open_store_picks_backend() -> anyhow::Result<()> {
    let (temp_dir, db_path) = create_temp_dir();
    let ledger = mined_ledger(1, 1);
    for kind in [StoreKind::Json, StoreKind::Sled] {
        let store = open_store(kind, &db_path, "6000")?;
        store.save_chain(ledger.chain())?;
        assert_eq!(store.load_chain()?.as_deref(), Some(ledger.chain()));
    }
    assert!(db_path.join("blockchain_6000.json").exists());
    assert!(db_path.join("sled_6000").exists());
    remove_temp_dir(temp_dir);
    Ok(())
}

#[tokio::test]
async fn test_storage_concurrent_readers() -> anyhow::Result<()> {
    use std::sync::Arc;
    use tokio::task;

    let (temp_dir, store) = create_temp_store();
    let store = Arc::new(store);
    let chain = mined_ledger(4, 2).chain().to_vec();
    store.save_chain(&chain)?;

    let mut handles = Vec::new();
    for _ in 0..16 {
        let store = Arc::clone(&store);
        handles.push(task::spawn_blocking(move || store.load_chain()));
    }
    for handle in handles {
        let loaded = handle.await??.expect("snapshot should exist");
        assert_eq!(loaded, chain);
    }

    let store = Arc::try_unwrap(store).map_err(|_| anyhow::anyhow!("store still shared"))?;
    teardown_store(temp_dir, store);
    Ok(())
}
