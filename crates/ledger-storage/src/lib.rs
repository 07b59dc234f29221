pub mod json_store;
pub mod sled_store;

use ledger_core::{ChainStore, PersistenceError};
use std::{fmt::Display, path::Path};

pub use json_store::JsonFileStore;
pub use sled_store::SledStore;

/// Which backend a node keeps its chain snapshot in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreKind {
    #[default]
    Json,
    Sled,
}

/// Open the snapshot store for the node identified by `name` (usually its
/// listen port) under `data_dir`.
pub fn open_store<P: AsRef<Path>>(
    kind: StoreKind,
    data_dir: P,
    name: &str,
) -> Result<Box<dyn ChainStore>, PersistenceError> {
    let data_dir = data_dir.as_ref();
    Ok(match kind {
        StoreKind::Json => Box::new(JsonFileStore::new(
            data_dir.join(format!("blockchain_{name}.json")),
        )),
        StoreKind::Sled => Box::new(SledStore::open(data_dir.join(format!("sled_{name}")))?),
    })
}

pub(crate) fn backend_error(err: impl Display) -> PersistenceError {
    PersistenceError::Backend(err.to_string())
}
