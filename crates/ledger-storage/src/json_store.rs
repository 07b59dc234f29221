use ledger_core::{Block, ChainStore, PersistenceError};
use std::{
    fs, io,
    path::{Path, PathBuf},
};
use tracing::debug;

/// The whole chain as one pretty-printed JSON array.
///
/// Writes go to a sibling temp file first and are renamed into place, so a
/// crash mid-write leaves the previous snapshot intact.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl ChainStore for JsonFileStore {
    fn load_chain(&self) -> Result<Option<Vec<Block>>, PersistenceError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let chain: Vec<Block> = serde_json::from_slice(&bytes)
            .map_err(|e| PersistenceError::Corrupt(format!("{}: {e}", self.path.display())))?;
        debug!(path = %self.path.display(), blocks = chain.len(), "snapshot read");
        Ok(Some(chain))
    }

    fn save_chain(&self, chain: &[Block]) -> Result<(), PersistenceError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let bytes = serde_json::to_vec_pretty(chain).map_err(crate::backend_error)?;
        let tmp = self.temp_path();
        fs::write(&tmp, bytes)?;
        fs::rename(&tmp, &self.path)?;
        debug!(path = %self.path.display(), blocks = chain.len(), "snapshot written");
        Ok(())
    }
}
