use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use watch_core::{diff_new, Item, ItemSet};
use watch_logging::watch_info;

use crate::{AtomicFileWriter, PersistError};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read {0:?}: {1}")]
    Io(PathBuf, io::Error),
    #[error("failed to parse {0:?}: {1}")]
    Parse(PathBuf, serde_json::Error),
    #[error("failed to serialize known items: {0}")]
    Serialize(serde_json::Error),
    #[error(transparent)]
    Persist(#[from] PersistError),
}

/// The known set on disk: a pretty-printed JSON array of item records.
#[derive(Debug, Clone)]
pub struct SeenItemStore {
    writer: AtomicFileWriter,
}

impl SeenItemStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            writer: AtomicFileWriter::new(path),
        }
    }

    pub fn path(&self) -> &Path {
        self.writer.path()
    }

    /// A missing file is an empty set. A file that exists but cannot be read
    /// or parsed is an error, so a corrupt store is never silently reset.
    pub fn load(&self) -> Result<ItemSet, StoreError> {
        let path = self.path();
        let content = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(ItemSet::new()),
            Err(err) => return Err(StoreError::Io(path.to_path_buf(), err)),
        };
        if content.trim().is_empty() {
            return Ok(ItemSet::new());
        }

        let items: ItemSet = serde_json::from_str(&content)
            .map_err(|err| StoreError::Parse(path.to_path_buf(), err))?;
        watch_info!("Loaded {} known comments from {:?}", items.len(), path);
        Ok(items)
    }

    pub fn save(&self, items: &ItemSet) -> Result<(), StoreError> {
        let content = serde_json::to_string_pretty(items).map_err(StoreError::Serialize)?;
        self.writer.write(&content)?;
        Ok(())
    }

    pub fn diff_new(latest: &[Item], known: &ItemSet) -> Vec<Item> {
        diff_new(latest, known)
    }
}
