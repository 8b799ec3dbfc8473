use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::io::recovery::atomic_write;

/// Error type for the persistence transport
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("could not read {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("could not write {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Load/save boundary for the serialized snapshot
pub trait Store {
    /// The saved blob, or `None` if nothing has been saved yet
    fn load(&self) -> Result<Option<String>, StoreError>;

    /// Replace the saved blob
    fn save(&mut self, blob: &str) -> Result<(), StoreError>;

    /// Directory for the recovery log, if this store lives on disk
    fn recovery_dir(&self) -> Option<&Path> {
        None
    }
}

// ---------------------------------------------------------------------------
// File store
// ---------------------------------------------------------------------------

/// Snapshot kept in a single JSON file, replaced atomically on save
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Store for FileStore {
    fn load(&self) -> Result<Option<String>, StoreError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let text = fs::read_to_string(&self.path).map_err(|e| StoreError::Read {
            path: self.path.clone(),
            source: e,
        })?;
        if text.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(text))
    }

    fn save(&mut self, blob: &str) -> Result<(), StoreError> {
        let write_err = |e| StoreError::Write {
            path: self.path.clone(),
            source: e,
        };
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        atomic_write(&self.path, blob.as_bytes()).map_err(write_err)
    }

    fn recovery_dir(&self) -> Option<&Path> {
        self.path.parent().filter(|p| !p.as_os_str().is_empty())
    }
}

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

/// Store kept in memory; can be told to fail writes
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    blob: Option<String>,
    fail_writes: bool,
    saves: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    pub fn with_blob(blob: impl Into<String>) -> Self {
        MemoryStore {
            blob: Some(blob.into()),
            ..Default::default()
        }
    }

    pub fn blob(&self) -> Option<&str> {
        self.blob.as_deref()
    }

    /// Number of successful saves
    pub fn save_count(&self) -> usize {
        self.saves
    }

    pub fn set_fail_writes(&mut self, fail: bool) {
        self.fail_writes = fail;
    }
}

impl Store for MemoryStore {
    fn load(&self) -> Result<Option<String>, StoreError> {
        Ok(self.blob.clone())
    }

    fn save(&mut self, blob: &str) -> Result<(), StoreError> {
        if self.fail_writes {
            return Err(StoreError::Unavailable("quota exceeded".into()));
        }
        self.blob = Some(blob.to_string());
        self.saves += 1;
        Ok(())
    }
}
