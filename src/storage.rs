//! Flat-file document storage with an in-memory fake for tests.
//!
//! Each store owns exactly one JSON document. `load` hands back the raw text
//! (`None` when the document does not exist yet) and `save` rewrites it in
//! full. No locking or partial update happens at this layer; serialization
//! of concurrent access lives in the stores above it.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Errors from the storage backends.
#[derive(Debug)]
pub enum StorageError {
    /// Failed to read the backing file.
    Read { path: PathBuf, source: io::Error },
    /// Failed to write the backing file.
    Write { path: PathBuf, source: io::Error },
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read { path, source } => {
                write!(f, "failed to read '{}': {}", path.display(), source)
            }
            Self::Write { path, source } => {
                write!(f, "failed to write '{}': {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Read { source, .. } | Self::Write { source, .. } => Some(source),
        }
    }
}

/// A single persisted text document.
pub trait Storage: Send + Sync {
    /// Read the whole document. `None` means it does not exist yet.
    fn load(&self) -> Result<Option<String>, StorageError>;

    /// Rewrite the whole document.
    fn save(&self, contents: &str) -> Result<(), StorageError>;
}

/// Document stored as a file on local disk.
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Storage for FileStorage {
    fn load(&self) -> Result<Option<String>, StorageError> {
        if !self.path.exists() {
            return Ok(None);
        }
        std::fs::read_to_string(&self.path)
            .map(Some)
            .map_err(|e| StorageError::Read {
                path: self.path.clone(),
                source: e,
            })
    }

    fn save(&self, contents: &str) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| StorageError::Write {
                path: self.path.clone(),
                source: e,
            })?;
        }
        std::fs::write(&self.path, contents).map_err(|e| StorageError::Write {
            path: self.path.clone(),
            source: e,
        })
    }
}

/// In-memory document for tests.
#[derive(Default)]
pub struct MemoryStorage {
    contents: Mutex<Option<String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn load(&self) -> Result<Option<String>, StorageError> {
        Ok(self
            .contents
            .lock()
            .expect("memory storage lock poisoned")
            .clone())
    }

    fn save(&self, contents: &str) -> Result<(), StorageError> {
        *self
            .contents
            .lock()
            .expect("memory storage lock poisoned") = Some(contents.to_string());
        Ok(())
    }
}
