//! Where the run history is persisted.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub trait HistoryStorage {
    /// The stored document, or `None` when nothing has been stored yet.
    fn load(&self) -> Result<Option<String>, StorageError>;

    fn save(&mut self, contents: &str) -> Result<(), StorageError>;

    fn remove(&mut self) -> Result<(), StorageError>;
}

impl<S: HistoryStorage + ?Sized> HistoryStorage for Box<S> {
    fn load(&self) -> Result<Option<String>, StorageError> {
        (**self).load()
    }

    fn save(&mut self, contents: &str) -> Result<(), StorageError> {
        (**self).save(contents)
    }

    fn remove(&mut self) -> Result<(), StorageError> {
        (**self).remove()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to encode history: {0}")]
    Encode(#[from] serde_json::Error),
}

// ============================================================================
// JSON file
// ============================================================================

#[derive(Clone, Debug)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_error(&self, source: io::Error) -> StorageError {
        StorageError::Write {
            path: self.path.clone(),
            source,
        }
    }
}

impl HistoryStorage for FileStorage {
    fn load(&self) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => Ok(Some(contents)),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StorageError::Read {
                path: self.path.clone(),
                source,
            }),
        }
    }

    fn save(&mut self, contents: &str) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| self.write_error(e))?;
        }
        fs::write(&self.path, contents).map_err(|e| self.write_error(e))
    }

    fn remove(&mut self) -> Result<(), StorageError> {
        match fs::remove_file(&self.path) {
            Err(error) if error.kind() != io::ErrorKind::NotFound => Err(self.write_error(error)),
            _ => Ok(()),
        }
    }
}

// ============================================================================
// In-memory
// ============================================================================

/// Storage for sessions that should not outlive the process.
#[derive(Clone, Debug, Default)]
pub struct MemoryStorage {
    contents: Option<String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_contents(contents: impl Into<String>) -> Self {
        Self {
            contents: Some(contents.into()),
        }
    }

    pub fn contents(&self) -> Option<&str> {
        self.contents.as_deref()
    }
}

impl HistoryStorage for MemoryStorage {
    fn load(&self) -> Result<Option<String>, StorageError> {
        Ok(self.contents.clone())
    }

    fn save(&mut self, contents: &str) -> Result<(), StorageError> {
        self.contents = Some(contents.to_owned());
        Ok(())
    }

    fn remove(&mut self) -> Result<(), StorageError> {
        self.contents = None;
        Ok(())
    }
}
