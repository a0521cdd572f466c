//! Named storage disks.
//!
//! A [`Disk`] is anything that can read and write whole files by relative
//! path. The bridge only ever needs `get` and `put`, so the abstraction stays
//! that small. [`LocalDisk`] maps paths onto a root directory; [`MemoryDisk`]
//! keeps contents in a map and backs the tests.

use std::collections::{BTreeMap, HashMap};
use std::io::Write;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Disk '{0}' is not configured")]
    UnknownDisk(String),

    #[error("Invalid storage path '{path}': {reason}")]
    InvalidPath { path: String, reason: &'static str },

    #[error("File '{path}' not found on disk '{disk}'")]
    NotFound { disk: String, path: String },

    #[error("Storage IO error on disk '{disk}' at '{path}': {source}")]
    Io {
        disk: String,
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// A file store addressed by relative paths.
pub trait Disk: Send + Sync + std::fmt::Debug {
    /// Read the full contents of `path`.
    fn get(&self, path: &str) -> Result<Vec<u8>, StorageError>;

    /// Write `contents` to `path`, replacing anything already there.
    fn put(&self, path: &str, contents: &[u8]) -> Result<(), StorageError>;

    fn exists(&self, path: &str) -> bool {
        self.get(path).is_ok()
    }
}

/// Disk backed by a directory on the local filesystem.
#[derive(Debug, Clone)]
pub struct LocalDisk {
    root: PathBuf,
}

impl LocalDisk {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve `path` under the root. Absolute paths and `..` segments are
    /// rejected so a key can never escape the disk.
    pub fn resolve(&self, path: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(path);
        if path.is_empty() {
            return Err(StorageError::InvalidPath {
                path: path.to_string(),
                reason: "path is empty",
            });
        }
        for component in relative.components() {
            match component {
                Component::Normal(_) | Component::CurDir => {}
                Component::ParentDir => {
                    return Err(StorageError::InvalidPath {
                        path: path.to_string(),
                        reason: "parent directory segments are not allowed",
                    });
                }
                Component::RootDir | Component::Prefix(_) => {
                    return Err(StorageError::InvalidPath {
                        path: path.to_string(),
                        reason: "path must be relative to the disk root",
                    });
                }
            }
        }
        Ok(self.root.join(relative))
    }

    fn io_error(&self, path: &str, source: std::io::Error) -> StorageError {
        StorageError::Io {
            disk: self.root.display().to_string(),
            path: path.to_string(),
            source,
        }
    }
}

impl Disk for LocalDisk {
    fn get(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        let full = self.resolve(path)?;
        match std::fs::read(&full) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(StorageError::NotFound {
                disk: self.root.display().to_string(),
                path: path.to_string(),
            }),
            Err(e) => Err(self.io_error(path, e)),
        }
    }

    /// Staged next to the destination and renamed into place, so a failed
    /// write never leaves a truncated file behind.
    fn put(&self, path: &str, contents: &[u8]) -> Result<(), StorageError> {
        let full = self.resolve(path)?;
        let parent = full.parent().unwrap_or(&self.root);
        std::fs::create_dir_all(parent).map_err(|e| self.io_error(path, e))?;

        let mut staged = NamedTempFile::new_in(parent).map_err(|e| self.io_error(path, e))?;
        staged
            .write_all(contents)
            .and_then(|()| staged.flush())
            .map_err(|e| self.io_error(path, e))?;
        staged
            .persist(&full)
            .map_err(|e| self.io_error(path, e.error))?;
        Ok(())
    }

    fn exists(&self, path: &str) -> bool {
        self.resolve(path).is_ok_and(|p| p.is_file())
    }
}

/// In-memory disk.
#[derive(Debug, Default)]
pub struct MemoryDisk {
    files: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryDisk {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.files.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Disk for MemoryDisk {
    fn get(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        self.files
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(path)
            .cloned()
            .ok_or_else(|| StorageError::NotFound {
                disk: "memory".to_string(),
                path: path.to_string(),
            })
    }

    fn put(&self, path: &str, contents: &[u8]) -> Result<(), StorageError> {
        self.files
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path.to_string(), contents.to_vec());
        Ok(())
    }
}

/// Registry of disks by name.
#[derive(Debug, Clone, Default)]
pub struct Disks {
    disks: BTreeMap<String, Arc<dyn Disk>>,
}

impl Disks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `disk` under `name`, replacing any previous entry.
    pub fn insert(&mut self, name: impl Into<String>, disk: impl Disk + 'static) {
        self.disks.insert(name.into(), Arc::new(disk));
    }

    /// Register a shared disk, keeping a handle for the caller.
    pub fn insert_shared(&mut self, name: impl Into<String>, disk: Arc<dyn Disk>) {
        self.disks.insert(name.into(), disk);
    }

    pub fn disk(&self, name: &str) -> Result<&Arc<dyn Disk>, StorageError> {
        self.disks
            .get(name)
            .ok_or_else(|| StorageError::UnknownDisk(name.to_string()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.disks.keys().map(String::as_str)
    }
}
