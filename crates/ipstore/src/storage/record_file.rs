//! JSON record files, the default [`RecordEngine`].
//!
//! Each record is a single JSON document:
//!
//! ```json
//! {
//!     "version": 1,
//!     "entries": { "login_failures": 3, "banned": false }
//! }
//! ```
//!
//! Opening a record takes an advisory lock on the file (shared for
//! [`Access::ReadOnly`], exclusive for [`Access::ReadWrite`]) that is held
//! until the handle is closed or dropped. Writes go back into the same
//! locked file rather than through a rename, so the lock covers the whole
//! read-modify-write sequence. A zero-length file reads as an empty record;
//! that is what a reader sees if it wins the race against a creator.

use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError};
use crate::storage::engine::{Access, RecordEngine};
use crate::value::Value;

// ── File format constants ─────────────────────────────────────────────────────

const RECORD_FILE_VERSION: u32 = 1;

// ── On-disk structure ─────────────────────────────────────────────────────────

/// Document written to disk for each record.
#[derive(Debug, Serialize, Deserialize)]
struct RecordContents {
    /// Format version number.
    version: u32,
    /// Stored key-value entries.
    entries: BTreeMap<String, Value>,
}

// ── RecordHandle ──────────────────────────────────────────────────────────────

/// An open, locked record file.
#[derive(Debug)]
pub struct RecordHandle {
    file: File,
    path: PathBuf,
    access: Access,
    entries: BTreeMap<String, Value>,
    dirty: bool,
}

impl RecordHandle {
    /// Path of the underlying file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of entries currently held.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over stored keys in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Write pending changes back into the locked file.
    fn flush(&mut self) -> Result<()> {
        if !self.dirty {
            return Ok(());
        }

        let contents = RecordContents {
            version: RECORD_FILE_VERSION,
            entries: std::mem::take(&mut self.entries),
        };
        let encoded = serde_json::to_vec(&contents);
        self.entries = contents.entries;
        let bytes = encoded.map_err(|e| StoreError::SerializationError(e.to_string()))?;

        // Truncate only once the new document is fully written.
        self.file.seek(SeekFrom::Start(0))?;
        self.file.write_all(&bytes)?;
        self.file.set_len(bytes.len() as u64)?;
        self.file.sync_all()?;
        self.dirty = false;
        Ok(())
    }
}

impl Drop for RecordHandle {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

// ── JsonFileEngine ────────────────────────────────────────────────────────────

/// Filesystem-backed engine storing each record as one JSON file.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFileEngine;

impl JsonFileEngine {
    pub fn new() -> Self {
        Self
    }

    fn lock(file: &File, path: &Path, access: Access) -> Result<()> {
        let locked = match access {
            Access::ReadOnly => FileExt::lock_shared(file),
            Access::ReadWrite => FileExt::lock_exclusive(file),
        };
        locked.map_err(|source| StoreError::Lock {
            path: path.to_path_buf(),
            source,
        })
    }

    fn read_entries(file: &mut File, path: &Path) -> Result<BTreeMap<String, Value>> {
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)?;
        if bytes.is_empty() {
            return Ok(BTreeMap::new());
        }

        let contents: RecordContents = serde_json::from_slice(&bytes).map_err(|e| {
            StoreError::InvalidFileFormat(format!(
                "failed to parse record file {}: {e}",
                path.display()
            ))
        })?;

        if contents.version != RECORD_FILE_VERSION {
            return Err(StoreError::InvalidFileFormat(format!(
                "unsupported record version {} in {}",
                contents.version,
                path.display()
            )));
        }

        Ok(contents.entries)
    }
}

impl RecordEngine for JsonFileEngine {
    type Handle = RecordHandle;

    fn create_record(&self, path: &Path) -> Result<()> {
        let creation_error = |source| StoreError::RecordCreation {
            path: path.to_path_buf(),
            source,
        };

        let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => return Ok(()),
            Err(e) => return Err(creation_error(e)),
        };

        Self::lock(&file, path, Access::ReadWrite)?;

        // A writer may have opened the new file and filled it before we
        // got the lock.
        if file.metadata().map_err(creation_error)?.len() == 0 {
            let contents = RecordContents {
                version: RECORD_FILE_VERSION,
                entries: BTreeMap::new(),
            };
            let bytes = serde_json::to_vec(&contents)
                .map_err(|e| StoreError::SerializationError(e.to_string()))?;
            file.write_all(&bytes).map_err(creation_error)?;
            file.sync_all().map_err(creation_error)?;
        }

        let _ = FileExt::unlock(&file);
        log::debug!("created record {}", path.display());
        Ok(())
    }

    fn open_record(&self, path: &Path, access: Access) -> Result<RecordHandle> {
        let mut file = OpenOptions::new()
            .read(true)
            .write(access == Access::ReadWrite)
            .open(path)?;

        Self::lock(&file, path, access)?;
        let entries = Self::read_entries(&mut file, path)?;

        Ok(RecordHandle {
            file,
            path: path.to_path_buf(),
            access,
            entries,
            dirty: false,
        })
    }

    fn upsert(&self, handle: &mut RecordHandle, key: &str, value: Value) -> Result<()> {
        if handle.access != Access::ReadWrite {
            return Err(StoreError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                format!("record {} is open read-only", handle.path.display()),
            )));
        }
        if !value.is_finite() {
            return Err(StoreError::SerializationError(format!(
                "value for key {key:?} contains a non-finite float"
            )));
        }

        handle.entries.insert(key.to_string(), value);
        handle.dirty = true;
        Ok(())
    }

    fn get(&self, handle: &RecordHandle, key: &str) -> Option<Value> {
        handle.entries.get(key).cloned()
    }

    fn contains(&self, handle: &RecordHandle, key: &str) -> bool {
        handle.entries.contains_key(key)
    }

    fn close_record(&self, mut handle: RecordHandle) -> Result<()> {
        handle.flush()
    }

    fn delete_record(&self, path: &Path) -> Result<()> {
        match std::fs::remove_file(path) {
            Ok(()) => {
                log::debug!("deleted record {}", path.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::Io(e)),
        }
    }

    fn record_exists(&self, path: &Path) -> bool {
        path.is_file()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
