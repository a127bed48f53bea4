//! Record engine interface.
//!
//! The store never touches record contents itself. It asks a
//! [`RecordEngine`] to create, open, mutate and close record files, so any
//! backing format that honours this contract can be plugged in. The engine
//! is responsible for making one open → mutate → close sequence atomic with
//! respect to other sequences on the same record.

use std::path::Path;

use crate::error::Result;
use crate::value::Value;

/// How a record is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Shared access; `upsert` is rejected.
    ReadOnly,
    /// Exclusive access; changes are persisted by `close_record`.
    ReadWrite,
}

/// A file-backed container of string-keyed values.
pub trait RecordEngine {
    /// An open record. Holds whatever lock the engine takes until it is
    /// passed to [`RecordEngine::close_record`] or dropped.
    type Handle;

    /// Create an empty record at `path`.
    ///
    /// A record that already exists is left untouched and is not an error.
    fn create_record(&self, path: &Path) -> Result<()>;

    /// Open an existing record.
    fn open_record(&self, path: &Path, access: Access) -> Result<Self::Handle>;

    /// Insert or replace `key`.
    fn upsert(&self, handle: &mut Self::Handle, key: &str, value: Value) -> Result<()>;

    /// Fetch `key`, or `None` if the record has no such key.
    fn get(&self, handle: &Self::Handle, key: &str) -> Option<Value>;

    /// Return `true` if the record holds `key`.
    fn contains(&self, handle: &Self::Handle, key: &str) -> bool {
        self.get(handle, key).is_some()
    }

    /// Persist pending changes and release the record.
    fn close_record(&self, handle: Self::Handle) -> Result<()>;

    /// Remove the record file. A missing file is not an error.
    fn delete_record(&self, path: &Path) -> Result<()>;

    /// Return `true` if a record exists at `path`.
    fn record_exists(&self, path: &Path) -> bool;
}
