//! The per-identity key-value store.
//!
//! An [`IpStore`] is bound to one client identity. Each call resolves that
//! identity's record for today, creates the bucket and record lazily on
//! write, and hands the key operation to the [`RecordEngine`]. In rotating
//! mode every successful write is followed by a best-effort prune of all
//! other buckets.
//!
//! ```no_run
//! use ipstore::{IpStore, Lookup, StoreConfig};
//!
//! # fn main() -> ipstore::Result<()> {
//! let store = IpStore::open(StoreConfig::new("/var/lib/ipstore"), "203.0.113.9")?;
//!
//! let failures = match store.read_key("login_failures")? {
//!     Lookup::Found(value) => value.as_i64().unwrap_or(0),
//!     Lookup::RecordMissing | Lookup::KeyMissing => 0,
//! };
//! store.write_key("login_failures", failures + 1)?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use crate::config::{RequestMeta, StoreConfig};
use crate::error::{Result, StoreError};
use crate::sanitize::{sanitize, IdentityToken};
use crate::storage::{self, Access, BucketPath, JsonFileEngine, PruneReport, RecordEngine};
use crate::time::{Clock, SystemClock};
use crate::value::Value;

/// Result of reading a key.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    /// The stored value, with its original type.
    Found(Value),
    /// Nothing has been written for this identity in the current bucket.
    RecordMissing,
    /// The record exists but has no such key.
    KeyMissing,
}

impl Lookup {
    pub fn is_found(&self) -> bool {
        matches!(self, Lookup::Found(_))
    }

    /// Borrow the value, if found.
    pub fn value(&self) -> Option<&Value> {
        match self {
            Lookup::Found(value) => Some(value),
            _ => None,
        }
    }

    /// Take the value, if found.
    pub fn into_value(self) -> Option<Value> {
        match self {
            Lookup::Found(value) => Some(value),
            _ => None,
        }
    }
}

/// Key-value access to one identity's record.
#[derive(Debug)]
pub struct IpStore<E: RecordEngine = JsonFileEngine, C: Clock = SystemClock> {
    config: StoreConfig,
    identity: String,
    token: IdentityToken,
    engine: E,
    clock: C,
}

impl IpStore {
    /// Open a store for `identity` with the default engine and wall clock.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Configuration` if `identity` is blank.
    pub fn open(config: StoreConfig, identity: impl Into<String>) -> Result<Self> {
        Self::with_parts(config, identity, JsonFileEngine::new(), SystemClock)
    }

    /// Open a store for the identity found in `meta` according to
    /// `config.identity_source`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Configuration` if the request carries no usable
    /// identity.
    pub fn from_request(config: StoreConfig, meta: &RequestMeta) -> Result<Self> {
        let identity = config.identity_source.resolve(meta).ok_or_else(|| {
            StoreError::Configuration(format!(
                "no client identity available from {:?}",
                config.identity_source
            ))
        })?;
        Self::open(config, identity)
    }
}

impl<E: RecordEngine, C: Clock> IpStore<E, C> {
    /// Open a store with an explicit engine and clock.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Configuration` if `identity` is blank.
    pub fn with_parts(
        config: StoreConfig,
        identity: impl Into<String>,
        engine: E,
        clock: C,
    ) -> Result<Self> {
        let identity = identity.into();
        if identity.trim().is_empty() {
            return Err(StoreError::Configuration(
                "client identity is empty".to_string(),
            ));
        }

        let token = sanitize(&identity);
        Ok(Self {
            config,
            identity,
            token,
            engine,
            clock,
        })
    }

    /// The raw identity this store was opened for.
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// The sanitized token used as the record file stem.
    pub fn token(&self) -> &IdentityToken {
        &self.token
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Bucket directory and record file for today.
    pub fn record_path(&self) -> BucketPath {
        storage::resolve(
            &self.config.root,
            &self.token,
            self.config.rotation,
            self.clock.today(),
        )
    }

    // ── Key operations ────────────────────────────────────────────────────────

    /// Insert or replace `key`.
    ///
    /// Creates today's bucket and the record if needed. In rotating mode,
    /// stale buckets are pruned afterwards; pruning failures are logged and
    /// do not affect the result.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::DirectoryCreation` or
    /// `StoreError::RecordCreation` if the bucket or record cannot be
    /// created, and any engine error from opening, updating or closing the
    /// record.
    pub fn write_key(&self, key: &str, value: impl Into<Value>) -> Result<()> {
        let paths = self.record_path();
        let mut handle = self.open_for_write(&paths)?;
        self.engine.upsert(&mut handle, key, value.into())?;
        self.engine.close_record(handle)?;

        if self.config.rotation {
            storage::prune_stale(&self.config.root, &paths.bucket_dir);
        }
        Ok(())
    }

    /// Read `key`.
    ///
    /// Never creates anything. A missing record or key is reported through
    /// [`Lookup`], not as an error.
    ///
    /// # Errors
    ///
    /// Returns any engine error from opening or parsing the record.
    pub fn read_key(&self, key: &str) -> Result<Lookup> {
        let paths = self.record_path();
        let Some(handle) = self.open_existing(&paths.record_file)? else {
            return Ok(Lookup::RecordMissing);
        };

        let lookup = match self.engine.get(&handle, key) {
            Some(value) => Lookup::Found(value),
            None => Lookup::KeyMissing,
        };
        self.engine.close_record(handle)?;
        Ok(lookup)
    }

    /// Return `true` if `key` is present in today's record.
    ///
    /// A missing record counts as "absent".
    ///
    /// # Errors
    ///
    /// Returns any engine error from opening or parsing the record.
    pub fn check_key(&self, key: &str) -> Result<bool> {
        let paths = self.record_path();
        let Some(handle) = self.open_existing(&paths.record_file)? else {
            return Ok(false);
        };

        let present = self.engine.contains(&handle, key);
        self.engine.close_record(handle)?;
        Ok(present)
    }

    /// Return `true` if today's record exists on disk.
    pub fn file_exists(&self) -> bool {
        self.engine.record_exists(&self.record_path().record_file)
    }

    /// Delete today's record.
    ///
    /// Returns `true` if the record is gone afterwards (including when it
    /// never existed) and `false` if removal failed.
    pub fn delete_record(&self) -> bool {
        let paths = self.record_path();
        if !self.engine.record_exists(&paths.record_file) {
            return true;
        }

        match self.engine.delete_record(&paths.record_file) {
            Ok(()) => true,
            Err(e) => {
                log::warn!(
                    "failed to delete record {}: {e}",
                    paths.record_file.display()
                );
                false
            }
        }
    }

    // ── Retention ─────────────────────────────────────────────────────────────

    /// Remove every bucket except the current one.
    ///
    /// Runs automatically after writes in rotating mode. Calling it in flat
    /// mode removes leftover dated buckets and keeps `undated`.
    pub fn prune_stale_buckets(&self) -> PruneReport {
        let paths = self.record_path();
        storage::prune_stale(&self.config.root, &paths.bucket_dir)
    }

    /// Remove every bucket under the root, for all identities.
    pub fn wipe_all_buckets(&self) -> PruneReport {
        storage::prune_all(&self.config.root)
    }

    // ── Internal helpers ──────────────────────────────────────────────────────

    /// Make sure the bucket directory and record file exist.
    ///
    /// The bucket may disappear between the two steps if another process
    /// prunes it after a date change, so creation is retried once.
    fn ensure_record(&self, paths: &BucketPath) -> Result<()> {
        if self.engine.record_exists(&paths.record_file) {
            return Ok(());
        }

        ensure_dir(&paths.bucket_dir)?;
        match self.engine.create_record(&paths.record_file) {
            Err(StoreError::RecordCreation { source, .. })
                if source.kind() == std::io::ErrorKind::NotFound =>
            {
                ensure_dir(&paths.bucket_dir)?;
                self.engine.create_record(&paths.record_file)
            }
            other => other,
        }
    }

    /// Create the record if needed and open it for writing.
    ///
    /// A prune in another process can remove the bucket after the record
    /// was found but before it is opened; the record is then recreated and
    /// opened once more.
    fn open_for_write(&self, paths: &BucketPath) -> Result<E::Handle> {
        self.ensure_record(paths)?;
        match self.engine.open_record(&paths.record_file, Access::ReadWrite) {
            Err(StoreError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!(
                    "record {} vanished before open, recreating",
                    paths.record_file.display()
                );
                self.ensure_record(paths)?;
                self.engine.open_record(&paths.record_file, Access::ReadWrite)
            }
            other => other,
        }
    }

    /// Open an existing record read-only, or `None` if there is none.
    fn open_existing(&self, path: &Path) -> Result<Option<E::Handle>> {
        if !self.engine.record_exists(path) {
            return Ok(None);
        }

        match self.engine.open_record(path, Access::ReadOnly) {
            Ok(handle) => Ok(Some(handle)),
            // Deleted between the existence check and the open.
            Err(StoreError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// Create `dir` and its parents. An existing directory is success.
fn ensure_dir(dir: &Path) -> Result<()> {
    if dir.is_dir() {
        return Ok(());
    }

    std::fs::create_dir_all(dir).map_err(|source| StoreError::DirectoryCreation {
        path: dir.to_path_buf(),
        source,
    })?;
    log::debug!("created bucket {}", dir.display());
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
