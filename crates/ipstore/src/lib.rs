//! ipstore: per-client key-value storage without a database server.
//!
//! Tracks short-lived state such as rate-limit counters, attempt counts and
//! flags, keyed by a requester's network identity. Records live in plain
//! files under a storage root, partitioned into daily buckets that are
//! pruned automatically, or into a single flat bucket.

pub mod config;
pub mod error;
pub mod sanitize;
pub mod storage;
pub mod store;
pub mod time;
pub mod value;

// Re-export primary types
pub use config::{IdentitySource, RequestMeta, StoreConfig};
pub use error::{Result, StoreError};
pub use sanitize::{sanitize, IdentityToken};
pub use storage::{Access, BucketPath, JsonFileEngine, PruneReport, RecordEngine};
pub use store::{IpStore, Lookup};
pub use time::{Clock, FixedClock, SystemClock};
pub use value::Value;
