//! Storage layer: bucket layout, record engine, and retention.
//!
//! # Directory layout
//!
//! ```text
//! {root}/
//! ├── {YYYY-MM-DD}/        # one bucket per day in rotating mode
//! │   └── {token}.db
//! └── undated/             # the single bucket in flat mode
//!     └── {token}.db
//! ```
//!
//! # Modules
//!
//! - [`bucket`]: bucket naming and record path resolution.
//! - [`engine`]: the [`RecordEngine`] interface the store writes through.
//! - [`record_file`]: [`JsonFileEngine`], the default engine.
//! - [`retention`]: pruning of stale buckets.
//! - [`janitor`]: recursive directory removal used by retention.

pub mod bucket;
pub mod engine;
pub mod janitor;
pub mod record_file;
pub mod retention;

pub use bucket::{bucket_name, resolve, BucketPath, RECORD_EXTENSION, UNDATED_BUCKET};
pub use engine::{Access, RecordEngine};
pub use janitor::{remove_tree, RemovalFailure, TreeRemoval};
pub use record_file::{JsonFileEngine, RecordHandle};
pub use retention::{prune_all, prune_stale, PruneReport};
