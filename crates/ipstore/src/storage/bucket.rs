//! Bucket resolution.
//!
//! A bucket is one directory directly under the storage root. With rotation
//! enabled the bucket is named after the current local date; otherwise
//! every record lives in the fixed `undated` bucket:
//!
//! ```text
//! {root}/
//! ├── 2025-08-07/          # rotating mode, today's bucket
//! │   └── {token}.db
//! └── undated/             # flat mode
//!     └── {token}.db
//! ```

use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use crate::sanitize::IdentityToken;

/// Bucket name used when rotation is disabled.
pub const UNDATED_BUCKET: &str = "undated";

/// Extension of every record file.
pub const RECORD_EXTENSION: &str = "db";

/// `strftime` pattern for dated bucket names.
const BUCKET_DATE_FORMAT: &str = "%Y-%m-%d";

/// Where a token's record lives for a given day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketPath {
    /// `{root}/{bucket}`.
    pub bucket_dir: PathBuf,
    /// `{root}/{bucket}/{token}.db`.
    pub record_file: PathBuf,
}

/// Name of the bucket active on `today`.
pub fn bucket_name(rotating: bool, today: NaiveDate) -> String {
    if rotating {
        today.format(BUCKET_DATE_FORMAT).to_string()
    } else {
        UNDATED_BUCKET.to_string()
    }
}

/// Resolve the bucket directory and record file for `token`.
pub fn resolve(root: &Path, token: &IdentityToken, rotating: bool, today: NaiveDate) -> BucketPath {
    let bucket_dir = root.join(bucket_name(rotating, today));
    let record_file = bucket_dir.join(format!("{}.{RECORD_EXTENSION}", token.as_str()));
    BucketPath {
        bucket_dir,
        record_file,
    }
}
