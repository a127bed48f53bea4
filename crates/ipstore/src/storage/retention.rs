//! Bucket retention.
//!
//! Rotating stores keep only today's bucket. [`prune_stale`] runs after
//! every successful write in rotating mode and removes every other bucket
//! directory under the root; [`prune_all`] removes every bucket regardless
//! of mode.
//!
//! Both are best-effort: a bucket that cannot be removed is logged and
//! reported, the remaining buckets are still attempted, and no error is
//! returned. The next write retries whatever was left behind.

use std::path::{Path, PathBuf};

use crate::storage::janitor::{remove_tree, RemovalFailure};

/// Outcome of a pruning pass.
#[derive(Debug, Default)]
pub struct PruneReport {
    /// Bucket directories fully removed.
    pub buckets_removed: Vec<PathBuf>,
    /// Entries that could not be removed, across all buckets.
    pub failures: Vec<RemovalFailure>,
}

impl PruneReport {
    /// `true` if every targeted bucket was removed.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Remove every bucket under `root` except `current_bucket`.
///
/// `current_bucket` is matched by directory name against the immediate
/// children of `root`.
pub fn prune_stale(root: &Path, current_bucket: &Path) -> PruneReport {
    let keep = current_bucket.file_name();
    prune_where(root, |dir| dir.file_name() != keep)
}

/// Remove every bucket under `root`.
pub fn prune_all(root: &Path) -> PruneReport {
    prune_where(root, |_| true)
}

fn prune_where(root: &Path, should_remove: impl Fn(&Path) -> bool) -> PruneReport {
    let mut report = PruneReport::default();

    let entries = match std::fs::read_dir(root) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return report,
        Err(error) => {
            log::warn!("cannot list buckets in {}: {error}", root.display());
            report.failures.push(RemovalFailure {
                path: root.to_path_buf(),
                error,
            });
            return report;
        }
    };

    let listing = entries.map(|entry| {
        entry.map(|entry| {
            let is_dir = entry.file_type().map(|kind| kind.is_dir());
            (entry.path(), is_dir)
        })
    });
    let buckets = collect_buckets(root, listing, &mut report.failures);

    for bucket in buckets.into_iter().filter(|b| should_remove(b.as_path())) {
        let removal = remove_tree(&bucket);
        if removal.is_clean() {
            log::debug!(
                "pruned bucket {} ({} files)",
                bucket.display(),
                removal.files_removed
            );
            report.buckets_removed.push(bucket);
        } else {
            for failure in &removal.failures {
                log::warn!(
                    "failed to remove {} while pruning {}: {}",
                    failure.path.display(),
                    bucket.display(),
                    failure.error
                );
            }
            report.failures.extend(removal.failures);
        }
    }

    report
}

/// Keep the directories from a root listing.
///
/// An entry that cannot be read or typed is recorded in `failures` and
/// skipped; the rest of the listing is still used.
fn collect_buckets(
    root: &Path,
    listing: impl Iterator<Item = std::io::Result<(PathBuf, std::io::Result<bool>)>>,
    failures: &mut Vec<RemovalFailure>,
) -> Vec<PathBuf> {
    let mut buckets = Vec::new();
    for entry in listing {
        match entry {
            Ok((path, Ok(true))) => buckets.push(path),
            Ok((_, Ok(false))) => {}
            Ok((path, Err(error))) => {
                log::warn!("cannot stat {}: {error}", path.display());
                failures.push(RemovalFailure { path, error });
            }
            Err(error) => {
                log::warn!("cannot read entry in {}: {error}", root.display());
                failures.push(RemovalFailure {
                    path: root.to_path_buf(),
                    error,
                });
            }
        }
    }
    buckets
}
