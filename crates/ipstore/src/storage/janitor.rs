//! Recursive directory removal with per-entry error collection.
//!
//! Unlike `std::fs::remove_dir_all`, [`remove_tree`] keeps going after a
//! failure and reports every entry it could not remove. It only descends
//! into entries whose file type (read without following links) is a
//! directory; symbolic links are unlinked, never traversed.

use std::path::{Path, PathBuf};

/// An entry that could not be removed.
#[derive(Debug)]
pub struct RemovalFailure {
    pub path: PathBuf,
    pub error: std::io::Error,
}

/// Outcome of a [`remove_tree`] call.
#[derive(Debug, Default)]
pub struct TreeRemoval {
    /// Files and links unlinked.
    pub files_removed: usize,
    /// Directories removed, including the root of the tree.
    pub dirs_removed: usize,
    /// Entries left behind.
    pub failures: Vec<RemovalFailure>,
}

impl TreeRemoval {
    /// `true` if nothing was left behind.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    fn fail(&mut self, path: &Path, error: std::io::Error) {
        self.failures.push(RemovalFailure {
            path: path.to_path_buf(),
            error,
        });
    }
}

/// Delete `path` and everything below it.
///
/// A missing `path` is a no-op. A `path` that is not a directory (including
/// a link to one) is unlinked on its own.
pub fn remove_tree(path: &Path) -> TreeRemoval {
    let mut report = TreeRemoval::default();

    let metadata = match std::fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return report,
        Err(e) => {
            report.fail(path, e);
            return report;
        }
    };

    if metadata.is_dir() {
        remove_dir_contents(path, &mut report);
    } else {
        remove_entry_file(path, &mut report);
    }

    report
}

fn remove_dir_contents(dir: &Path, report: &mut TreeRemoval) {
    match std::fs::read_dir(dir) {
        Ok(entries) => {
            for entry in entries {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(e) => {
                        report.fail(dir, e);
                        continue;
                    }
                };
                let path = entry.path();
                match entry.file_type() {
                    Ok(kind) if kind.is_dir() => remove_dir_contents(&path, report),
                    Ok(_) => remove_entry_file(&path, report),
                    Err(e) => report.fail(&path, e),
                }
            }
        }
        Err(e) => {
            report.fail(dir, e);
            return;
        }
    }

    match std::fs::remove_dir(dir) {
        Ok(()) => report.dirs_removed += 1,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => report.fail(dir, e),
    }
}

fn remove_entry_file(path: &Path, report: &mut TreeRemoval) {
    match std::fs::remove_file(path) {
        Ok(()) => report.files_removed += 1,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => report.fail(path, e),
    }
}
