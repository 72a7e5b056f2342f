//! Storage root management.
//!
//! ```text
//! <base>/
//! ├─ .quarry.lock      # Advisory lock held by the owning manager
//! ├─ articles/         # One directory per index
//! └─ logs-2024/
//! ```
//!
//! The lock file keeps two managers from driving the same root. Its name
//! starts with `.` so discovery never mistakes it for an index.

use crate::error::{IndexError, IndexResult};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::warn;

const LOCK_FILE: &str = ".quarry.lock";

/// An exclusively locked storage root.
///
/// The lock is released when the value is dropped.
#[derive(Debug)]
pub(crate) struct DataDir {
    path: PathBuf,
    _lock_file: File,
}

impl DataDir {
    /// Creates the directory if needed and takes the lock.
    ///
    /// # Errors
    ///
    /// `ManagerLocked` if another manager holds the root.
    pub(crate) fn open(path: &Path) -> IndexResult<Self> {
        fs::create_dir_all(path)?;
        if !path.is_dir() {
            return Err(IndexError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("not a directory: {}", path.display()),
            )));
        }

        let lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path.join(LOCK_FILE))?;
        if lock_file.try_lock_exclusive().is_err() {
            return Err(IndexError::ManagerLocked);
        }

        Ok(Self {
            path: path.to_path_buf(),
            _lock_file: lock_file,
        })
    }

    #[must_use]
    pub(crate) fn path(&self) -> &Path {
        &self.path
    }
}

/// Removes `path` and everything below it, continuing past failures.
/// Returns how many entries could not be removed.
pub(crate) fn remove_tree(path: &Path) -> usize {
    let mut failures = 0;
    match fs::read_dir(path) {
        Ok(entries) => {
            for entry in entries.flatten() {
                let child = entry.path();
                let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
                if is_dir {
                    failures += remove_tree(&child);
                } else if let Err(e) = fs::remove_file(&child) {
                    warn!(path = %child.display(), error = %e, "failed to delete file");
                    failures += 1;
                }
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return 0,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to list directory");
            return 1;
        }
    }
    if let Err(e) = fs::remove_dir(path) {
        warn!(path = %path.display(), error = %e, "failed to delete directory");
        failures += 1;
    }
    failures
}

/// Runs `build`, removing `path` if it fails and `path` did not exist
/// beforehand.
pub(crate) fn remove_on_error<T>(
    path: &Path,
    build: impl FnOnce() -> IndexResult<T>,
) -> IndexResult<T> {
    let existed = path.exists();
    let result = build();
    if result.is_err() && !existed && path.exists() {
        remove_tree(path);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn open_creates_directory() {
        let temp = tempdir().unwrap();
        let root = temp.path().join("nested/indices");

        let dir = DataDir::open(&root).unwrap();
        assert!(root.is_dir());
        assert!(root.join(LOCK_FILE).exists());
        assert_eq!(dir.path(), root);
    }

    #[test]
    fn lock_prevents_second_open() {
        let temp = tempdir().unwrap();
        let _first = DataDir::open(temp.path()).unwrap();
        assert!(matches!(
            DataDir::open(temp.path()),
            Err(IndexError::ManagerLocked)
        ));
    }

    #[test]
    fn lock_released_on_drop() {
        let temp = tempdir().unwrap();
        {
            let _dir = DataDir::open(temp.path()).unwrap();
        }
        let _again = DataDir::open(temp.path()).unwrap();
    }

    #[test]
    fn remove_tree_deletes_everything() {
        let temp = tempdir().unwrap();
        let root = temp.path().join("index");
        fs::create_dir_all(root.join("a/b")).unwrap();
        fs::write(root.join("meta.json"), b"{}").unwrap();
        fs::write(root.join("a/b/segment"), b"data").unwrap();

        assert_eq!(remove_tree(&root), 0);
        assert!(!root.exists());
        assert_eq!(remove_tree(&root), 0);
    }

    #[test]
    fn failed_build_leaves_no_new_directory() {
        let temp = tempdir().unwrap();
        let fresh = temp.path().join("fresh");
        let result: IndexResult<()> = remove_on_error(&fresh, || {
            fs::create_dir_all(fresh.join("partial"))?;
            Err(IndexError::ManagerClosed)
        });
        assert!(result.is_err());
        assert!(!fresh.exists());

        let kept = temp.path().join("kept");
        fs::create_dir_all(&kept).unwrap();
        let result: IndexResult<()> = remove_on_error(&kept, || Err(IndexError::ManagerClosed));
        assert!(result.is_err());
        assert!(kept.exists());

        let built = remove_on_error(&temp.path().join("built"), || {
            fs::create_dir_all(temp.path().join("built"))?;
            Ok(7)
        });
        assert_eq!(built.unwrap(), 7);
        assert!(temp.path().join("built").exists());
    }
}
