// src/lock.rs

//! Exclusive advisory lock on a package workspace
//!
//! A build attempt owns `<root>/<name>/<version>-<release>/` for its whole
//! duration. Two attempts for the same package would otherwise race on the
//! same directories and the same artifact path, so each attempt takes
//! `flock(LOCK_EX)` on a `.lock` file inside the workspace first.
//!
//! ```ignore
//! let lock = WorkspaceLock::try_acquire(&paths.lock_file())?
//!     .ok_or_else(|| Error::WorkspaceLocked(atom.to_string()))?;
//! // ... build ...
//! // released on drop
//! ```

use crate::error::{Error, Result};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Exclusive lock held for the lifetime of this value
#[derive(Debug)]
pub struct WorkspaceLock {
    /// Kept open to keep the lock
    file: File,
    path: PathBuf,
}

impl WorkspaceLock {
    /// Try to acquire the lock without blocking
    ///
    /// Returns `Ok(None)` if another process or thread holds it.
    pub fn try_acquire<P: AsRef<Path>>(path: P) -> Result<Option<Self>> {
        let path = path.as_ref().to_path_buf();
        let file = open_lock_file(&path)?;

        match file.try_lock_exclusive() {
            Ok(()) => {
                debug!("Acquired workspace lock {}", path.display());
                Ok(Some(Self { file, path }))
            }
            Err(e) if e.kind() == fs2::lock_contended_error().kind() => {
                debug!("Workspace lock already held: {}", path.display());
                Ok(None)
            }
            Err(e) => Err(Error::IoError(format!(
                "Failed to try-acquire lock {}: {}",
                path.display(),
                e
            ))),
        }
    }
}

impl Drop for WorkspaceLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
        debug!("Released workspace lock {}", self.path.display());
    }
}

fn open_lock_file(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            Error::IoError(format!("Failed to create {}: {}", parent.display(), e))
        })?;
    }

    // Never truncate: the holder may be another process
    OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(path)
        .map_err(|e| Error::IoError(format!("Failed to open lock file {}: {}", path.display(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_try_acquire_and_release() {
        let temp_dir = TempDir::new().unwrap();
        let lock_path = temp_dir.path().join(".lock");

        let lock = WorkspaceLock::try_acquire(&lock_path).unwrap().unwrap();
        assert!(lock_path.exists());

        drop(lock);
        assert!(WorkspaceLock::try_acquire(&lock_path).unwrap().is_some());
    }

    #[test]
    fn test_try_acquire_fails_when_held() {
        let temp_dir = TempDir::new().unwrap();
        let lock_path = temp_dir.path().join(".lock");

        let _held = WorkspaceLock::try_acquire(&lock_path).unwrap().unwrap();
        let second = WorkspaceLock::try_acquire(&lock_path).unwrap();
        assert!(second.is_none());
    }

    #[test]
    fn test_existing_lock_file_is_reused() {
        let temp_dir = TempDir::new().unwrap();
        let lock_path = temp_dir.path().join(".lock");
        fs::write(&lock_path, b"stale").unwrap();

        let _lock = WorkspaceLock::try_acquire(&lock_path).unwrap().unwrap();
        assert_eq!(fs::read(&lock_path).unwrap(), b"stale");
    }

    #[test]
    fn test_creates_parent_dirs() {
        let temp_dir = TempDir::new().unwrap();
        let lock_path = temp_dir.path().join("foo/1.2-0/.lock");

        let _lock = WorkspaceLock::try_acquire(&lock_path).unwrap().unwrap();
        assert!(lock_path.exists());
    }
}
