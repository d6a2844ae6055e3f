//! Cross-process mutual exclusion via a lock file.
//!
//! The lock uses create-exclusive semantics: at most one generation run
//! touches a given output directory at a time. A second concurrent attempt
//! observes the existing lock and no-ops instead of blocking or erroring.
//! The lock has no expiry; a crashed holder leaves it behind, which is
//! logged so an operator can remove it.

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use snafu::prelude::*;
use tracing::{debug, warn};

use crate::error::{CreateLockSnafu, LockError};

/// Name of the lock artifact inside the output directory.
pub const LOCK_FILE_NAME: &str = "generator.lock";

/// Scoped run lock. Removed on drop, whether the run succeeded or not.
#[derive(Debug)]
pub struct LockFile {
    path: PathBuf,
}

impl LockFile {
    /// Try to acquire the lock in `dir`.
    ///
    /// `Ok(None)` means another run holds the lock; the caller skips the run
    /// body. Any filesystem failure other than contention propagates.
    pub fn acquire(dir: &Path) -> Result<Option<Self>, LockError> {
        let path = dir.join(LOCK_FILE_NAME);
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(_) => {
                debug!(path = %path.display(), "Acquired run lock");
                Ok(Some(Self { path }))
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                warn!(
                    path = %path.display(),
                    "Lock already held; skipping run (remove the file if it is stale)"
                );
                Ok(None)
            }
            Err(e) => Err(e).context(CreateLockSnafu { path }),
        }
    }

    /// Path of the lock artifact.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for LockFile {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %self.path.display(), error = %e, "Failed to remove lock file");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_acquire_creates_and_drop_removes() {
        let dir = TempDir::new().unwrap();
        let lock_path = dir.path().join(LOCK_FILE_NAME);

        let lock = LockFile::acquire(dir.path()).unwrap().unwrap();
        assert!(lock_path.exists());
        assert_eq!(lock.path(), lock_path);

        drop(lock);
        assert!(!lock_path.exists());
    }

    #[test]
    fn test_contention_is_not_an_error() {
        let dir = TempDir::new().unwrap();
        let _held = LockFile::acquire(dir.path()).unwrap().unwrap();

        let second = LockFile::acquire(dir.path()).unwrap();
        assert!(second.is_none());

        // The original holder still owns the lock.
        assert!(dir.path().join(LOCK_FILE_NAME).exists());
    }

    #[test]
    fn test_missing_directory_propagates() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope");
        assert!(matches!(
            LockFile::acquire(&missing),
            Err(LockError::CreateLock { .. })
        ));
    }
}
