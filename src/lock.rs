//! Cross-process staging locks
//!
//! The marker check-then-extract sequence is not atomic on its own. Each
//! dependency gets an exclusive OS file lock so concurrent build
//! invocations serialize instead of extracting over each other. The lock
//! is released when the [`StageLock`] is dropped.

use crate::error::{StageError, StageResult};
use fs4::fs_std::FileExt;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// An exclusive lock held for one dependency
#[derive(Debug)]
pub struct StageLock {
    file: File,
    path: PathBuf,
}

impl StageLock {
    /// Block until the lock for `name` under `scratch_dir/locks/` is held.
    pub fn acquire(scratch_dir: &Path, name: &str) -> StageResult<Self> {
        let locks_dir = scratch_dir.join("locks");
        fs::create_dir_all(&locks_dir)
            .map_err(|e| StageError::filesystem("creating locks directory", &locks_dir, e))?;

        let path = locks_dir.join(format!("{name}.lock"));
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| StageError::Lock {
                path: path.clone(),
                source: e,
            })?;

        debug!("Waiting for lock {}", path.display());
        FileExt::lock_exclusive(&file).map_err(|e| StageError::Lock {
            path: path.clone(),
            source: e,
        })?;
        debug!("Acquired lock {}", path.display());

        Ok(Self { file, path })
    }

    /// Path of the lock file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StageLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            warn!("Failed to unlock {}: {}", self.path.display(), e);
        }
    }
}
