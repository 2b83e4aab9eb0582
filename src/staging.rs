//! Staging area and the per-job staged file guard.
//!
//! A [`StagedFile`] is handed out before the fetch starts and is owned by
//! exactly one job. It removes its file when released, and as a fallback when
//! dropped, so every exit path of a job cleans up after itself.

use crate::error::{Error, Result};
use crate::naming::unique_staging_name;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Process-wide directory holding staged files
#[derive(Clone, Debug)]
pub struct StagingArea {
    dir: PathBuf,
}

impl StagingArea {
    /// Open the staging area, creating the directory if needed
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await.map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!(
                    "Failed to create staging directory '{}': {}",
                    dir.display(),
                    e
                ),
            ))
        })?;
        Ok(Self { dir })
    }

    /// Directory this staging area writes to
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Reserve a unique staged file path for a display name
    ///
    /// Nothing is created on disk; the fetcher creates the file.
    pub fn allocate(&self, display_name: &str) -> StagedFile {
        StagedFile {
            path: self.dir.join(unique_staging_name(display_name)),
            released: false,
        }
    }
}

/// Exclusively owned staged file, removed on release or drop
#[derive(Debug)]
pub struct StagedFile {
    path: PathBuf,
    released: bool,
}

impl StagedFile {
    /// Location of the staged file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the staged file
    ///
    /// A file that was never created is not an error. Any other failure is
    /// logged and returned so the caller can note it; it never changes the job
    /// outcome.
    pub async fn release(mut self) -> std::io::Result<()> {
        self.released = true;
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {
                tracing::debug!(path = %self.path.display(), "staged file removed");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "failed to remove staged file"
                );
                Err(e)
            }
        }
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                tracing::debug!(path = %self.path.display(), "staged file removed on drop");
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "failed to remove staged file on drop"
                );
            }
        }
    }
}
