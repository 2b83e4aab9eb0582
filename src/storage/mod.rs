//! Storage backend integration point
//!
//! The relay uploads staged files through the [`StorageBackend`] trait. The
//! production implementation is [`DriveBackend`] (Google Drive v3); tests plug
//! in their own implementations.

use crate::error::UploadError;
use crate::types::StoredObjectId;
use async_trait::async_trait;
use std::path::Path;

/// Service account token flow
pub mod auth;
/// Google Drive implementation
pub mod drive;

pub use auth::{ServiceAccountKey, TokenProvider};
pub use drive::DriveBackend;

/// Trait for pushing a staged file into a storage backend
///
/// Implementations must stream or chunk the file; a staged file can be far
/// larger than available memory.
///
/// # Examples
///
/// ```no_run
/// use drive_relay::storage::{DriveBackend, StorageBackend};
/// use drive_relay::config::StorageConfig;
/// use std::path::Path;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = DriveBackend::from_config(reqwest::Client::new(), &StorageConfig::default())?;
/// let id = backend
///     .upload(Path::new("/tmp/20240101_120000_abcdef012345.pdf"), "a.pdf", "folder123")
///     .await?;
/// println!("stored as {id}");
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Short backend name used in logs
    fn name(&self) -> &str;

    /// Create a new object named `display_name` inside `container` from the file at `path`
    ///
    /// Returns the identifier the backend assigned to the new object.
    async fn upload(
        &self,
        path: &Path,
        display_name: &str,
        container: &str,
    ) -> Result<StoredObjectId, UploadError>;
}
