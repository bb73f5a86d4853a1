//! Storage and File System Abstractions
//!
//! Provides the platform-agnostic, read-only file access the cache
//! reconciliation core needs. The core never writes to the sync folder, so the
//! trait only exposes inspection and read operations.

use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// File metadata information
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileMetadata {
    pub size: u64,
    /// Creation time in epoch milliseconds, when the platform reports one
    pub created_at: Option<i64>,
    /// Last modification time in epoch milliseconds
    pub modified_at: Option<i64>,
    pub is_directory: bool,
}

/// File system access trait
///
/// Abstracts file reads to support different platforms:
/// - Desktop: Direct filesystem access
/// - iOS/Android: Sandboxed app directories, SAF/document picker
/// - Tests: in-memory fixtures
///
/// # Example
///
/// ```ignore
/// use bridge_traits::storage::FileSystemAccess;
///
/// async fn read_sync_file(fs: &dyn FileSystemAccess, root: &Path) -> Result<Option<Bytes>> {
///     let path = root.join(".Moon+").join("books.sync");
///     if !fs.exists(&path).await? {
///         return Ok(None);
///     }
///     Ok(Some(fs.read_file(&path).await?))
/// }
/// ```
#[async_trait]
pub trait FileSystemAccess: Send + Sync {
    /// Check if a file or directory exists
    async fn exists(&self, path: &Path) -> Result<bool>;

    /// Get metadata for a file or directory
    async fn metadata(&self, path: &Path) -> Result<FileMetadata>;

    /// Read entire file contents into memory
    async fn read_file(&self, path: &Path) -> Result<Bytes>;

    /// List all entries in a directory
    async fn list_directory(&self, path: &Path) -> Result<Vec<PathBuf>>;

    /// List the regular files in a directory whose name ends with `suffix`
    ///
    /// Matching is case-insensitive. Results are sorted by path so callers get
    /// a stable processing order.
    async fn list_files_with_suffix(&self, path: &Path, suffix: &str) -> Result<Vec<PathBuf>> {
        let suffix = suffix.to_lowercase();
        let mut matches: Vec<PathBuf> = self
            .list_directory(path)
            .await?
            .into_iter()
            .filter(|entry| {
                entry
                    .file_name()
                    .and_then(|name| name.to_str())
                    .map(|name| name.to_lowercase().ends_with(&suffix))
                    .unwrap_or(false)
            })
            .collect();
        matches.sort();
        Ok(matches)
    }
}
