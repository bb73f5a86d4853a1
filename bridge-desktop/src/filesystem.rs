//! File System Access Implementation using Tokio

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    storage::{FileMetadata, FileSystemAccess},
};
use bytes::Bytes;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tokio::fs;
use tracing::debug;

/// Tokio-based file system implementation
///
/// Read-only access to the host file system through `tokio::fs`. Timestamps
/// are reported in epoch milliseconds.
#[derive(Debug, Clone, Default)]
pub struct TokioFileSystem;

impl TokioFileSystem {
    pub fn new() -> Self {
        Self
    }

    /// Convert std::io::Error to BridgeError, keeping the path for NotFound
    fn map_io_error(path: &Path, e: std::io::Error) -> BridgeError {
        if e.kind() == std::io::ErrorKind::NotFound {
            BridgeError::NotFound(path.to_path_buf())
        } else {
            BridgeError::Io(e)
        }
    }

    fn epoch_millis(time: std::io::Result<SystemTime>) -> Option<i64> {
        time.ok()
            .and_then(|t| t.duration_since(SystemTime::UNIX_EPOCH).ok())
            .map(|d| d.as_millis() as i64)
    }
}

#[async_trait]
impl FileSystemAccess for TokioFileSystem {
    async fn exists(&self, path: &Path) -> Result<bool> {
        fs::try_exists(path)
            .await
            .map_err(|e| Self::map_io_error(path, e))
    }

    async fn metadata(&self, path: &Path) -> Result<FileMetadata> {
        let metadata = fs::metadata(path)
            .await
            .map_err(|e| Self::map_io_error(path, e))?;

        Ok(FileMetadata {
            size: metadata.len(),
            created_at: Self::epoch_millis(metadata.created()),
            modified_at: Self::epoch_millis(metadata.modified()),
            is_directory: metadata.is_dir(),
        })
    }

    async fn read_file(&self, path: &Path) -> Result<Bytes> {
        let data = fs::read(path)
            .await
            .map_err(|e| Self::map_io_error(path, e))?;
        debug!(path = ?path, size = data.len(), "Read file");
        Ok(Bytes::from(data))
    }

    async fn list_directory(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let mut entries = Vec::new();
        let mut read_dir = fs::read_dir(path)
            .await
            .map_err(|e| Self::map_io_error(path, e))?;

        while let Some(entry) = read_dir
            .next_entry()
            .await
            .map_err(|e| Self::map_io_error(path, e))?
        {
            entries.push(entry.path());
        }

        debug!(path = ?path, count = entries.len(), "Listed directory");
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_read_and_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("Dune.epub.po");
        std::fs::write(&file, b"1700000000*12@0#500:63.5%").unwrap();

        let fs = TokioFileSystem::new();
        assert!(fs.exists(&file).await.unwrap());

        let data = fs.read_file(&file).await.unwrap();
        assert_eq!(&data[..], b"1700000000*12@0#500:63.5%");

        let meta = fs.metadata(&file).await.unwrap();
        assert_eq!(meta.size, 25);
        assert!(!meta.is_directory);
        assert!(meta.modified_at.unwrap() > 1_000_000_000_000);
    }

    #[tokio::test]
    async fn test_missing_path_maps_to_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");

        let fs = TokioFileSystem::new();
        assert!(!fs.exists(&missing).await.unwrap());

        let err = fs.list_directory(&missing).await.unwrap_err();
        assert!(err.is_not_found());

        let err = fs.read_file(&missing).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_list_files_with_suffix() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.epub.an"), b"x").unwrap();
        std::fs::write(dir.path().join("a.epub.an"), b"x").unwrap();
        std::fs::write(dir.path().join("a.epub.po"), b"x").unwrap();

        let fs = TokioFileSystem::new();
        let files = fs.list_files_with_suffix(dir.path(), ".an").await.unwrap();

        assert_eq!(files.len(), 2);
        assert!(files[0].ends_with("a.epub.an"));
        assert!(files[1].ends_with("b.epub.an"));
    }
}
