//! # Core Configuration Module
//!
//! Provides configuration management for the cache reconciliation core.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a `CoreConfig`
//! instance that holds the sync root, reconciliation options and the file
//! system bridge. It validates eagerly so a misconfigured host fails at
//! startup rather than on the first reconciliation pass.
//!
//! ## Required Settings
//!
//! - `sync_root` - The folder that contains the reading app's `.Moon+` directory
//!
//! ## Optional Dependencies (with platform defaults)
//!
//! - `FileSystemAccess` - File I/O (desktop default: tokio fs)
//!
//! When the `desktop-shims` feature is enabled, `TokioFileSystem` is injected
//! automatically if no file system is provided.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//!
//! let config = CoreConfig::builder()
//!     .sync_root("/storage/emulated/0/Books")
//!     .track_books_without_highlights(true)
//!     .build()?;
//! ```

use crate::error::{Error, Result};
use bridge_traits::FileSystemAccess;
use std::path::PathBuf;
use std::sync::Arc;

/// Default bound on concurrent file reads within one pass
pub const DEFAULT_MAX_CONCURRENT_READS: usize = 8;

/// Upper bound accepted for `max_concurrent_reads`
pub const MAX_CONCURRENT_READS_LIMIT: usize = 256;

/// Core configuration for the cache reconciliation core.
///
/// Use [`CoreConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    /// Folder that contains the `.Moon+` cache directory
    pub sync_root: PathBuf,

    /// Create records for books that have a position or sync entry but no
    /// highlights
    pub track_books_without_highlights: bool,

    /// Maximum number of cache files read and decoded concurrently
    pub max_concurrent_reads: usize,

    /// File system access abstraction
    pub file_system: Arc<dyn FileSystemAccess>,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("sync_root", &self.sync_root)
            .field(
                "track_books_without_highlights",
                &self.track_books_without_highlights,
            )
            .field("max_concurrent_reads", &self.max_concurrent_reads)
            .field("file_system", &"FileSystemAccess { ... }")
            .finish()
    }
}

impl CoreConfig {
    /// Creates a new builder for constructing a `CoreConfig`.
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    ///
    /// This checks:
    /// - Sync root is not empty
    /// - Read concurrency is within `1..=256`
    pub fn validate(&self) -> Result<()> {
        if self.sync_root.as_os_str().is_empty() {
            return Err(Error::Config("Sync root cannot be empty".to_string()));
        }

        if self.max_concurrent_reads == 0 {
            return Err(Error::Config(
                "Concurrent reads must be greater than 0".to_string(),
            ));
        }

        if self.max_concurrent_reads > MAX_CONCURRENT_READS_LIMIT {
            return Err(Error::Config(format!(
                "Concurrent reads exceed maximum of {}",
                MAX_CONCURRENT_READS_LIMIT
            )));
        }

        Ok(())
    }
}

#[cfg(feature = "desktop-shims")]
fn provide_default_file_system() -> Result<Arc<dyn FileSystemAccess>> {
    use bridge_desktop::TokioFileSystem;

    let fs: Arc<dyn FileSystemAccess> = Arc::new(TokioFileSystem::new());
    Ok(fs)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_file_system() -> Result<Arc<dyn FileSystemAccess>> {
    Err(Error::CapabilityMissing {
        capability: "FileSystemAccess".to_string(),
        message: "FileSystemAccess implementation is required to read the sync folder. \
                 Desktop: ensure the 'desktop-shims' feature is enabled to use the default TokioFileSystem. \
                 Mobile: inject a platform file bridge (scoped storage / security-scoped bookmarks)."
            .to_string(),
    })
}

/// Builder for constructing [`CoreConfig`] instances.
///
/// Call [`build()`](CoreConfigBuilder::build) to validate and create the
/// final config.
#[derive(Default)]
pub struct CoreConfigBuilder {
    sync_root: Option<PathBuf>,
    track_books_without_highlights: bool,
    max_concurrent_reads: Option<usize>,
    file_system: Option<Arc<dyn FileSystemAccess>>,
}

impl CoreConfigBuilder {
    /// Sets the sync root (required).
    ///
    /// # Examples
    ///
    /// ```
    /// use core_runtime::config::CoreConfig;
    ///
    /// let builder = CoreConfig::builder()
    ///     .sync_root("/storage/emulated/0/Books");
    /// ```
    pub fn sync_root<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.sync_root = Some(path.into());
        self
    }

    /// Track books that have no highlights.
    ///
    /// Default: false
    pub fn track_books_without_highlights(mut self, enabled: bool) -> Self {
        self.track_books_without_highlights = enabled;
        self
    }

    /// Sets the bound on concurrent file reads.
    ///
    /// Default: 8
    pub fn max_concurrent_reads(mut self, limit: usize) -> Self {
        self.max_concurrent_reads = Some(limit);
        self
    }

    /// Sets the file system access implementation.
    ///
    /// If not provided, the desktop default (tokio fs-based) will be used when
    /// the `desktop-shims` feature is enabled.
    pub fn file_system(mut self, fs: Arc<dyn FileSystemAccess>) -> Self {
        self.file_system = Some(fs);
        self
    }

    /// Builds the final `CoreConfig` instance.
    ///
    /// # Returns
    ///
    /// Returns `Ok(CoreConfig)` on success, or an error if:
    /// - The sync root is missing or empty
    /// - No file system is available
    /// - The read concurrency is out of range
    pub fn build(self) -> Result<CoreConfig> {
        let sync_root = self.sync_root.ok_or_else(|| {
            Error::Config("Sync root is required. Use .sync_root() to set it.".to_string())
        })?;

        let file_system = match self.file_system {
            Some(fs) => fs,
            None => provide_default_file_system()?,
        };

        let config = CoreConfig {
            sync_root,
            track_books_without_highlights: self.track_books_without_highlights,
            max_concurrent_reads: self
                .max_concurrent_reads
                .unwrap_or(DEFAULT_MAX_CONCURRENT_READS),
            file_system,
        };

        config.validate()?;

        Ok(config)
    }
}
