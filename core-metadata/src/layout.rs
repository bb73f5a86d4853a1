//! On-disk layout of the reading app's synced cache folder.

use std::path::{Path, PathBuf};

pub const APP_DIR: &str = ".Moon+";
pub const CACHE_DIR: &str = "Cache";
pub const COVER_DIR: &str = "Cover";
pub const SYNC_FILE: &str = "books.sync";

pub const ANNOTATION_SUFFIX: &str = ".an";
pub const POSITION_SUFFIX: &str = ".po";
pub const COVER_SUFFIX: &str = "_2.png";

/// Paths of every cache artifact under one sync root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheLayout {
    root: PathBuf,
}

impl CacheLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn app_dir(&self) -> PathBuf {
        self.root.join(APP_DIR)
    }

    /// Directory holding `*.an` annotation and `*.po` position files
    pub fn cache_dir(&self) -> PathBuf {
        self.app_dir().join(CACHE_DIR)
    }

    pub fn sync_file(&self) -> PathBuf {
        self.app_dir().join(SYNC_FILE)
    }

    pub fn cover_dir(&self) -> PathBuf {
        self.app_dir().join(COVER_DIR)
    }
}
