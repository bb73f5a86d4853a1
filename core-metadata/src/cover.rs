//! Cached cover images
//!
//! The reading app keeps a thumbnail per book under `.Moon+/Cover`, named
//! after the book file with a `_2.png` suffix (`Dune.epub_2.png`).

use crate::error::Result;
use crate::layout::{CacheLayout, COVER_SUFFIX};
use crate::naming::{filename_key, path_file_name, strip_suffix_ignore_case};
use bridge_traits::storage::FileSystemAccess;
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::debug;

/// Map every cached cover to its book's filename key
///
/// A missing cover directory yields an empty map.
pub async fn scan_covers(
    fs: &dyn FileSystemAccess,
    layout: &CacheLayout,
) -> Result<HashMap<String, PathBuf>> {
    let dir = layout.cover_dir();

    if !fs.exists(&dir).await? {
        debug!("No cover directory present");
        return Ok(HashMap::new());
    }

    let files = match fs.list_files_with_suffix(&dir, COVER_SUFFIX).await {
        Ok(files) => files,
        Err(e) if e.is_not_found() => return Ok(HashMap::new()),
        Err(e) => return Err(e.into()),
    };

    let mut covers = HashMap::with_capacity(files.len());
    for path in files {
        let name = path_file_name(&path);
        let key = filename_key(strip_suffix_ignore_case(&name, COVER_SUFFIX));
        if key.is_empty() {
            continue;
        }
        covers.entry(key).or_insert(path);
    }

    debug!(count = covers.len(), "Scanned cover images");
    Ok(covers)
}
