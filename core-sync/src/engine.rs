//! # Reconciliation Engine
//!
//! Rebuilds the book map from the current state of the cache folder.
//!
//! ## Workflow
//!
//! 1. List `.Moon+/Cache`; an unreadable or missing directory yields no books
//! 2. **Annotation pass**: decode every `*.an` file, key books by canonical
//!    title, merge highlights and index annotation filenames
//! 3. **Position pass**: decode every `*.po` file, resolve it through the
//!    [`IdentityResolver`] and offer the position to the book
//!
//! The annotation pass fully precedes the position pass. Within a pass, files
//! are read and decoded concurrently but merged one by one in file-name
//! order, so the result does not depend on I/O timing.
//!
//! Every pass starts from an empty map: a book removed from the cache simply
//! stops appearing in the output.

use crate::identity::{identity_key, IdentityIndex, IdentityResolver};
use bridge_traits::storage::FileSystemAccess;
use core_library::{BookRecord, ReadingPosition};
use core_metadata::layout::{CacheLayout, ANNOTATION_SUFFIX, POSITION_SUFFIX};
use core_metadata::naming::{path_file_name, strip_suffix_ignore_case, title_from_filename};
use core_metadata::{decode_annotation_file, decode_position, AnnotationFile};
use core_runtime::config::DEFAULT_MAX_CONCURRENT_READS;
use futures::stream::{self, StreamExt};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Cache files found in one listing, sorted by name
#[derive(Debug, Default)]
struct CacheListing {
    annotations: Vec<PathBuf>,
    positions: Vec<PathBuf>,
}

/// Decoded position file
#[derive(Debug)]
struct PositionFile {
    /// Book file name with `.po` removed
    filename: String,
    position: ReadingPosition,
}

/// Reconciles one cache snapshot into book records
pub struct ReconciliationEngine {
    file_system: Arc<dyn FileSystemAccess>,
    resolver: IdentityResolver,
    max_concurrent_reads: usize,
}

impl ReconciliationEngine {
    pub fn new(file_system: Arc<dyn FileSystemAccess>) -> Self {
        Self {
            file_system,
            resolver: IdentityResolver::default(),
            max_concurrent_reads: DEFAULT_MAX_CONCURRENT_READS,
        }
    }

    /// Replace the matcher cascade used by the position pass
    pub fn with_resolver(mut self, resolver: IdentityResolver) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn with_max_concurrent_reads(mut self, limit: usize) -> Self {
        self.max_concurrent_reads = limit.max(1);
        self
    }

    /// Produce every book known to the cache under `root`
    ///
    /// Books are ordered by identity key and carry highlights sorted by
    /// position. Positions never create books unless
    /// `track_books_without_highlights` is set.
    #[instrument(skip(self, root), fields(root = %root.display()))]
    pub async fn reconcile(&self, root: &Path, track_books_without_highlights: bool) -> Vec<BookRecord> {
        let layout = CacheLayout::new(root);
        let listing = self.list_cache(&layout).await;

        let mut index = IdentityIndex::new();
        self.annotation_pass(&mut index, &listing.annotations, track_books_without_highlights)
            .await;
        self.position_pass(&mut index, &listing.positions, track_books_without_highlights)
            .await;

        info!(books = index.len(), "Reconciled cache");
        index.into_books()
    }

    async fn list_cache(&self, layout: &CacheLayout) -> CacheListing {
        let dir = layout.cache_dir();

        match self.file_system.exists(&dir).await {
            Ok(true) => {}
            Ok(false) => {
                debug!("No cache directory present");
                return CacheListing::default();
            }
            Err(e) => {
                warn!(error = %e, "Failed to check cache directory");
                return CacheListing::default();
            }
        }

        let entries = match self.file_system.list_directory(&dir).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!(error = %e, "Failed to list cache directory");
                return CacheListing::default();
            }
        };

        let mut listing = CacheListing::default();
        for path in entries {
            let name = path_file_name(&path).to_lowercase();
            if name.ends_with(ANNOTATION_SUFFIX) {
                listing.annotations.push(path);
            } else if name.ends_with(POSITION_SUFFIX) {
                listing.positions.push(path);
            }
        }
        listing.annotations.sort();
        listing.positions.sort();

        debug!(
            annotations = listing.annotations.len(),
            positions = listing.positions.len(),
            "Listed cache directory"
        );
        listing
    }

    #[instrument(skip_all, fields(files = paths.len()))]
    async fn annotation_pass(&self, index: &mut IdentityIndex, paths: &[PathBuf], track: bool) {
        let fs = self.file_system.as_ref();
        let decoded: Vec<Option<AnnotationFile>> = stream::iter(paths.iter().cloned())
            .map(|path| load_annotation(fs, path))
            .buffered(self.max_concurrent_reads)
            .collect()
            .await;

        for file in decoded.into_iter().flatten() {
            merge_annotation(index, file, track);
        }
    }

    #[instrument(skip_all, fields(files = paths.len()))]
    async fn position_pass(&self, index: &mut IdentityIndex, paths: &[PathBuf], track: bool) {
        let fs = self.file_system.as_ref();
        let decoded: Vec<Option<PositionFile>> = stream::iter(paths.iter().cloned())
            .map(|path| load_position(fs, path))
            .buffered(self.max_concurrent_reads)
            .collect()
            .await;

        for file in decoded.into_iter().flatten() {
            self.merge_position(index, file, track);
        }
    }

    fn merge_position(&self, index: &mut IdentityIndex, file: PositionFile, track: bool) {
        let key = match self.resolver.resolve(&file.filename, index) {
            Some((key, matcher)) => {
                debug!(file = %file.filename, matcher, "Matched position file");
                key
            }
            None if track => {
                let title = title_from_filename(&file.filename);
                let key = identity_key(&title, &file.filename);
                if key.is_empty() {
                    debug!(file = %file.filename, "Skipping position file without a usable name");
                    return;
                }
                index.entry_or_insert_with(&key, || BookRecord::new(title, file.filename.clone()));
                index.index_filename(&file.filename, &key);
                key
            }
            None => {
                debug!(file = %file.filename, "No book for position file");
                return;
            }
        };

        if let Some(book) = index.book_mut(&key) {
            if !book.offer_position(file.position) {
                debug!(file = %file.filename, "Kept more recent position");
            }
        }
    }
}

fn merge_annotation(index: &mut IdentityIndex, file: AnnotationFile, track: bool) {
    if file.highlights.is_empty() && !track {
        debug!(file = %file.filename, "Annotation file has no highlights");
        return;
    }

    let title = file.book_title().to_string();
    let key = identity_key(&title, &file.filename);
    if key.is_empty() {
        debug!(file = %file.filename, "Skipping annotation file without a usable title");
        return;
    }

    let book = index.entry_or_insert_with(&key, || BookRecord::new(title, file.filename.clone()));
    book.add_highlights(file.highlights);
    index.index_filename(&file.filename, &key);
}

async fn load_annotation(fs: &dyn FileSystemAccess, path: PathBuf) -> Option<AnnotationFile> {
    let name = path_file_name(&path);

    let data = match fs.read_file(&path).await {
        Ok(data) => data,
        Err(e) => {
            warn!(file = %name, error = %e, "Failed to read annotation file");
            return None;
        }
    };

    match decode_annotation_file(&data, &name) {
        Ok(file) => Some(file),
        Err(e) => {
            warn!(file = %name, error = %e, "Skipping undecodable annotation file");
            None
        }
    }
}

async fn load_position(fs: &dyn FileSystemAccess, path: PathBuf) -> Option<PositionFile> {
    let name = path_file_name(&path);

    let data = match fs.read_file(&path).await {
        Ok(data) => data,
        Err(e) => {
            warn!(file = %name, error = %e, "Failed to read position file");
            return None;
        }
    };

    let Some(mut position) = decode_position(&data) else {
        debug!(file = %name, "Position file does not hold a position record");
        return None;
    };

    position.modified_at = match fs.metadata(&path).await {
        Ok(meta) => meta.modified_at,
        Err(e) => {
            debug!(file = %name, error = %e, "No modification time for position file");
            None
        }
    };

    Some(PositionFile {
        filename: strip_suffix_ignore_case(&name, POSITION_SUFFIX).to_string(),
        position,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_library::Highlight;

    fn annotation(filename: &str, block_title: &str, positions: &[i64]) -> AnnotationFile {
        AnnotationFile {
            filename: filename.to_string(),
            title: title_from_filename(filename),
            highlights: positions
                .iter()
                .map(|&position| Highlight {
                    id: position,
                    title: block_title.to_string(),
                    position,
                    text: format!("text at {}", position),
                    ..Default::default()
                })
                .collect(),
        }
    }

    #[test]
    fn test_annotation_files_for_same_title_merge() {
        let mut index = IdentityIndex::new();
        merge_annotation(&mut index, annotation("Dune.epub", "Dune", &[300, 100]), false);
        merge_annotation(&mut index, annotation("dune (1).epub", "DUNE", &[200, 100]), false);

        assert_eq!(index.len(), 1);
        let book = index.book("dune").unwrap();
        assert_eq!(book.filename, "Dune.epub");
        let positions: Vec<i64> = book.highlights.iter().map(|h| h.position).collect();
        assert_eq!(positions, vec![100, 200, 300]);

        // Both annotation filenames resolve to the merged book
        assert_eq!(index.key_for_filename("dune (1).epub"), Some("dune"));
    }

    #[test]
    fn test_empty_annotation_file_only_tracked_on_request() {
        let mut index = IdentityIndex::new();
        merge_annotation(&mut index, annotation("Emma.pdf", "", &[]), false);
        assert!(index.is_empty());

        merge_annotation(&mut index, annotation("Emma.pdf", "", &[]), true);
        assert_eq!(index.book("emma").map(|b| b.title.as_str()), Some("Emma"));
    }

    #[test]
    fn test_block_title_wins_over_filename() {
        let mut index = IdentityIndex::new();
        merge_annotation(&mut index, annotation("hobbit.epub", "The Hobbit", &[1]), false);

        let book = index.book("the hobbit").unwrap();
        assert_eq!(book.title, "The Hobbit");
        assert_eq!(book.filename, "hobbit.epub");
    }
}
