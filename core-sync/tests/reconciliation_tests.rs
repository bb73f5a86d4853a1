//! Integration tests for cache reconciliation
//!
//! These tests drive the full pipeline against an in-memory sync folder:
//! - Annotation and position passes, including identity fallbacks
//! - Position precedence by modification time
//! - Enrichment from the sync file, covers and a statistics source
//! - Degradation when parts of the cache are missing or unreadable

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result as BridgeResult},
    storage::{FileMetadata, FileSystemAccess},
};
use bytes::Bytes;
use chrono::NaiveDate;
use core_library::ReadingStats;
use core_runtime::config::CoreConfig;
use core_sync::{CacheCoordinator, ReadingStatsSource, SyncError};
use flate2::write::ZlibEncoder;
use flate2::Compression;
use mockall::mock;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

// ============================================================================
// In-memory sync folder
// ============================================================================

const ROOT: &str = "/sync";

#[derive(Default)]
struct MemoryFileSystem {
    files: Mutex<BTreeMap<PathBuf, (Vec<u8>, Option<i64>)>>,
    fail_listing: bool,
}

impl MemoryFileSystem {
    fn new() -> Self {
        Self::default()
    }

    fn failing_listing() -> Self {
        Self {
            fail_listing: true,
            ..Self::default()
        }
    }

    fn put(&self, relative: &str, data: Vec<u8>, modified_at: Option<i64>) {
        self.files
            .lock()
            .unwrap()
            .insert(Path::new(ROOT).join(relative), (data, modified_at));
    }

    fn remove(&self, relative: &str) {
        self.files.lock().unwrap().remove(&Path::new(ROOT).join(relative));
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.files
            .lock()
            .unwrap()
            .keys()
            .any(|file| file.starts_with(path) && file != path)
    }
}

#[async_trait]
impl FileSystemAccess for MemoryFileSystem {
    async fn exists(&self, path: &Path) -> BridgeResult<bool> {
        let is_file = self.files.lock().unwrap().contains_key(path);
        Ok(is_file || self.is_dir(path))
    }

    async fn metadata(&self, path: &Path) -> BridgeResult<FileMetadata> {
        if let Some((data, modified_at)) = self.files.lock().unwrap().get(path) {
            return Ok(FileMetadata {
                size: data.len() as u64,
                created_at: None,
                modified_at: *modified_at,
                is_directory: false,
            });
        }
        Err(BridgeError::NotFound(path.to_path_buf()))
    }

    async fn read_file(&self, path: &Path) -> BridgeResult<Bytes> {
        self.files
            .lock()
            .unwrap()
            .get(path)
            .map(|(data, _)| Bytes::from(data.clone()))
            .ok_or_else(|| BridgeError::NotFound(path.to_path_buf()))
    }

    async fn list_directory(&self, path: &Path) -> BridgeResult<Vec<PathBuf>> {
        if self.fail_listing {
            return Err(BridgeError::OperationFailed("permission denied".to_string()));
        }
        if !self.is_dir(path) {
            return Err(BridgeError::NotFound(path.to_path_buf()));
        }
        Ok(self
            .files
            .lock()
            .unwrap()
            .keys()
            .filter(|file| file.parent() == Some(path))
            .cloned()
            .collect())
    }
}

mock! {
    StatsSource {}

    #[async_trait]
    impl ReadingStatsSource for StatsSource {
        async fn load_stats(&self, sync_root: &Path) -> core_sync::Result<HashMap<String, ReadingStats>>;
    }
}

// ============================================================================
// Fixtures
// ============================================================================

struct Block<'a> {
    id: i64,
    title: &'a str,
    position: i64,
    timestamp: i64,
    note: &'a str,
    text: &'a str,
}

fn block<'a>(id: i64, title: &'a str, position: i64, text: &'a str) -> Block<'a> {
    Block {
        id,
        title,
        position,
        timestamp: 1_700_000_000_000 + position,
        note: "",
        text,
    }
}

fn zlib(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

fn annotation_file(blocks: &[Block<'_>]) -> Vec<u8> {
    let mut lines = vec!["annotation-header".to_string()];
    for b in blocks {
        lines.extend([
            "#".to_string(),
            b.id.to_string(),
            b.title.to_string(),
            format!("/sdcard/Books/{}.epub", b.title),
            format!("/sdcard/books/{}.epub", b.title.to_lowercase()),
            "2".to_string(),
            "0".to_string(),
            b.position.to_string(),
            "12".to_string(),
            "1".to_string(),
            b.timestamp.to_string(),
            String::new(),
        ]);
        if !b.note.is_empty() {
            lines.push(b.note.to_string());
        }
        lines.push(b.text.to_string());
        lines.extend(["0".to_string(), "0".to_string()]);
    }
    zlib(lines.join("\n").as_bytes())
}

fn position_file(chapter: i64, progress: &str) -> Vec<u8> {
    format!("1700000000000*{}@0#4096:{}%", chapter, progress).into_bytes()
}

fn coordinator(fs: Arc<MemoryFileSystem>, track: bool) -> CacheCoordinator {
    let config = CoreConfig::builder()
        .sync_root(ROOT)
        .file_system(fs)
        .track_books_without_highlights(track)
        .max_concurrent_reads(2)
        .build()
        .unwrap();
    CacheCoordinator::new(config)
}

// ============================================================================
// Reconciliation passes
// ============================================================================

#[tokio::test]
async fn test_annotation_highlights_are_decoded_and_sorted() {
    let fs = Arc::new(MemoryFileSystem::new());
    fs.put(
        ".Moon+/Cache/Dune.epub.an",
        annotation_file(&[
            block(2, "Dune", 900, "The spice must flow"),
            Block {
                note: "Litany",
                ..block(1, "Dune", 100, "Fear is the mind-killer")
            },
        ]),
        Some(1),
    );

    let books = coordinator(fs, false).reconcile().await;

    assert_eq!(books.len(), 1);
    let dune = &books[0];
    assert_eq!(dune.title, "Dune");
    assert_eq!(dune.filename, "Dune.epub");
    assert_eq!(dune.highlights.len(), 2);
    assert_eq!(dune.highlights[0].text, "Fear is the mind-killer");
    assert_eq!(dune.highlights[0].note, "Litany");
    assert_eq!(dune.highlights[1].position, 900);
}

#[tokio::test]
async fn test_newer_position_file_wins_over_higher_progress() {
    let fs = Arc::new(MemoryFileSystem::new());
    fs.put(
        ".Moon+/Cache/Dune.epub.an",
        annotation_file(&[block(1, "Dune", 100, "Fear is the mind-killer")]),
        Some(1),
    );
    // Older file with more progress
    fs.put(".Moon+/Cache/Dune.epub.po", position_file(30, "90.0"), Some(1_000));
    // Newer file, matched through the author-suffix fallback
    fs.put(
        ".Moon+/Cache/Dune - Frank Herbert.epub.po",
        position_file(8, "40.5"),
        Some(2_000),
    );

    let books = coordinator(fs, false).reconcile().await;

    assert_eq!(books.len(), 1);
    let position = books[0].position.unwrap();
    assert_eq!(position.progress, 40.5);
    assert_eq!(position.chapter, 8);
    assert_eq!(position.modified_at, Some(2_000));
}

#[tokio::test]
async fn test_position_joins_on_annotation_filename() {
    let fs = Arc::new(MemoryFileSystem::new());
    // Blocks carry a title unrelated to the file name
    fs.put(
        ".Moon+/Cache/hobbit_v3.epub.an",
        annotation_file(&[block(1, "The Hobbit", 10, "In a hole in the ground")]),
        Some(1),
    );
    fs.put(".Moon+/Cache/Hobbit_v3.epub.po", position_file(1, "12.5"), Some(5));

    let books = coordinator(fs, false).reconcile().await;

    assert_eq!(books.len(), 1);
    assert_eq!(books[0].title, "The Hobbit");
    assert_eq!(books[0].progress(), Some(12.5));
}

#[tokio::test]
async fn test_positions_without_highlights_need_tracking() {
    let fs = Arc::new(MemoryFileSystem::new());
    fs.put(".Moon+/Cache/Emma.pdf.po", position_file(4, "20"), Some(5));
    fs.put(".Moon+/Cache/broken.epub.po", b"garbage".to_vec(), Some(5));

    assert!(coordinator(fs.clone(), false).reconcile().await.is_empty());

    let books = coordinator(fs, true).reconcile().await;
    assert_eq!(books.len(), 1);
    assert_eq!(books[0].title, "Emma");
    assert_eq!(books[0].filename, "Emma.pdf");
    assert!(books[0].highlights.is_empty());
    assert_eq!(books[0].progress(), Some(20.0));
}

#[tokio::test]
async fn test_corrupt_annotation_file_is_skipped() {
    let fs = Arc::new(MemoryFileSystem::new());
    fs.put(".Moon+/Cache/Broken.epub.an", vec![0xff, 0x00, 0x13, 0x37], Some(1));
    fs.put(
        ".Moon+/Cache/Dune.epub.an",
        annotation_file(&[block(1, "Dune", 100, "Fear is the mind-killer")]),
        Some(1),
    );

    let books = coordinator(fs, false).reconcile().await;

    assert_eq!(books.len(), 1);
    assert_eq!(books[0].title, "Dune");
}

#[tokio::test]
async fn test_missing_or_unreadable_cache_yields_no_books() {
    let empty = Arc::new(MemoryFileSystem::new());
    assert!(coordinator(empty, true).snapshot().await.is_empty());

    let unreadable = Arc::new(MemoryFileSystem::failing_listing());
    unreadable.put(
        ".Moon+/Cache/Dune.epub.an",
        annotation_file(&[block(1, "Dune", 100, "Fear is the mind-killer")]),
        Some(1),
    );
    assert!(coordinator(unreadable, false).snapshot().await.is_empty());
}

#[tokio::test]
async fn test_removed_book_disappears_on_next_pass() {
    let fs = Arc::new(MemoryFileSystem::new());
    fs.put(
        ".Moon+/Cache/Dune.epub.an",
        annotation_file(&[block(1, "Dune", 100, "Fear is the mind-killer")]),
        Some(1),
    );
    fs.put(
        ".Moon+/Cache/Emma.pdf.an",
        annotation_file(&[block(1, "Emma", 50, "Handsome, clever, and rich")]),
        Some(1),
    );

    let coordinator = coordinator(fs.clone(), false);
    assert_eq!(coordinator.reconcile().await.len(), 2);

    fs.remove(".Moon+/Cache/Emma.pdf.an");
    let books = coordinator.reconcile().await;
    assert_eq!(books.len(), 1);
    assert_eq!(books[0].title, "Dune");
}

// ============================================================================
// Enrichment
// ============================================================================

fn sync_file(entries: Value) -> Vec<u8> {
    zlib(&serde_json::to_vec(&entries).unwrap())
}

#[tokio::test]
async fn test_snapshot_enriches_from_all_sources() {
    let fs = Arc::new(MemoryFileSystem::new());
    fs.put(
        ".Moon+/Cache/dune_v2.epub.an",
        annotation_file(&[block(1, "", 100, "Fear is the mind-killer")]),
        Some(1),
    );
    fs.put(
        ".Moon+/books.sync",
        sync_file(json!([
            {
                "filename": "/sdcard/Books/dune_v2.epub",
                "bookName": "Dune",
                "author": "Frank Herbert",
                "description": "Desert planet\u{1}\tepic",
                "category": "<Dune Saga>\n#1#\nScience Fiction",
                "favorite": true,
                "addTime": 1_690_000_000_000i64,
            },
            {
                "filename": "/sdcard/Books/Persuasion.epub",
                "bookName": "Persuasion",
            },
        ])),
        Some(1),
    );
    fs.put(".Moon+/Cover/dune_v2.epub_2.png", vec![0x89, b'P', b'N', b'G'], Some(1));

    let mut stats_source = MockStatsSource::new();
    stats_source
        .expect_load_stats()
        .withf(|root| root.ends_with("sync"))
        .times(1)
        .returning(|_| {
            Ok(HashMap::from([(
                "dune_v2.epub".to_string(),
                ReadingStats {
                    usage_time_ms: 3_600_000,
                    words_read: 42_000,
                    session_dates: vec![NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()],
                },
            )]))
        });

    let snapshots = coordinator(fs, false)
        .with_stats_source(Arc::new(stats_source))
        .snapshot()
        .await;

    // Persuasion has no cache files and tracking is off
    assert_eq!(snapshots.len(), 1);
    let dune = &snapshots[0].book;
    assert_eq!(dune.title, "Dune");
    assert_eq!(dune.previous_title.as_deref(), Some("dune_v2"));
    assert_eq!(dune.author, "Frank Herbert");
    assert_eq!(dune.description, "Desert planet\u{1}\tepic");
    assert_eq!(dune.series_label().as_deref(), Some("Dune Saga #1"));
    assert_eq!(dune.genres, vec!["Science Fiction"]);
    assert_eq!(dune.favorite, Some(true));
    assert_eq!(dune.added_at, Some(1_690_000_000_000));
    assert_eq!(
        dune.cover,
        Some(PathBuf::from("/sync/.Moon+/Cover/dune_v2.epub_2.png"))
    );
    assert_eq!(dune.stats.as_ref().map(|s| s.words_read), Some(42_000));
    assert!(!snapshots[0].fingerprint.is_empty());
}

#[tokio::test]
async fn test_tracked_snapshot_includes_sync_only_books_sorted_by_title() {
    let fs = Arc::new(MemoryFileSystem::new());
    fs.put(
        ".Moon+/Cache/Dune.epub.an",
        annotation_file(&[block(1, "Dune", 100, "Fear is the mind-killer")]),
        Some(1),
    );
    fs.put(
        ".Moon+/books.sync",
        sync_file(json!([
            {
                "filename": "Persuasion.epub",
                "bookName": "Persuasion",
                "author": "Jane Austen",
            },
            {
                "filename": "Anna Karenina.fb2.zip",
                "bookName": "0123456789abcdef0123",
            },
        ])),
        Some(1),
    );

    let snapshots = coordinator(fs, true).snapshot().await;

    let titles: Vec<&str> = snapshots.iter().map(|s| s.book.title.as_str()).collect();
    assert_eq!(titles, vec!["Anna Karenina", "Dune", "Persuasion"]);

    let persuasion = &snapshots[2];
    assert_eq!(persuasion.book.author, "Jane Austen");
    assert!(persuasion.book.highlights.is_empty());
    assert_eq!(persuasion.fingerprint, "");
}

#[tokio::test]
async fn test_failing_stats_source_does_not_block_other_sources() {
    let fs = Arc::new(MemoryFileSystem::new());
    fs.put(
        ".Moon+/Cache/Dune.epub.an",
        annotation_file(&[block(1, "Dune", 100, "Fear is the mind-killer")]),
        Some(1),
    );
    fs.put(".Moon+/Cover/Dune.epub_2.png", vec![1, 2, 3], Some(1));
    // Not a valid sync file
    fs.put(".Moon+/books.sync", b"\x00\x01 not deflate".to_vec(), Some(1));

    let mut stats_source = MockStatsSource::new();
    stats_source
        .expect_load_stats()
        .returning(|_| Err(SyncError::Statistics("backup archive locked".to_string())));

    let books = coordinator(fs, false)
        .with_stats_source(Arc::new(stats_source))
        .books()
        .await;

    assert_eq!(books.len(), 1);
    assert!(books[0].stats.is_none());
    assert!(books[0].author.is_empty());
    assert_eq!(
        books[0].cover,
        Some(PathBuf::from("/sync/.Moon+/Cover/Dune.epub_2.png"))
    );
}

#[tokio::test]
async fn test_fingerprint_is_stable_across_passes() {
    let fs = Arc::new(MemoryFileSystem::new());
    fs.put(
        ".Moon+/Cache/Dune.epub.an",
        annotation_file(&[
            block(1, "Dune", 100, "Fear is the mind-killer"),
            block(2, "Dune", 900, "The spice must flow"),
        ]),
        Some(1),
    );

    let coordinator = coordinator(fs.clone(), false);
    let first = coordinator.snapshot().await;
    let second = coordinator.snapshot().await;
    assert_eq!(first[0].fingerprint, second[0].fingerprint);

    // A note-only edit keeps the fingerprint
    fs.put(
        ".Moon+/Cache/Dune.epub.an",
        annotation_file(&[
            Block {
                note: "Litany against fear",
                ..block(1, "Dune", 100, "Fear is the mind-killer")
            },
            block(2, "Dune", 900, "The spice must flow"),
        ]),
        Some(2),
    );
    let edited = coordinator.snapshot().await;
    assert_eq!(edited[0].fingerprint, first[0].fingerprint);
    assert!(!edited[0].highlights_changed(&first[0].fingerprint));

    // A new highlight changes it
    fs.put(
        ".Moon+/Cache/Dune.epub.an",
        annotation_file(&[
            block(1, "Dune", 100, "Fear is the mind-killer"),
            block(2, "Dune", 900, "The spice must flow"),
            block(3, "Dune", 1500, "He who controls the spice"),
        ]),
        Some(3),
    );
    let extended = coordinator.snapshot().await;
    assert!(extended[0].highlights_changed(&first[0].fingerprint));
}
