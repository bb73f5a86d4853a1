//! # Enrichment
//!
//! Fills reconciled books from the library-wide sources: the sync file,
//! cached covers and reading statistics.
//!
//! The three sources are read concurrently and each one degrades to "no
//! data" on its own. The merge then runs sequentially over the book list and
//! only ever fills fields that are still empty, so it never clobbers what the
//! annotation and position passes derived.
//!
//! ## Merge policy
//!
//! | Field | Rule |
//! |-------|------|
//! | title | replaced once by the sync book name when it is at least 3 characters, not hash-like and different; the old title moves to `previous_title` |
//! | author, description, category, favorite, added_at | filled when empty |
//! | genres, series, series number | filled when empty, from the category grammar |
//! | cover, stats | filled when empty, keyed by filename |

use crate::identity::canonical_key;
use crate::statistics::ReadingStatsSource;
use bridge_traits::storage::FileSystemAccess;
use core_library::{BookRecord, ReadingStats};
use core_metadata::naming::{file_name, filename_key, title_from_filename};
use core_metadata::{load_sync_metadata, parse_category, scan_covers, CacheLayout, SyncEntry};
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::{debug, info, instrument, warn};

/// Shortest sync book name accepted as a title
const MIN_TITLE_CHARS: usize = 3;

/// Shortest run of hex digits treated as an opaque identifier
const MIN_HASH_CHARS: usize = 16;

/// Library-wide data fetched for one enrichment pass
#[derive(Debug, Clone, Default)]
pub struct EnrichmentSources {
    pub sync_entries: Vec<SyncEntry>,
    /// Cover image by filename key
    pub covers: HashMap<String, PathBuf>,
    /// Reading statistics by book file name
    pub stats: HashMap<String, ReadingStats>,
}

/// Read the sync file, the cover directory and the statistics source
/// concurrently
///
/// Failures are logged and leave the corresponding source empty.
#[instrument(skip_all)]
pub async fn fetch_enrichment_sources(
    fs: &dyn FileSystemAccess,
    layout: &CacheLayout,
    stats_source: &dyn ReadingStatsSource,
) -> EnrichmentSources {
    let (sync_entries, covers, stats) = futures::join!(
        load_sync_metadata(fs, layout),
        scan_covers(fs, layout),
        stats_source.load_stats(layout.root()),
    );

    let sync_entries = match sync_entries {
        Ok(Some(entries)) => entries,
        Ok(None) => Vec::new(),
        Err(e) => {
            warn!(error = %e, "Failed to load sync metadata");
            Vec::new()
        }
    };

    let covers = covers.unwrap_or_else(|e| {
        warn!(error = %e, "Failed to scan covers");
        HashMap::new()
    });

    let stats = stats.unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load reading statistics");
        HashMap::new()
    });

    debug!(
        sync_entries = sync_entries.len(),
        covers = covers.len(),
        stats = stats.len(),
        "Fetched enrichment sources"
    );

    EnrichmentSources {
        sync_entries,
        covers,
        stats,
    }
}

/// Merge enrichment sources into `books`
///
/// Sync entries that match no book become new books when
/// `track_books_without_highlights` is set.
#[instrument(skip_all, fields(books = books.len()))]
pub fn enrich_books(
    books: &mut Vec<BookRecord>,
    sources: &EnrichmentSources,
    track_books_without_highlights: bool,
) {
    let mut lookup = BookLookup::new(books);
    let mut synthesized = 0usize;

    for entry in &sources.sync_entries {
        let index = match lookup.find(entry) {
            Some(index) => index,
            None if track_books_without_highlights => {
                books.push(book_from_entry(entry));
                let index = books.len() - 1;
                lookup.insert(&books[index], index);
                synthesized += 1;
                index
            }
            None => {
                debug!(file = %file_name(&entry.filename), "Sync entry matches no book");
                continue;
            }
        };
        apply_sync_entry(&mut books[index], entry);
    }

    let stats: HashMap<String, &ReadingStats> = sources
        .stats
        .iter()
        .map(|(filename, stats)| (filename_key(filename), stats))
        .collect();

    for book in books.iter_mut() {
        let key = filename_key(&book.filename);

        if book.cover.is_none() {
            book.cover = sources.covers.get(&key).cloned();
        }

        if book.stats.is_none() {
            book.stats = stats.get(&key).map(|s| (*s).clone());
        }
    }

    info!(synthesized, "Enriched books");
}

/// Whether a sync book name may replace `book.title`
pub fn accepts_title_override(book: &BookRecord, candidate: &str) -> bool {
    let candidate = candidate.trim();
    book.previous_title.is_none()
        && candidate.chars().count() >= MIN_TITLE_CHARS
        && !looks_like_hash(candidate)
        && candidate != book.title
}

/// Hex strings and UUIDs the reading app uses in place of a real name
fn looks_like_hash(name: &str) -> bool {
    let compact: Vec<char> = name.chars().filter(|c| *c != '-').collect();
    compact.len() >= MIN_HASH_CHARS && compact.iter().all(|c| c.is_ascii_hexdigit())
}

fn apply_sync_entry(book: &mut BookRecord, entry: &SyncEntry) {
    if accepts_title_override(book, &entry.book_name) {
        let title = entry.book_name.trim().to_string();
        debug!(from = %book.title, to = %title, "Using sync metadata title");
        book.previous_title = Some(std::mem::replace(&mut book.title, title));
    }

    fill_if_empty(&mut book.author, &entry.author);
    fill_if_empty(&mut book.description, &entry.description);
    fill_if_empty(&mut book.category, &entry.category);

    if book.favorite.is_none() {
        book.favorite = Some(entry.favorite);
    }
    if book.added_at.is_none() {
        book.added_at = entry.add_time;
    }

    let category = parse_category(&entry.category);
    if book.genres.is_empty() {
        book.genres = category.genres;
    }
    if book.series.is_none() {
        book.series = category.series;
        if book.series_number.is_none() {
            book.series_number = category.series_number;
        }
    }
}

fn fill_if_empty(field: &mut String, value: &str) {
    let value = value.trim();
    if field.trim().is_empty() && !value.is_empty() {
        *field = value.to_string();
    }
}

fn book_from_entry(entry: &SyncEntry) -> BookRecord {
    let filename = file_name(entry.filename.trim()).to_string();
    let name = entry.book_name.trim();
    let title = if name.is_empty() || looks_like_hash(name) {
        title_from_filename(&filename)
    } else {
        name.to_string()
    };
    BookRecord::new(title, filename)
}

/// Join indexes over the book list
struct BookLookup {
    by_filename: HashMap<String, usize>,
    by_title: HashMap<String, usize>,
}

impl BookLookup {
    fn new(books: &[BookRecord]) -> Self {
        let mut lookup = Self {
            by_filename: HashMap::new(),
            by_title: HashMap::new(),
        };
        for (index, book) in books.iter().enumerate() {
            lookup.insert(book, index);
        }
        lookup
    }

    fn insert(&mut self, book: &BookRecord, index: usize) {
        let fkey = filename_key(&book.filename);
        if !fkey.is_empty() {
            self.by_filename.entry(fkey).or_insert(index);
        }
        let tkey = canonical_key(&book.title);
        if !tkey.is_empty() {
            self.by_title.entry(tkey).or_insert(index);
        }
    }

    /// Filename first, then the canonical book name
    fn find(&self, entry: &SyncEntry) -> Option<usize> {
        self.by_filename
            .get(&filename_key(&entry.filename))
            .or_else(|| {
                let tkey = canonical_key(&entry.book_name);
                if tkey.is_empty() {
                    None
                } else {
                    self.by_title.get(&tkey)
                }
            })
            .copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(filename: &str, book_name: &str) -> SyncEntry {
        SyncEntry {
            filename: filename.to_string(),
            book_name: book_name.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_looks_like_hash() {
        assert!(looks_like_hash("0123456789abcdef"));
        assert!(looks_like_hash("550e8400-e29b-41d4-a716-446655440000"));
        assert!(!looks_like_hash("deadbeef"));
        assert!(!looks_like_hash("Dune Messiah Book"));
    }

    #[test]
    fn test_title_override_rules() {
        let book = BookRecord::new("dune_v2", "dune_v2.epub");

        assert!(accepts_title_override(&book, "Dune"));
        assert!(!accepts_title_override(&book, "Du"));
        assert!(!accepts_title_override(&book, "0123456789abcdef0123"));
        assert!(!accepts_title_override(&book, "dune_v2"));

        let mut renamed = book.clone();
        renamed.previous_title = Some("older".to_string());
        assert!(!accepts_title_override(&renamed, "Dune"));
    }

    #[test]
    fn test_sync_entry_fills_only_empty_fields() {
        let mut books = vec![BookRecord::new("dune_v2", "dune_v2.epub")];
        books[0].author = "F. Herbert".to_string();
        books[0].genres = vec!["Classic".to_string()];

        let sources = EnrichmentSources {
            sync_entries: vec![SyncEntry {
                author: "Frank Herbert".to_string(),
                description: "Desert planet".to_string(),
                category: "<Dune Saga>\n#1#\nScience Fiction".to_string(),
                add_time: Some(42),
                favorite: true,
                ..entry("/sdcard/Books/dune_v2.epub", "Dune")
            }],
            ..Default::default()
        };

        enrich_books(&mut books, &sources, false);

        let book = &books[0];
        assert_eq!(book.title, "Dune");
        assert_eq!(book.previous_title.as_deref(), Some("dune_v2"));
        assert_eq!(book.author, "F. Herbert");
        assert_eq!(book.description, "Desert planet");
        assert_eq!(book.genres, vec!["Classic"]);
        assert_eq!(book.series.as_deref(), Some("Dune Saga"));
        assert_eq!(book.series_number, Some(1.0));
        assert_eq!(book.favorite, Some(true));
        assert_eq!(book.added_at, Some(42));
    }

    #[test]
    fn test_sync_entry_keeps_existing_author_and_description() {
        let mut books = vec![BookRecord::new("Emma", "Emma.epub")];
        books[0].author = "J. Austen".to_string();
        books[0].description = "Handwritten summary".to_string();
        books[0].category = "Classics".to_string();
        books[0].favorite = Some(false);

        let sources = EnrichmentSources {
            sync_entries: vec![SyncEntry {
                author: "Jane Austen".to_string(),
                description: "A novel about youthful hubris".to_string(),
                category: "Romance".to_string(),
                favorite: true,
                ..entry("Emma.epub", "Emma")
            }],
            ..Default::default()
        };

        enrich_books(&mut books, &sources, false);

        let book = &books[0];
        assert_eq!(book.author, "J. Austen");
        assert_eq!(book.description, "Handwritten summary");
        assert_eq!(book.category, "Classics");
        assert_eq!(book.favorite, Some(false));
        assert_eq!(book.title, "Emma");
        assert!(book.previous_title.is_none());
    }

    #[test]
    fn test_second_entry_does_not_rename_again() {
        let mut books = vec![BookRecord::new("dune_v2", "dune_v2.epub")];
        let sources = EnrichmentSources {
            sync_entries: vec![entry("dune_v2.epub", "Dune"), entry("dune_v2.epub", "Dune Deluxe")],
            ..Default::default()
        };

        enrich_books(&mut books, &sources, false);
        assert_eq!(books[0].title, "Dune");
        assert_eq!(books[0].previous_title.as_deref(), Some("dune_v2"));
    }

    #[test]
    fn test_entry_matched_by_book_name() {
        let mut books = vec![BookRecord::new("Emma", "emma-1815.pdf")];
        let sources = EnrichmentSources {
            sync_entries: vec![SyncEntry {
                author: "Jane Austen".to_string(),
                ..entry("Emma (annotated).pdf", "EMMA")
            }],
            ..Default::default()
        };

        enrich_books(&mut books, &sources, false);
        assert_eq!(books.len(), 1);
        assert_eq!(books[0].author, "Jane Austen");
    }

    #[test]
    fn test_unmatched_entries_only_tracked_on_request() {
        let sources = EnrichmentSources {
            sync_entries: vec![
                entry("/sdcard/Books/Persuasion.epub", "Persuasion"),
                entry("0123456789abcdef0123.pdf", "0123456789abcdef0123"),
            ],
            ..Default::default()
        };

        let mut books = Vec::new();
        enrich_books(&mut books, &sources, false);
        assert!(books.is_empty());

        enrich_books(&mut books, &sources, true);
        assert_eq!(books.len(), 2);
        assert_eq!(books[0].title, "Persuasion");
        assert_eq!(books[0].filename, "Persuasion.epub");
        assert!(books[0].highlights.is_empty());
        assert!(books[0].position.is_none());
        assert_eq!(books[1].title, "0123456789abcdef0123");
        assert!(books[1].previous_title.is_none());
    }

    #[test]
    fn test_cover_and_stats_are_additive() {
        let mut books = vec![
            BookRecord::new("Dune", "Dune.epub"),
            BookRecord::new("Emma", "Emma.pdf"),
        ];
        books[1].cover = Some(PathBuf::from("/custom/emma.png"));

        let stats = ReadingStats {
            usage_time_ms: 60_000,
            words_read: 1_200,
            session_dates: Vec::new(),
        };
        let sources = EnrichmentSources {
            covers: HashMap::from([
                ("dune".to_string(), PathBuf::from("/sync/.Moon+/Cover/Dune.epub_2.png")),
                ("emma".to_string(), PathBuf::from("/sync/.Moon+/Cover/Emma.pdf_2.png")),
            ]),
            stats: HashMap::from([("DUNE.epub".to_string(), stats.clone())]),
            ..Default::default()
        };

        enrich_books(&mut books, &sources, false);

        assert_eq!(
            books[0].cover,
            Some(PathBuf::from("/sync/.Moon+/Cover/Dune.epub_2.png"))
        );
        assert_eq!(books[0].stats, Some(stats));
        assert_eq!(books[1].cover, Some(PathBuf::from("/custom/emma.png")));
        assert!(books[1].stats.is_none());
    }
}
