//! Domain models for the reading library
//!
//! These are the records the reconciliation engine produces and the external
//! note writer consumes. All of them are plain data and serialize with serde.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

// =============================================================================
// Highlights
// =============================================================================

/// Highlight colour as encoded by the reading app
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HighlightColor {
    #[default]
    Default,
    Yellow,
    Blue,
    Red,
    Green,
    /// Any code outside the known palette, kept verbatim
    Other(i64),
}

impl HighlightColor {
    pub fn from_code(code: i64) -> Self {
        match code {
            0 => Self::Default,
            1 => Self::Yellow,
            2 => Self::Blue,
            3 => Self::Red,
            4 => Self::Green,
            other => Self::Other(other),
        }
    }

    pub fn code(&self) -> i64 {
        match self {
            Self::Default => 0,
            Self::Yellow => 1,
            Self::Blue => 2,
            Self::Red => 3,
            Self::Green => 4,
            Self::Other(code) => *code,
        }
    }
}

impl fmt::Display for HighlightColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => write!(f, "default"),
            Self::Yellow => write!(f, "yellow"),
            Self::Blue => write!(f, "blue"),
            Self::Red => write!(f, "red"),
            Self::Green => write!(f, "green"),
            Self::Other(code) => write!(f, "color-{}", code),
        }
    }
}

/// One user annotation decoded from an annotation file
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Highlight {
    /// Identifier assigned by the reading app
    pub id: i64,
    /// Book title as recorded inside the annotation block
    pub title: String,
    /// Source path of the book file on the device
    pub path: String,
    pub chapter: i64,
    /// Character position within the book; the primary sort key
    pub position: i64,
    /// Highlighted span length in characters
    pub length: i64,
    pub color: HighlightColor,
    /// Creation time in epoch milliseconds
    pub timestamp: i64,
    /// User note, empty when the highlight has none
    pub note: String,
    /// Highlighted text, never empty for an emitted highlight
    pub text: String,
    pub underline: bool,
    pub strikethrough: bool,
}

impl Highlight {
    /// Length of the highlighted text in UTF-16 code units
    ///
    /// This is the length the reading app itself reports for text, so it is
    /// what change detection compares.
    pub fn text_len(&self) -> usize {
        self.text.encode_utf16().count()
    }

    fn is_same_annotation(&self, other: &Highlight) -> bool {
        self.id == other.id && self.position == other.position && self.timestamp == other.timestamp
    }
}

/// Sort highlights by position ascending
///
/// Timestamp and text length break ties so equal positions still get one
/// deterministic order.
pub fn sort_highlights(highlights: &mut [Highlight]) {
    highlights.sort_by(|a, b| {
        a.position
            .cmp(&b.position)
            .then(a.timestamp.cmp(&b.timestamp))
            .then(a.text_len().cmp(&b.text_len()))
    });
}

// =============================================================================
// Reading progress
// =============================================================================

/// Reading position decoded from a position file
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ReadingPosition {
    /// Progress percentage, 0-100
    pub progress: f64,
    pub chapter: i64,
    /// Timestamp recorded by the reading app
    pub timestamp: i64,
    /// Modification time of the backing file in epoch milliseconds
    pub modified_at: Option<i64>,
}

impl ReadingPosition {
    /// Whether `self` should replace `current` as a book's effective position
    ///
    /// The more recently modified file wins; equal modification times fall
    /// back to the higher progress value.
    pub fn supersedes(&self, current: &ReadingPosition) -> bool {
        let mine = self.modified_at.unwrap_or(i64::MIN);
        let theirs = current.modified_at.unwrap_or(i64::MIN);
        match mine.cmp(&theirs) {
            std::cmp::Ordering::Greater => true,
            std::cmp::Ordering::Less => false,
            std::cmp::Ordering::Equal => self.progress > current.progress,
        }
    }
}

/// Reading statistics supplied by the backup reader
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReadingStats {
    /// Total reading time in milliseconds
    pub usage_time_ms: i64,
    pub words_read: i64,
    /// Days with at least one reading session, ascending
    pub session_dates: Vec<NaiveDate>,
}

// =============================================================================
// Book record
// =============================================================================

/// Canonical per-book record produced by one reconciliation pass
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BookRecord {
    /// Display title; may be replaced once by sync metadata
    pub title: String,
    /// Source file name without the cache suffix (e.g. `Dune.epub`)
    pub filename: String,
    /// Title before a sync-metadata override
    pub previous_title: Option<String>,

    pub author: String,
    pub description: String,
    /// Raw category string from sync metadata
    pub category: String,
    pub genres: Vec<String>,
    pub series: Option<String>,
    pub series_number: Option<f64>,
    pub favorite: Option<bool>,
    /// Epoch milliseconds the book was added to the library
    pub added_at: Option<i64>,

    /// Locally cached cover image
    pub cover: Option<PathBuf>,
    pub stats: Option<ReadingStats>,

    /// Highlights sorted by position ascending
    pub highlights: Vec<Highlight>,
    pub position: Option<ReadingPosition>,

    // Reserved for the remote enrichment collaborator; never set here.
    pub publisher: Option<String>,
    pub page_count: Option<u32>,
    pub isbn10: Option<String>,
    pub isbn13: Option<String>,
    pub language: Option<String>,
    pub published_date: Option<String>,
}

impl BookRecord {
    pub fn new(title: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            filename: filename.into(),
            ..Default::default()
        }
    }

    /// Add highlights, skipping ones already present, and keep them sorted
    ///
    /// A highlight is already present when one with the same id, position and
    /// timestamp exists.
    pub fn add_highlights(&mut self, highlights: impl IntoIterator<Item = Highlight>) {
        for highlight in highlights {
            if self.highlights.iter().any(|h| h.is_same_annotation(&highlight)) {
                continue;
            }
            self.highlights.push(highlight);
        }
        sort_highlights(&mut self.highlights);
    }

    /// Replace the effective position if `candidate` supersedes it
    ///
    /// Returns whether the candidate was applied.
    pub fn offer_position(&mut self, candidate: ReadingPosition) -> bool {
        match &self.position {
            Some(current) if !candidate.supersedes(current) => false,
            _ => {
                self.position = Some(candidate);
                true
            }
        }
    }

    pub fn progress(&self) -> Option<f64> {
        self.position.map(|p| p.progress)
    }

    /// Series name with its number, e.g. `Dune Saga #2`
    pub fn series_label(&self) -> Option<String> {
        let series = self.series.as_ref()?;
        Some(match self.series_number {
            Some(n) if n.fract() == 0.0 => format!("{} #{}", series, n as i64),
            Some(n) => format!("{} #{}", series, n),
            None => series.clone(),
        })
    }
}
