//! # Annotation Decoder
//!
//! Decodes one compressed annotation file (`<book file>.an`) into highlights.
//!
//! ## Format
//!
//! After inflating, the file is line oriented. Header lines are skipped up to
//! the first line that is exactly `#`. Every `#` line then opens one block:
//!
//! ```text
//! #
//! 7                      id
//! Dune                   title
//! /sdcard/Books/Dune.epub
//! /sdcard/books/dune.epub   (lower-cased path, ignored)
//! 3                      chapter
//! 0                      placeholder, ignored
//! 100                    position
//! 20                     highlight length
//! 1                      colour code
//! 1700000000             timestamp
//!                        blank lines, skipped
//! Bless the Maker        optional note
//! Fear is the mind-killer  highlighted text
//! 0                      underline flag
//! 0                      strikethrough flag
//! ```
//!
//! `<BR>` inside the note or text stands for a line break.
//!
//! ## Error Handling
//!
//! Only a stream that cannot be inflated fails the file. Short or malformed
//! blocks fall back to zero/empty fields; a block without highlighted text is
//! dropped.

use crate::compression::inflate;
use crate::error::Result;
use crate::layout::ANNOTATION_SUFFIX;
use crate::naming::{file_name, strip_suffix_ignore_case, title_from_filename};
use core_library::models::{sort_highlights, Highlight, HighlightColor};
use tracing::debug;

const BLOCK_MARKER: &str = "#";
const LINE_BREAK_MARKER: &str = "<BR>";

/// Highlights decoded from one annotation file
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AnnotationFile {
    /// Book file name with the cache suffix removed (e.g. `Dune.epub`)
    pub filename: String,
    /// Title derived from the file name
    pub title: String,
    /// Highlights sorted by position
    pub highlights: Vec<Highlight>,
}

impl AnnotationFile {
    /// Title to identify the book by
    ///
    /// The title recorded inside the blocks wins over the file-name title.
    pub fn book_title(&self) -> &str {
        self.highlights
            .iter()
            .map(|h| h.title.as_str())
            .find(|title| !title.is_empty())
            .unwrap_or(&self.title)
    }
}

/// Inflate and parse one annotation file
///
/// `filename` is the cache file name, with or without the `.an` suffix.
pub fn decode_annotation_file(data: &[u8], filename: &str) -> Result<AnnotationFile> {
    let inflated = inflate(data)?;
    let text = String::from_utf8_lossy(&inflated);
    Ok(parse_annotation_text(&text, filename))
}

/// Parse already-inflated annotation text
pub fn parse_annotation_text(text: &str, filename: &str) -> AnnotationFile {
    let book_filename = strip_suffix_ignore_case(file_name(filename), ANNOTATION_SUFFIX).to_string();
    let title = title_from_filename(&book_filename);

    let mut cursor = LineCursor::new(text);
    let mut highlights = Vec::new();
    let mut dropped = 0usize;

    if cursor.skip_header() {
        while cursor.enter_block() {
            match cursor.read_block() {
                Some(highlight) => highlights.push(highlight),
                None => dropped += 1,
            }
        }
    }

    if dropped > 0 {
        debug!(file = %book_filename, dropped, "Dropped annotation blocks without text");
    }

    sort_highlights(&mut highlights);

    AnnotationFile {
        filename: book_filename,
        title,
        highlights,
    }
}

/// Fixed leading fields of one block
#[derive(Debug, Default, PartialEq)]
struct FixedFields {
    id: i64,
    title: String,
    path: String,
    chapter: i64,
    position: i64,
    length: i64,
    color: i64,
    timestamp: i64,
}

/// Note and text of one block, before `<BR>` expansion
#[derive(Debug, Default, PartialEq)]
struct BlockBody<'a> {
    note: &'a str,
    text: &'a str,
}

#[derive(Debug, Default, PartialEq)]
struct TrailerFlags {
    underline: bool,
    strikethrough: bool,
}

/// Cursor over the lines of an inflated annotation file
///
/// No step ever consumes a `#` line except [`LineCursor::enter_block`], so a
/// short block can never swallow the next one.
struct LineCursor<'a> {
    lines: Vec<&'a str>,
    pos: usize,
}

impl<'a> LineCursor<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            lines: text.split('\n').map(|l| l.trim_end_matches('\r')).collect(),
            pos: 0,
        }
    }

    fn peek_at(&self, offset: usize) -> Option<&'a str> {
        self.lines.get(self.pos + offset).copied()
    }

    fn peek(&self) -> Option<&'a str> {
        self.peek_at(0)
    }

    /// Next line inside the current block, `None` at a block marker or EOF
    fn next_in_block(&mut self) -> Option<&'a str> {
        match self.peek() {
            Some(line) if line != BLOCK_MARKER => {
                self.pos += 1;
                Some(line)
            }
            _ => None,
        }
    }

    /// Skip header lines; true when a block marker was reached
    fn skip_header(&mut self) -> bool {
        while let Some(line) = self.peek() {
            if line == BLOCK_MARKER {
                return true;
            }
            self.pos += 1;
        }
        false
    }

    /// Consume a block marker; false at EOF
    fn enter_block(&mut self) -> bool {
        if self.peek() == Some(BLOCK_MARKER) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn read_block(&mut self) -> Option<Highlight> {
        let fields = self.read_fixed_fields();
        self.skip_blank();
        let body = self.read_text_or_note();
        let flags = self.skip_trailer();

        let text = expand_line_breaks(body.text);
        if text.is_empty() {
            return None;
        }

        Some(Highlight {
            id: fields.id,
            title: fields.title,
            path: fields.path,
            chapter: fields.chapter,
            position: fields.position,
            length: fields.length,
            color: HighlightColor::from_code(fields.color),
            timestamp: fields.timestamp,
            note: expand_line_breaks(body.note),
            text,
            underline: flags.underline,
            strikethrough: flags.strikethrough,
        })
    }

    fn read_fixed_fields(&mut self) -> FixedFields {
        let id = parse_int(self.next_in_block());
        let title = self.next_in_block().unwrap_or_default().trim().to_string();
        let path = self.next_in_block().unwrap_or_default().trim().to_string();
        let _lower_path = self.next_in_block();
        let chapter = parse_int(self.next_in_block());
        let _placeholder = self.next_in_block();
        let position = parse_int(self.next_in_block());
        let length = parse_int(self.next_in_block());
        let color = parse_int(self.next_in_block());
        let timestamp = parse_int(self.next_in_block());

        FixedFields {
            id,
            title,
            path,
            chapter,
            position,
            length,
            color,
            timestamp,
        }
    }

    fn skip_blank(&mut self) {
        while matches!(self.peek(), Some(line) if line.trim().is_empty()) {
            self.pos += 1;
        }
    }

    /// Read `[note] text`
    ///
    /// The first line is the text unless it is followed by another content
    /// line, in which case it is the note and the second line is the text.
    fn read_text_or_note(&mut self) -> BlockBody<'a> {
        let first = match self.peek() {
            Some(line) if line != BLOCK_MARKER && line.trim() != "0" => line,
            _ => return BlockBody::default(),
        };
        self.pos += 1;

        match self.peek() {
            Some(second) if is_content_line(second) => {
                self.pos += 1;
                BlockBody {
                    note: first,
                    text: second,
                }
            }
            _ => BlockBody {
                note: "",
                text: first,
            },
        }
    }

    /// Consume everything up to the next block, picking up the two flags
    fn skip_trailer(&mut self) -> TrailerFlags {
        let mut flag_values = Vec::with_capacity(2);
        while let Some(line) = self.next_in_block() {
            match line.trim() {
                "0" if flag_values.len() < 2 => flag_values.push(false),
                "1" if flag_values.len() < 2 => flag_values.push(true),
                _ => {}
            }
        }

        TrailerFlags {
            underline: flag_values.first().copied().unwrap_or(false),
            strikethrough: flag_values.get(1).copied().unwrap_or(false),
        }
    }
}

/// Whether `line` after the first body line makes that line a note
///
/// Anything other than `0` or an empty line counts, so a lone `1` there is
/// the highlighted text. Flags are only read from the trailer after it.
fn is_content_line(line: &str) -> bool {
    let line = line.trim();
    !(line.is_empty() || line == "0" || line == BLOCK_MARKER)
}

fn parse_int(line: Option<&str>) -> i64 {
    line.and_then(|l| l.trim().parse().ok()).unwrap_or(0)
}

fn expand_line_breaks(field: &str) -> String {
    field.replace(LINE_BREAK_MARKER, "\n").trim().to_string()
}
