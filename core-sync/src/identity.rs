//! # Identity Resolver
//!
//! Maps the inconsistent titles and filenames used by different cache
//! artifacts onto one canonical book identity.
//!
//! Annotation files establish identities, keyed by the canonical form of the
//! book title. Every later source only has a filename to go on, so it is
//! matched through an ordered cascade of [`IdentityMatcher`] strategies; the
//! first strategy that finds a known book wins.
//!
//! | Strategy | Looks up |
//! |----------|----------|
//! | [`ExactKeyMatcher`] | canonical key of the filename-derived title |
//! | [`FilenameIndexMatcher`] | normalized filename of an annotation file |
//! | [`AuthorSuffixMatcher`] | title with a trailing ` - Author` removed |

use core_library::BookRecord;
use core_metadata::naming::{filename_key, title_from_filename};
use std::collections::{BTreeMap, HashMap};

/// Normalize a title for identity comparison
///
/// Lower-cases, keeps only ASCII letters, digits and spaces, collapses runs of
/// whitespace and trims. `"Frankenstein; Or, The Modern Prometheus"` and
/// `"Frankenstein Or The Modern Prometheus"` share one key.
pub fn canonical_key(title: &str) -> String {
    let mut cleaned = String::with_capacity(title.len());
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            cleaned.push(c.to_ascii_lowercase());
        } else if c.is_whitespace() {
            cleaned.push(' ');
        }
    }
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Identity key for a book known by `title` and source `filename`
///
/// Titles without any ASCII letter or digit (CJK titles, for one) fall back
/// to the filename key so they do not all collapse onto the empty key.
pub fn identity_key(title: &str, filename: &str) -> String {
    let key = canonical_key(title);
    if key.is_empty() {
        filename_key(filename)
    } else {
        key
    }
}

/// In-progress book map plus the filename lookup index
#[derive(Debug, Default)]
pub struct IdentityIndex {
    books: BTreeMap<String, BookRecord>,
    filenames: HashMap<String, String>,
}

impl IdentityIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.books.len()
    }

    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.books.contains_key(key)
    }

    pub fn book(&self, key: &str) -> Option<&BookRecord> {
        self.books.get(key)
    }

    pub fn book_mut(&mut self, key: &str) -> Option<&mut BookRecord> {
        self.books.get_mut(key)
    }

    /// Book for `key`, created with `create` when missing
    pub fn entry_or_insert_with(
        &mut self,
        key: &str,
        create: impl FnOnce() -> BookRecord,
    ) -> &mut BookRecord {
        self.books.entry(key.to_string()).or_insert_with(create)
    }

    /// Remember that files named `filename` belong to the book at `key`
    ///
    /// The first mapping for a filename wins.
    pub fn index_filename(&mut self, filename: &str, key: &str) {
        let fkey = filename_key(filename);
        if !fkey.is_empty() {
            self.filenames.entry(fkey).or_insert_with(|| key.to_string());
        }
    }

    /// Book key recorded for a filename, if any
    pub fn key_for_filename(&self, filename: &str) -> Option<&str> {
        self.filenames.get(&filename_key(filename)).map(String::as_str)
    }

    /// All books, ordered by identity key
    pub fn into_books(self) -> Vec<BookRecord> {
        self.books.into_values().collect()
    }
}

/// One strategy for matching a source filename to a known book
pub trait IdentityMatcher: Send + Sync {
    /// Short name used in diagnostics
    fn name(&self) -> &'static str;

    /// Key of the known book `filename` belongs to
    fn find(&self, filename: &str, index: &IdentityIndex) -> Option<String>;
}

/// Canonical key of the filename-derived title
#[derive(Debug, Clone, Copy, Default)]
pub struct ExactKeyMatcher;

impl IdentityMatcher for ExactKeyMatcher {
    fn name(&self) -> &'static str {
        "exact_key"
    }

    fn find(&self, filename: &str, index: &IdentityIndex) -> Option<String> {
        let key = identity_key(&title_from_filename(filename), filename);
        index.contains_key(&key).then_some(key)
    }
}

/// Filename recorded by the annotation pass
///
/// Catches books whose annotation blocks carry a title that differs from the
/// file name.
#[derive(Debug, Clone, Copy, Default)]
pub struct FilenameIndexMatcher;

impl IdentityMatcher for FilenameIndexMatcher {
    fn name(&self) -> &'static str {
        "filename_index"
    }

    fn find(&self, filename: &str, index: &IdentityIndex) -> Option<String> {
        index
            .key_for_filename(filename)
            .filter(|key| index.contains_key(key))
            .map(str::to_string)
    }
}

/// Title portion of a `Title - Author` file name
#[derive(Debug, Clone, Copy, Default)]
pub struct AuthorSuffixMatcher;

impl IdentityMatcher for AuthorSuffixMatcher {
    fn name(&self) -> &'static str {
        "author_suffix"
    }

    fn find(&self, filename: &str, index: &IdentityIndex) -> Option<String> {
        let title = title_from_filename(filename);
        let (head, _author) = title.split_once(" - ")?;
        let key = canonical_key(head);
        (!key.is_empty() && index.contains_key(&key)).then_some(key)
    }
}

/// Ordered cascade of matchers; the first hit wins
pub struct IdentityResolver {
    matchers: Vec<Box<dyn IdentityMatcher>>,
}

impl Default for IdentityResolver {
    fn default() -> Self {
        Self::new(vec![
            Box::new(ExactKeyMatcher),
            Box::new(FilenameIndexMatcher),
            Box::new(AuthorSuffixMatcher),
        ])
    }
}

impl std::fmt::Debug for IdentityResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.matchers.iter().map(|m| m.name()))
            .finish()
    }
}

impl IdentityResolver {
    pub fn new(matchers: Vec<Box<dyn IdentityMatcher>>) -> Self {
        Self { matchers }
    }

    /// Append a fallback strategy after the existing ones
    pub fn with_matcher(mut self, matcher: Box<dyn IdentityMatcher>) -> Self {
        self.matchers.push(matcher);
        self
    }

    /// Resolve a source filename to a known book key
    ///
    /// Returns the key together with the name of the matcher that found it.
    pub fn resolve(&self, filename: &str, index: &IdentityIndex) -> Option<(String, &'static str)> {
        self.matchers
            .iter()
            .find_map(|matcher| matcher.find(filename, index).map(|key| (key, matcher.name())))
    }
}
