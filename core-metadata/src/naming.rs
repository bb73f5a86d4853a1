//! Book file naming helpers
//!
//! Every cache artifact names its book by the original book file name with a
//! cache-specific suffix appended (`Dune.epub.an`, `Dune.epub.po`,
//! `Dune.epub_2.png`). These helpers peel those layers off consistently.

use std::path::Path;
use unicode_normalization::UnicodeNormalization;

/// Known e-book extensions, compound ones first so `fb2.zip` wins over `zip`
pub const EBOOK_EXTENSIONS: &[&str] = &[
    "fb2.zip", "epub", "pdf", "mobi", "azw3", "azw", "kf8", "fb2", "txt", "umd", "cbz", "cbr",
    "chm", "djvu", "docx", "doc", "rtf", "html", "htm", "odt", "zip",
];

/// Final path component as a string, or the input itself
pub fn file_name(path: &str) -> &str {
    path.rsplit(|c: char| c == '/' || c == '\\').next().unwrap_or(path)
}

/// Last component of a path, lossily converted
pub fn path_file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Strip a case-insensitive suffix such as `.an` or `_2.png`
pub fn strip_suffix_ignore_case<'a>(name: &'a str, suffix: &str) -> &'a str {
    if name.len() >= suffix.len() {
        let split = name.len() - suffix.len();
        if name.is_char_boundary(split) && name[split..].eq_ignore_ascii_case(suffix) {
            return &name[..split];
        }
    }
    name
}

/// Strip one known e-book extension, if present
pub fn strip_ebook_extension(name: &str) -> &str {
    for ext in EBOOK_EXTENSIONS {
        let stripped = strip_suffix_ignore_case(name, ext);
        if stripped.len() < name.len() {
            if let Some(base) = stripped.strip_suffix('.') {
                if !base.is_empty() {
                    return base;
                }
            }
        }
    }
    name
}

/// Human title derived from a book file name (`Dune.epub` -> `Dune`)
pub fn title_from_filename(name: &str) -> String {
    strip_ebook_extension(file_name(name)).trim().to_string()
}

/// Filename join key: base name, e-book extension stripped, lower-cased,
/// NFC-normalized
pub fn filename_key(name: &str) -> String {
    strip_ebook_extension(file_name(name).trim())
        .trim()
        .to_lowercase()
        .nfc()
        .collect()
}
