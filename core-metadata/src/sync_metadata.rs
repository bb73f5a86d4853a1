//! # Sync-Metadata Decoder
//!
//! Decodes the library-wide `books.sync` file: a DEFLATE-compressed JSON array
//! with one entry per book file. A missing file is normal (the reading app
//! only writes it after its first cloud sync) and decodes to "no data".
//!
//! The `category` field of each entry is a small line grammar of its own,
//! decoded by [`parse_category`]:
//!
//! ```text
//! <Dune Saga>        series name
//! #2.0#              number within the series
//! Science Fiction    genre
//! Adventure          genre
//! ```

use crate::compression::inflate;
use crate::error::{MetadataError, Result};
use crate::layout::CacheLayout;
use bridge_traits::storage::FileSystemAccess;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

/// One book entry from the sync file
///
/// Scalars are accepted as strings, numbers or booleans; missing fields take
/// their defaults.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct SyncEntry {
    #[serde(alias = "fileName", alias = "file", deserialize_with = "lenient::string")]
    pub filename: String,
    #[serde(rename = "bookName", alias = "book_name", alias = "book", deserialize_with = "lenient::string")]
    pub book_name: String,
    #[serde(deserialize_with = "lenient::string")]
    pub author: String,
    #[serde(alias = "desc", deserialize_with = "lenient::string")]
    pub description: String,
    #[serde(deserialize_with = "lenient::string")]
    pub category: String,
    /// Epoch milliseconds the book was added
    #[serde(rename = "addTime", alias = "add_time", deserialize_with = "lenient::opt_i64")]
    pub add_time: Option<i64>,
    #[serde(alias = "favorited", deserialize_with = "lenient::boolean")]
    pub favorite: bool,
    #[serde(deserialize_with = "lenient::opt_f64")]
    pub rating: Option<f64>,
    #[serde(rename = "deviceId", alias = "device_id", deserialize_with = "lenient::string")]
    pub device_id: String,
    #[serde(rename = "downloadUrl", alias = "download_url", deserialize_with = "lenient::string")]
    pub download_url: String,
}

/// Genres and series decoded from a category string
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CategoryInfo {
    pub genres: Vec<String>,
    pub series: Option<String>,
    pub series_number: Option<f64>,
}

/// Decode a category string into genres and series information
///
/// `<Name>` lines name the series, `#N#` lines give its number and every other
/// non-empty line is a genre. The first series and number lines win.
pub fn parse_category(category: &str) -> CategoryInfo {
    let mut info = CategoryInfo::default();

    for line in category.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if let Some(name) = wrapped(line, '<', '>') {
            if info.series.is_none() && !name.is_empty() {
                info.series = Some(name.to_string());
            }
        } else if let Some(number) = wrapped(line, '#', '#') {
            if info.series_number.is_none() {
                info.series_number = number.parse().ok();
            }
        } else {
            info.genres.push(line.to_string());
        }
    }

    info
}

fn wrapped(line: &str, open: char, close: char) -> Option<&str> {
    if line.chars().count() < 2 {
        return None;
    }
    line.strip_prefix(open)?.strip_suffix(close).map(str::trim)
}

/// Load the sync file for a cache layout
///
/// Returns `Ok(None)` when the file has not been produced yet.
pub async fn load_sync_metadata(
    fs: &dyn FileSystemAccess,
    layout: &CacheLayout,
) -> Result<Option<Vec<SyncEntry>>> {
    let path = layout.sync_file();

    if !fs.exists(&path).await? {
        debug!("No sync metadata file present");
        return Ok(None);
    }

    let data = match fs.read_file(&path).await {
        Ok(data) => data,
        Err(e) if e.is_not_found() => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    decode_sync_file(&data).map(Some)
}

/// Inflate and parse the sync file
///
/// An uncompressed JSON array is accepted as well.
pub fn decode_sync_file(data: &[u8]) -> Result<Vec<SyncEntry>> {
    if looks_like_json_array(data) {
        debug!("Sync file is not compressed, parsing as plain JSON");
        return parse_sync_entries(data);
    }
    parse_sync_entries(&inflate(data)?)
}

/// Parse the JSON array, skipping entries that fail to decode
pub fn parse_sync_entries(json: &[u8]) -> Result<Vec<SyncEntry>> {
    let json = json.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(json);

    let items = match serde_json::from_slice::<Value>(json)? {
        Value::Array(items) => items,
        other => {
            return Err(MetadataError::InvalidFormat(format!(
                "sync file root must be an array, found {}",
                json_kind(&other)
            )))
        }
    };

    let total = items.len();
    let entries: Vec<SyncEntry> = items
        .into_iter()
        .enumerate()
        .filter_map(|(index, item)| match serde_json::from_value::<SyncEntry>(item) {
            Ok(entry) if !entry.filename.trim().is_empty() => Some(entry),
            Ok(_) => {
                debug!(index, "Skipping sync entry without filename");
                None
            }
            Err(e) => {
                warn!(index, error = %e, "Skipping malformed sync entry");
                None
            }
        })
        .collect();

    debug!(total, decoded = entries.len(), "Decoded sync metadata");
    Ok(entries)
}

fn looks_like_json_array(data: &[u8]) -> bool {
    data.iter()
        .find(|b| !b.is_ascii_whitespace())
        .map(|b| *b == b'[')
        .unwrap_or(false)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

mod lenient {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    pub fn string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::String(s) => s,
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            _ => String::new(),
        })
    }

    pub fn opt_i64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i64>, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        })
    }

    pub fn opt_f64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        })
    }

    pub fn boolean<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::Bool(b) => b,
            Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
            Value::String(s) => matches!(
                s.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes"
            ),
            _ => false,
        })
    }
}
