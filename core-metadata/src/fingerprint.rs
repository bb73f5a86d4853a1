//! Highlight change fingerprint
//!
//! A short string that changes when a book's highlight set changes, so the
//! note writer can skip books whose highlights are unchanged. Only position,
//! timestamp and text length feed the hash: notes and colours can be edited
//! freely without producing a new fingerprint.

use core_library::{sort_highlights, Highlight};

/// Fingerprint a highlight set
///
/// Input order does not matter. Returns an empty string for no highlights.
pub fn highlights_fingerprint(highlights: &[Highlight]) -> String {
    if highlights.is_empty() {
        return String::new();
    }

    let mut sorted = highlights.to_vec();
    sort_highlights(&mut sorted);

    let composite = sorted
        .iter()
        .map(|h| format!("{}:{}:{}", h.position, h.timestamp, h.text_len()))
        .collect::<Vec<_>>()
        .join("|");

    to_base36(djb2(&composite).unsigned_abs())
}

/// djb2 over UTF-16 code units with 32-bit signed wraparound
fn djb2(input: &str) -> i32 {
    input.encode_utf16().fold(5381i32, |hash, unit| {
        hash.wrapping_mul(33).wrapping_add(i32::from(unit))
    })
}

fn to_base36(mut value: u32) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

    if value == 0 {
        return "0".to_string();
    }

    let mut out = Vec::new();
    while value > 0 {
        out.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    out.reverse();
    String::from_utf8_lossy(&out).into_owned()
}
