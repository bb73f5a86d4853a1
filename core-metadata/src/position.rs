//! # Position Decoder
//!
//! Parses one plaintext position file (`<book file>.po`). The content is a
//! single record `timestamp*chapter@marker#position:percentage%`; only the
//! timestamp, chapter and percentage are used.

use core_library::models::ReadingPosition;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref POSITION_RECORD: Regex =
        Regex::new(r"^(-?\d+)\*(-?\d+)@(-?\d+)#(-?\d+):(\d+(?:\.\d+)?)%$")
            .expect("position record pattern is valid");
}

/// Decode a position record, `None` when the content does not match
///
/// The returned position has no modification time; the caller fills it from
/// the file metadata.
pub fn decode_position(data: &[u8]) -> Option<ReadingPosition> {
    let text = String::from_utf8_lossy(data);
    parse_position(text.trim())
}

fn parse_position(text: &str) -> Option<ReadingPosition> {
    let caps = POSITION_RECORD.captures(text)?;

    Some(ReadingPosition {
        timestamp: caps[1].parse().ok()?,
        chapter: caps[2].parse().ok()?,
        progress: caps[5].parse().ok()?,
        modified_at: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_position() {
        let position = decode_position(b"1700000000*12@0#500:63.5%").unwrap();
        assert_eq!(position.timestamp, 1700000000);
        assert_eq!(position.chapter, 12);
        assert_eq!(position.progress, 63.5);
        assert_eq!(position.modified_at, None);
    }

    #[test]
    fn test_integer_percentage_and_surrounding_whitespace() {
        let position = decode_position(b"  1700000000*0@2#0:100%\n").unwrap();
        assert_eq!(position.chapter, 0);
        assert_eq!(position.progress, 100.0);
    }

    #[test]
    fn test_non_matching_content() {
        assert!(decode_position(b"garbage").is_none());
        assert!(decode_position(b"").is_none());
        assert!(decode_position(b"1700000000*12@0#500:63.5").is_none());
        assert!(decode_position(b"1700000000*12@0:63.5%").is_none());
        assert!(decode_position(b"1700000000*12@0#500:63.5% trailing").is_none());
    }

    #[test]
    fn test_overflowing_timestamp_is_rejected() {
        assert!(decode_position(b"99999999999999999999999*1@0#0:5%").is_none());
    }
}
