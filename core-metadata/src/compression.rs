//! DEFLATE stream handling shared by the annotation and sync-file decoders.

use crate::error::{MetadataError, Result};
use flate2::read::{DeflateDecoder, ZlibDecoder};
use std::io::Read;

/// Inflate a zlib-wrapped stream, falling back to raw DEFLATE
pub fn inflate(data: &[u8]) -> Result<Vec<u8>> {
    if data.is_empty() {
        return Err(MetadataError::Decompression("empty input".to_string()));
    }

    let mut out = Vec::new();
    let zlib_err = match ZlibDecoder::new(data).read_to_end(&mut out) {
        Ok(_) => return Ok(out),
        Err(e) => e,
    };

    out.clear();
    DeflateDecoder::new(data)
        .read_to_end(&mut out)
        .map_err(|raw_err| {
            MetadataError::Decompression(format!("zlib: {}; raw deflate: {}", zlib_err, raw_err))
        })?;
    Ok(out)
}
