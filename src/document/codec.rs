//! Packed-tree codec: gzip compression with a base64 text encoding.
//!
//! Compression can be slow on large documents, so both directions run on the
//! blocking pool.

use crate::error::ParseError;
use base64ct::{Base64, Encoding};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::{Read, Write};

/// Compress serialized tree text into a base64-encoded blob.
pub async fn pack_text(text: String) -> Result<String, ParseError> {
    tokio::task::spawn_blocking(move || {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder
            .write_all(text.as_bytes())
            .and_then(|_| encoder.finish())
            .map(|bytes| Base64::encode_string(&bytes))
            .map_err(|e| ParseError::new(format!("compression failed: {}", e)))
    })
    .await
    .map_err(|e| ParseError::new(format!("compression task failed: {}", e)))?
}

/// Decode a packed blob back into tree text.
pub async fn unpack_text(blob: String) -> Result<String, ParseError> {
    tokio::task::spawn_blocking(move || {
        let bytes = Base64::decode_vec(&blob).map_err(|e| {
            ParseError::with_payload(format!("invalid base64 payload: {}", e), blob.clone())
        })?;
        let mut text = String::new();
        GzDecoder::new(bytes.as_slice())
            .read_to_string(&mut text)
            .map_err(|e| {
                ParseError::with_payload(format!("decompression failed: {}", e), blob.clone())
            })?;
        Ok(text)
    })
    .await
    .map_err(|e| ParseError::new(format!("decompression task failed: {}", e)))?
}
