//! Precomputed content encodings.
//!
//! Every stream is finished before its bytes are returned; a half-written
//! gzip or deflate stream is an error, never a variant.

use std::io::{self, Write};

use flate2::write::{DeflateEncoder, GzEncoder};
use flate2::Compression;

use crate::manifest::ContentEncoding;

/// Encode `raw` with the given scheme at maximum compression.
pub fn encode(encoding: ContentEncoding, raw: &[u8]) -> io::Result<Vec<u8>> {
    match encoding {
        ContentEncoding::Identity => Ok(raw.to_vec()),
        ContentEncoding::Gzip => {
            let mut encoder = GzEncoder::new(Vec::with_capacity(raw.len() / 2), Compression::best());
            encoder.write_all(raw)?;
            encoder.finish()
        }
        ContentEncoding::Deflate => {
            let mut encoder =
                DeflateEncoder::new(Vec::with_capacity(raw.len() / 2), Compression::best());
            encoder.write_all(raw)?;
            encoder.finish()
        }
    }
}
