//! FlateDecode (zlib/deflate) stream decoding.

use flate2::read::ZlibDecoder;
use std::io::{self, Read};

/// Filter name this decoder handles.
pub const FLATE_DECODE: &str = "FlateDecode";

/// Inflate a zlib-wrapped stream body.
///
/// Bytes after the end of the compressed stream are ignored.
pub fn flatedecode(data: &[u8]) -> io::Result<Vec<u8>> {
    let mut decoder = ZlibDecoder::new(data);
    let mut out = Vec::with_capacity(data.len() * 2);
    decoder.read_to_end(&mut out)?;
    Ok(out)
}
