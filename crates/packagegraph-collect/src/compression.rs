//! Decompression of fetched metadata, chosen by file suffix.

use std::io::{BufReader, Read};

use flate2::read::MultiGzDecoder;

use crate::error::CollectError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    Gzip,
    Zstd,
}

impl Compression {
    pub fn from_url(url: &str) -> Self {
        let path = url.split(['?', '#']).next().unwrap_or(url);
        if path.ends_with(".gz") {
            Compression::Gzip
        } else if path.ends_with(".zst") {
            Compression::Zstd
        } else {
            Compression::None
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Compression::None => "identity",
            Compression::Gzip => "gzip",
            Compression::Zstd => "zstd",
        }
    }
}

/// Wraps `reader` in a streaming decoder for `compression`.
pub fn decode(
    reader: Box<dyn Read + Send>,
    compression: Compression,
    url: &str,
) -> Result<Box<dyn Read + Send>, CollectError> {
    match compression {
        Compression::None => Ok(reader),
        Compression::Gzip => Ok(Box::new(MultiGzDecoder::new(BufReader::new(reader)))),
        Compression::Zstd => zstd_decoder(reader, url),
    }
}

#[cfg(feature = "zstd")]
fn zstd_decoder(
    reader: Box<dyn Read + Send>,
    url: &str,
) -> Result<Box<dyn Read + Send>, CollectError> {
    let decoder = zstd::stream::read::Decoder::new(reader)
        .map_err(|e| CollectError::io(format!("zstd stream {url}"), e))?;
    Ok(Box::new(decoder))
}

#[cfg(not(feature = "zstd"))]
fn zstd_decoder(
    _reader: Box<dyn Read + Send>,
    url: &str,
) -> Result<Box<dyn Read + Send>, CollectError> {
    Err(CollectError::CodecUnavailable {
        codec: "zstd",
        url: url.to_string(),
    })
}

/// Decompresses a whole buffer. Uncompressed input is returned as is.
pub fn decompress(
    bytes: Vec<u8>,
    compression: Compression,
    url: &str,
) -> Result<Vec<u8>, CollectError> {
    if compression == Compression::None {
        return Ok(bytes);
    }
    let mut decoder = decode(Box::new(std::io::Cursor::new(bytes)), compression, url)?;
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(|e| CollectError::io(format!("{} stream {url}", compression.name()), e))?;
    Ok(out)
}
