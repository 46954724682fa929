//! Per-track lossless frame compression.
//!
//! Tracks can be configured to compress every frame payload before it is
//! handed to the writer (Matroska content encoding, compression scope
//! "frame contents only"). Only zlib is supported; the method is recorded
//! in the track headers so the demuxing side knows how to undo it.

use std::io::{Read, Write};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;

/// Compression method configured for a track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompressionMethod {
    /// Nothing configured yet; resolved to [`None`](Self::None) when
    /// headers are finalized.
    #[default]
    Unspecified,
    /// Frames pass through unmodified.
    None,
    /// zlib (RFC 1950) per-frame compression.
    Zlib,
}

/// Stateless frame compressor for one track.
#[derive(Debug, Clone, Copy)]
pub struct Compressor {
    method: CompressionMethod,
}

impl Compressor {
    /// Create a compressor for the given method.
    ///
    /// Returns `None` for [`CompressionMethod::None`] and
    /// [`CompressionMethod::Unspecified`] — callers skip the compression
    /// step entirely instead of running an identity transform.
    pub fn create(method: CompressionMethod) -> Option<Self> {
        match method {
            CompressionMethod::Zlib => Some(Self { method }),
            CompressionMethod::None | CompressionMethod::Unspecified => None,
        }
    }

    /// The method this compressor implements.
    pub fn method(&self) -> CompressionMethod {
        self.method
    }

    /// Compress one frame payload.
    pub fn compress(&self, data: &[u8]) -> std::io::Result<Vec<u8>> {
        let mut encoder = ZlibEncoder::new(
            Vec::with_capacity(data.len() / 2 + 16),
            flate2::Compression::default(),
        );
        encoder.write_all(data)?;
        encoder.finish()
    }

    /// Undo [`compress`](Self::compress). Used by the demuxing side and
    /// by tests; the muxing path never decompresses.
    pub fn decompress(&self, data: &[u8]) -> std::io::Result<Vec<u8>> {
        let mut decoder = ZlibDecoder::new(data);
        let mut out = Vec::new();
        decoder.read_to_end(&mut out)?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_compressor_for_none() {
        assert!(Compressor::create(CompressionMethod::None).is_none());
        assert!(Compressor::create(CompressionMethod::Unspecified).is_none());
    }

    #[test]
    fn zlib_shrinks_redundant_data() {
        let c = Compressor::create(CompressionMethod::Zlib).unwrap();
        let data = vec![0x42u8; 4096];
        let compressed = c.compress(&data).unwrap();
        assert!(compressed.len() < data.len());
        assert_eq!(c.decompress(&compressed).unwrap(), data);
    }

    #[test]
    fn zlib_handles_empty_frame() {
        let c = Compressor::create(CompressionMethod::Zlib).unwrap();
        let compressed = c.compress(&[]).unwrap();
        assert_eq!(c.decompress(&compressed).unwrap(), Vec::<u8>::new());
    }
}
