//! Compression of prepared chunk buffers.
//!
//! The pipeline only sees the [`Compressor`] trait. Game clients expect raw
//! deflate; LZ4 is offered for links where both ends agree on it.

use std::io::{Read, Write};
use std::sync::Arc;

use chunkwire_config::{CompressionAlgorithm, CompressionSettings};
use flate2::Compression;
use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;
use lz4_flex::{compress_prepend_size, decompress_size_prepended};

/// Highest deflate level accepted.
pub const MAX_DEFLATE_LEVEL: u32 = 9;

/// A black-box byte compressor shared by all pipeline workers.
pub trait Compressor: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    fn compress(&self, data: &[u8]) -> Result<Vec<u8>, CompressionError>;

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, CompressionError>;
}

/// Raw deflate (no zlib header) at a fixed level.
#[derive(Debug, Clone, Copy)]
pub struct DeflateCompressor {
    level: u32,
}

impl DeflateCompressor {
    /// Levels above 9 are clamped.
    pub fn new(level: u32) -> Self {
        Self {
            level: level.min(MAX_DEFLATE_LEVEL),
        }
    }

    pub fn level(&self) -> u32 {
        self.level
    }
}

impl Default for DeflateCompressor {
    fn default() -> Self {
        Self::new(7)
    }
}

impl Compressor for DeflateCompressor {
    fn name(&self) -> &'static str {
        "deflate"
    }

    fn compress(&self, data: &[u8]) -> Result<Vec<u8>, CompressionError> {
        let mut encoder = DeflateEncoder::new(Vec::with_capacity(data.len() / 2), Compression::new(self.level));
        encoder.write_all(data).map_err(CompressionError::Deflate)?;
        encoder.finish().map_err(CompressionError::Deflate)
    }

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, CompressionError> {
        let mut out = Vec::new();
        DeflateDecoder::new(data)
            .read_to_end(&mut out)
            .map_err(CompressionError::Deflate)?;
        Ok(out)
    }
}

/// LZ4 block format with the uncompressed size prepended.
#[derive(Debug, Clone, Copy, Default)]
pub struct Lz4Compressor;

impl Compressor for Lz4Compressor {
    fn name(&self) -> &'static str {
        "lz4"
    }

    fn compress(&self, data: &[u8]) -> Result<Vec<u8>, CompressionError> {
        Ok(compress_prepend_size(data))
    }

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, CompressionError> {
        decompress_size_prepended(data).map_err(|e| CompressionError::Lz4(e.to_string()))
    }
}

/// Builds the configured compressor.
pub fn compressor_from_config(settings: &CompressionSettings) -> Arc<dyn Compressor> {
    match settings.algorithm {
        CompressionAlgorithm::Deflate => Arc::new(DeflateCompressor::new(settings.level)),
        CompressionAlgorithm::Lz4 => Arc::new(Lz4Compressor),
    }
}

/// Errors raised while compressing or decompressing.
#[derive(Debug, thiserror::Error)]
pub enum CompressionError {
    #[error("deflate stream error: {0}")]
    Deflate(#[source] std::io::Error),
    #[error("LZ4 decompression failed: {0}")]
    Lz4(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<u8> {
        let mut data = vec![8u8, 1, 2];
        data.extend(std::iter::repeat_n(0x55, 2048));
        data.extend((0..=255u8).cycle().take(512));
        data
    }

    #[test]
    fn test_deflate_shrinks_and_restores() {
        let compressor = DeflateCompressor::new(7);
        let data = sample();
        let packed = compressor.compress(&data).unwrap();
        assert!(packed.len() < data.len());
        assert_eq!(compressor.decompress(&packed).unwrap(), data);
    }

    #[test]
    fn test_deflate_is_raw() {
        // zlib streams start with 0x78; raw deflate of a single zero byte does not
        let packed = DeflateCompressor::new(6).compress(&[0]).unwrap();
        assert_ne!(packed[0], 0x78);
        assert_eq!(
            flate2::read::DeflateDecoder::new(packed.as_slice())
                .bytes()
                .map(Result::unwrap)
                .collect::<Vec<_>>(),
            vec![0]
        );
    }

    #[test]
    fn test_deflate_level_clamped() {
        assert_eq!(DeflateCompressor::new(42).level(), MAX_DEFLATE_LEVEL);
        assert_eq!(DeflateCompressor::default().level(), 7);
    }

    #[test]
    fn test_lz4_restores() {
        let data = sample();
        let packed = Lz4Compressor.compress(&data).unwrap();
        assert_eq!(&packed[..4], &(data.len() as u32).to_le_bytes());
        assert_eq!(Lz4Compressor.decompress(&packed).unwrap(), data);
    }

    #[test]
    fn test_corrupt_input_is_an_error() {
        assert!(matches!(
            Lz4Compressor.decompress(&[10, 0, 0, 0, 0xF0]),
            Err(CompressionError::Lz4(_))
        ));
        assert!(matches!(
            DeflateCompressor::default().decompress(&[0xFF; 8]),
            Err(CompressionError::Deflate(_))
        ));
    }

    #[test]
    fn test_from_config() {
        let lz4 = CompressionSettings {
            algorithm: CompressionAlgorithm::Lz4,
            level: 0,
        };
        assert_eq!(compressor_from_config(&lz4).name(), "lz4");
        assert_eq!(compressor_from_config(&CompressionSettings::default()).name(), "deflate");
    }
}
