//! Payload codecs
//!
//! CloudWatch Logs delivers gzip; the other algorithms cover streams fed by
//! producers that chose differently. Every algorithm is served by one
//! [`Codec`] value behind the [`Compressor`] and [`Decompressor`] traits.

use std::io::{Read, Write};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;

use crate::config::CompressionAlgorithm;
use crate::error::{Error, Result};

/// Level used when none is given
pub const DEFAULT_LEVEL: i32 = 6;

/// Compression interface for record payloads
pub trait Compressor: Send + Sync {
    /// Compress data
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>>;

    /// Get compression algorithm
    fn algorithm(&self) -> CompressionAlgorithm;

    /// Get compression level
    fn level(&self) -> i32;
}

/// Decompression interface for record payloads
pub trait Decompressor: Send + Sync {
    /// Decompress data
    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>>;

    /// Get compression algorithm
    fn algorithm(&self) -> CompressionAlgorithm;
}

/// Factory for creating compressors and decompressors
pub struct CompressionFactory;

impl CompressionFactory {
    /// Create a compressor; the level is clamped to 0..=9
    pub fn create_compressor(algorithm: CompressionAlgorithm, level: i32) -> Box<dyn Compressor> {
        Box::new(Codec::new(algorithm).with_level(level))
    }

    /// Create a decompressor
    pub fn create_decompressor(algorithm: CompressionAlgorithm) -> Box<dyn Decompressor> {
        Box::new(Codec::new(algorithm))
    }
}

/// One compression algorithm at one level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Codec {
    algorithm: CompressionAlgorithm,
    level: i32,
}

impl Codec {
    /// Codec for `algorithm` at [`DEFAULT_LEVEL`]
    pub fn new(algorithm: CompressionAlgorithm) -> Self {
        Self {
            algorithm,
            level: DEFAULT_LEVEL,
        }
    }

    /// Set the level, clamped to 0..=9
    pub fn with_level(mut self, level: i32) -> Self {
        self.level = level.clamp(0, 9);
        self
    }

    fn failure(&self, e: std::io::Error) -> Error {
        Error::compression(format!("{} error: {}", self.algorithm, e))
    }
}

impl Compressor for Codec {
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>> {
        match self.algorithm {
            CompressionAlgorithm::None => Ok(data.to_vec()),
            CompressionAlgorithm::Gzip => {
                let level = flate2::Compression::new(self.level as u32);
                let mut encoder = GzEncoder::new(Vec::new(), level);
                encoder.write_all(data)?;
                Ok(encoder.finish()?)
            }
            CompressionAlgorithm::Lz4 => {
                let mut encoder = lz4::EncoderBuilder::new()
                    .level(self.level as u32)
                    .build(Vec::new())?;
                encoder.write_all(data)?;
                let (compressed, result) = encoder.finish();
                result?;
                Ok(compressed)
            }
            CompressionAlgorithm::Zstd => {
                // zstd levels start at 1
                Ok(zstd::encode_all(data, self.level.max(1))?)
            }
        }
    }

    fn algorithm(&self) -> CompressionAlgorithm {
        self.algorithm
    }

    fn level(&self) -> i32 {
        self.level
    }
}

impl Decompressor for Codec {
    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>> {
        let mut decompressed = Vec::new();

        let read = match self.algorithm {
            CompressionAlgorithm::None => return Ok(data.to_vec()),
            CompressionAlgorithm::Gzip => GzDecoder::new(data).read_to_end(&mut decompressed),
            CompressionAlgorithm::Lz4 => lz4::Decoder::new(data)
                .and_then(|mut decoder| decoder.read_to_end(&mut decompressed)),
            CompressionAlgorithm::Zstd => zstd::Decoder::new(data)
                .and_then(|mut decoder| decoder.read_to_end(&mut decompressed)),
        };
        read.map_err(|e| self.failure(e))?;

        Ok(decompressed)
    }

    fn algorithm(&self) -> CompressionAlgorithm {
        self.algorithm
    }
}

/// Utility functions for compression
pub mod util {
    use super::*;

    /// Compress data with the specified algorithm and level
    pub fn compress(data: &[u8], algorithm: CompressionAlgorithm, level: i32) -> Result<Vec<u8>> {
        Codec::new(algorithm).with_level(level).compress(data)
    }

    /// Decompress data with the specified algorithm
    pub fn decompress(data: &[u8], algorithm: CompressionAlgorithm) -> Result<Vec<u8>> {
        Codec::new(algorithm).decompress(data)
    }

    /// Gzip data at the default level
    pub fn gzip_bytes(data: &[u8]) -> Result<Vec<u8>> {
        compress(data, CompressionAlgorithm::Gzip, DEFAULT_LEVEL)
    }

    /// Gunzip data
    pub fn gunzip_bytes(data: &[u8]) -> Result<Vec<u8>> {
        decompress(data, CompressionAlgorithm::Gzip)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    /// Three flow log lines
    const TEST_DATA: &[u8] = b"2 123456789010 eni-1235b8ca 172.31.16.139 172.31.16.21 20641 22 6 20 4249 1418530010 1418530070 ACCEPT OK 2 123456789010 eni-1235b8ca 172.31.9.69 172.31.9.12 49761 3389 6 20 4249 1418530010 1418530070 REJECT OK 2 123456789010 eni-1235b8ca 172.31.16.139 172.31.16.21 20641 22 6 20 4249 1418530010 1418530070 ACCEPT OK";

    /// Gzip of b"Test data" as produced by a stock gzip implementation
    const GZ_TEST_DATA: &[u8] = b"\x1f\x8b\x08\x00M\x986W\x02\xff\x0bI-.QHI,I\x04\x00\x11,\xf9Q\t\x00\x00\x00";

    #[test]
    fn test_passthrough() {
        let codec = Codec::new(CompressionAlgorithm::None);
        let compressed = codec.compress(TEST_DATA).unwrap();

        assert_eq!(compressed, TEST_DATA);
        assert_eq!(codec.decompress(&compressed).unwrap(), TEST_DATA);
    }

    #[test]
    fn test_gunzip_known_payload() {
        let decompressed = util::gunzip_bytes(GZ_TEST_DATA).unwrap();
        assert_eq!(decompressed, b"Test data");
    }

    #[test]
    fn test_gzip() {
        let compressed = util::gzip_bytes(TEST_DATA).unwrap();

        assert!(compressed.len() < TEST_DATA.len());
        // Gzip magic
        assert_eq!(&compressed[..2], &[0x1f, 0x8b]);

        assert_eq!(util::gunzip_bytes(&compressed).unwrap(), TEST_DATA);
    }

    #[test]
    fn test_gunzip_rejects_garbage() {
        let err = util::gunzip_bytes(b"definitely not gzip").unwrap_err();
        assert!(matches!(err, Error::Compression(_)));
        assert!(err.to_string().contains("gzip"));
    }

    #[test]
    fn test_zstd_smaller() {
        let compressed = util::compress(TEST_DATA, CompressionAlgorithm::Zstd, 3).unwrap();

        assert!(compressed.len() < TEST_DATA.len());
        assert_eq!(
            util::decompress(&compressed, CompressionAlgorithm::Zstd).unwrap(),
            TEST_DATA
        );
    }

    #[test]
    fn test_compression_factory() {
        let gzip = CompressionFactory::create_compressor(CompressionAlgorithm::Gzip, 12);
        assert_eq!(gzip.algorithm(), CompressionAlgorithm::Gzip);
        assert_eq!(gzip.level(), 9);

        let lz4 = CompressionFactory::create_compressor(CompressionAlgorithm::Lz4, -1);
        assert_eq!(lz4.level(), 0);

        let zstd = CompressionFactory::create_decompressor(CompressionAlgorithm::Zstd);
        assert_eq!(zstd.algorithm(), CompressionAlgorithm::Zstd);
    }

    proptest! {
        #[test]
        fn prop_gzip_round_trip(data in proptest::collection::vec(any::<u8>(), 0..4096)) {
            let compressed = util::gzip_bytes(&data).unwrap();
            prop_assert_eq!(util::gunzip_bytes(&compressed).unwrap(), data);
        }

        #[test]
        fn prop_round_trip_every_algorithm(
            data in proptest::collection::vec(any::<u8>(), 0..2048),
            level in 0i32..10,
        ) {
            for algorithm in [
                CompressionAlgorithm::None,
                CompressionAlgorithm::Gzip,
                CompressionAlgorithm::Lz4,
                CompressionAlgorithm::Zstd,
            ] {
                let compressed = util::compress(&data, algorithm, level).unwrap();
                prop_assert_eq!(util::decompress(&compressed, algorithm).unwrap(), data.clone());
            }
        }
    }
}
