//! Entropy coders for the three patch segments.
//!
//! Classic BSDIFF40 patches compress every segment with bzip2. Any coder with
//! a deterministic, exactly invertible `compress`/`decompress` pair can stand
//! in through the [`Compressor`] trait. The container does not record which
//! coder was used, so a patch must be applied with the coder that built it.

use std::io::{self, Read, Write};

use bzip2::read::BzDecoder;
use bzip2::write::BzEncoder;
use bzip2::Compression as BzCompression;

/// A byte-stream compressor used for the control, diff and extra segments.
pub trait Compressor {
    /// Compress one whole segment.
    fn compress(&self, data: &[u8]) -> io::Result<Vec<u8>>;

    /// Decompress one whole segment produced by [`Compressor::compress`].
    fn decompress(&self, data: &[u8]) -> io::Result<Vec<u8>>;
}

/// Built-in segment coders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompressionAlgorithm {
    None,
    #[default]
    Bz2,
    Brotli,
}

impl Compressor for CompressionAlgorithm {
    fn compress(&self, data: &[u8]) -> io::Result<Vec<u8>> {
        match self {
            Self::None => Ok(data.to_vec()),
            Self::Bz2 => {
                let mut encoder = BzEncoder::new(Vec::new(), BzCompression::best());
                encoder.write_all(data)?;
                encoder.finish()
            }
            Self::Brotli => {
                let mut compressed = Vec::new();
                {
                    let mut encoder = brotli::CompressorWriter::new(
                        &mut compressed,
                        4096, // buffer size
                        11,   // quality (11 = max)
                        20,   // lg_window_size
                    );
                    encoder.write_all(data)?;
                    encoder.flush()?;
                } // dropping the encoder finalizes the stream
                Ok(compressed)
            }
        }
    }

    fn decompress(&self, data: &[u8]) -> io::Result<Vec<u8>> {
        match self {
            Self::None => Ok(data.to_vec()),
            Self::Bz2 => {
                let mut decompressed = Vec::new();
                BzDecoder::new(data).read_to_end(&mut decompressed)?;
                Ok(decompressed)
            }
            Self::Brotli => {
                let mut decompressed = Vec::new();
                brotli::Decompressor::new(data, 4096).read_to_end(&mut decompressed)?;
                Ok(decompressed)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [CompressionAlgorithm; 3] = [
        CompressionAlgorithm::None,
        CompressionAlgorithm::Bz2,
        CompressionAlgorithm::Brotli,
    ];

    #[test]
    fn test_default_is_bzip2() {
        assert_eq!(CompressionAlgorithm::default(), CompressionAlgorithm::Bz2);
    }

    #[test]
    fn test_segments_survive_every_coder() {
        let data: Vec<u8> = (0..5000u32).map(|i| (i * 7 % 251) as u8).collect();
        for alg in ALL {
            let packed = alg.compress(&data).unwrap();
            assert_eq!(alg.decompress(&packed).unwrap(), data, "{:?}", alg);
        }
    }

    #[test]
    fn test_empty_segment() {
        for alg in ALL {
            let packed = alg.compress(b"").unwrap();
            assert!(alg.decompress(&packed).unwrap().is_empty(), "{:?}", alg);
        }
    }

    #[test]
    fn test_bzip2_rejects_garbage() {
        assert!(CompressionAlgorithm::Bz2
            .decompress(b"definitely not bzip2")
            .is_err());
    }
}
