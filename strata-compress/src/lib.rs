//! Byte-level compression of encoded pages.
//!
//! A [`CompressionCodec`] is chosen once per write session and recorded in every page header.
//! Readers always dispatch on the recorded id.

use std::fmt::{Display, Formatter};
use std::io::{Read, Write};

use bytes::Bytes;
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use num_enum::{IntoPrimitive, TryFromPrimitive};
use strata_error::{StrataResult, strata_bail, strata_err};

/// Default gzip level.
pub const DEFAULT_GZIP_LEVEL: u32 = 9;

/// Compression codec ids recorded in column chunk and page metadata.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum CompressionCodec {
    #[default]
    Uncompressed = 0,
    Snappy = 1,
    Gzip = 2,
    Lzo = 3,
    Brotli = 4,
    Lz4 = 5,
    Zstd = 6,
    Lz4Raw = 7,
}

impl CompressionCodec {
    /// Whether pages compressed with this codec can be written and read.
    pub fn is_supported(&self) -> bool {
        matches!(
            self,
            CompressionCodec::Uncompressed | CompressionCodec::Snappy | CompressionCodec::Gzip
        )
    }

    /// Decompress a page body, checking it inflates to exactly `expected_size` bytes.
    pub fn decompress(&self, data: Bytes, expected_size: usize) -> StrataResult<Bytes> {
        let decompressed = match self {
            CompressionCodec::Uncompressed => data,
            CompressionCodec::Snappy => snap::raw::Decoder::new()
                .decompress_vec(&data)
                .map_err(|e| strata_err!(Corrupted: "Snappy decompression failed: {}", e))?
                .into(),
            CompressionCodec::Gzip => {
                let mut out = Vec::with_capacity(expected_size);
                GzDecoder::new(data.as_ref())
                    .read_to_end(&mut out)
                    .map_err(|e| strata_err!(Corrupted: "Gzip decompression failed: {}", e))?;
                out.into()
            }
            unsupported => strata_bail!(
                UnsupportedCompression: "Compression codec {} is not supported",
                unsupported
            ),
        };
        if decompressed.len() != expected_size {
            strata_bail!(
                Corrupted: "Page decompressed to {} bytes, expected {}",
                decompressed.len(),
                expected_size
            );
        }
        Ok(decompressed)
    }
}

impl Display for CompressionCodec {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            CompressionCodec::Uncompressed => "UNCOMPRESSED",
            CompressionCodec::Snappy => "SNAPPY",
            CompressionCodec::Gzip => "GZIP",
            CompressionCodec::Lzo => "LZO",
            CompressionCodec::Brotli => "BROTLI",
            CompressionCodec::Lz4 => "LZ4",
            CompressionCodec::Zstd => "ZSTD",
            CompressionCodec::Lz4Raw => "LZ4_RAW",
        };
        write!(f, "{name}")
    }
}

/// Compresses page bodies for one write session.
#[derive(Debug, Clone, Copy)]
pub struct Compressor {
    codec: CompressionCodec,
    gzip_level: u32,
}

impl Compressor {
    /// A compressor for a supported codec. `gzip_level` must be in `0..=9`.
    pub fn try_new(codec: CompressionCodec, gzip_level: u32) -> StrataResult<Self> {
        if !codec.is_supported() {
            strata_bail!(
                UnsupportedCompression: "Compression codec {} is not supported",
                codec
            );
        }
        if gzip_level > 9 {
            strata_bail!("Gzip level must be between 0 and 9, got {}", gzip_level);
        }
        Ok(Self { codec, gzip_level })
    }

    pub fn codec(&self) -> CompressionCodec {
        self.codec
    }

    pub fn compress(&self, data: &[u8]) -> StrataResult<Vec<u8>> {
        match self.codec {
            CompressionCodec::Uncompressed => Ok(data.to_vec()),
            CompressionCodec::Snappy => snap::raw::Encoder::new()
                .compress_vec(data)
                .map_err(|e| strata_err!("Snappy compression failed: {}", e)),
            CompressionCodec::Gzip => {
                let mut encoder = GzEncoder::new(Vec::new(), Compression::new(self.gzip_level));
                encoder.write_all(data)?;
                Ok(encoder.finish()?)
            }
            unsupported => strata_bail!(
                UnsupportedCompression: "Compression codec {} is not supported",
                unsupported
            ),
        }
    }
}

impl Default for Compressor {
    fn default() -> Self {
        Self {
            codec: CompressionCodec::Uncompressed,
            gzip_level: DEFAULT_GZIP_LEVEL,
        }
    }
}
