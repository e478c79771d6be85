//! Block compression and the gzip content encoding used by the tile server

use crate::error::{N5Error, Result};
use flate2::read::{GzDecoder, GzEncoder, ZlibDecoder, ZlibEncoder};
use flate2::Compression as FlateCompression;
use serde::{Deserialize, Serialize};
use std::io::Read;

/// Compression declared by the `compression` attribute of an N5 dataset
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum CompressionMethod {
    /// No compression
    #[default]
    Raw,
    /// Gzip (or zlib when `useZlib` is set)
    Gzip {
        #[serde(default = "default_gzip_level")]
        level: i32,
        #[serde(default, rename = "useZlib")]
        use_zlib: bool,
    },
    /// Zstandard (n5-zstandard extension)
    Zstd {
        #[serde(default = "default_zstd_level")]
        level: i32,
    },
}

fn default_gzip_level() -> i32 {
    -1
}

fn default_zstd_level() -> i32 {
    3
}

impl CompressionMethod {
    /// Gzip with the library default level
    pub fn gzip() -> Self {
        CompressionMethod::Gzip {
            level: default_gzip_level(),
            use_zlib: false,
        }
    }

    /// Zstd with the library default level
    pub fn zstd() -> Self {
        CompressionMethod::Zstd {
            level: default_zstd_level(),
        }
    }

    /// Parse a short name as accepted on the command line
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "raw" | "none" => Some(CompressionMethod::Raw),
            "gzip" => Some(Self::gzip()),
            "zstd" => Some(Self::zstd()),
            _ => None,
        }
    }
}

/// Deflate level (0-9, where 0 is no compression and 9 is maximum)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressionLevel(u8);

impl CompressionLevel {
    pub fn new(level: u8) -> Self {
        Self(level.min(9))
    }

    /// Map an N5 level, where negative values mean "library default"
    pub fn from_n5(level: i32) -> Self {
        match u8::try_from(level) {
            Ok(level) => Self::new(level),
            Err(_) if level < 0 => Self::default(),
            Err(_) => Self::best(),
        }
    }

    pub fn best() -> Self {
        Self(9)
    }

    pub fn value(&self) -> u8 {
        self.0
    }
}

impl Default for CompressionLevel {
    fn default() -> Self {
        Self(6)
    }
}

/// Upper bound on the buffer reserved up front from a block's declared size
const MAX_RESERVE: usize = 1 << 26;

/// Level used for gzip content encoding of chunk responses
pub const HTTP_GZIP_LEVEL: u8 = 5;

/// Trait for block compression/decompression
pub trait Compressor: Send + Sync {
    /// Compress data
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>>;

    /// Decompress data
    fn decompress(&self, data: &[u8], expected_size: Option<usize>) -> Result<Vec<u8>>;
}

/// Raw blocks
#[derive(Debug, Default)]
pub struct RawCompressor;

impl Compressor for RawCompressor {
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>> {
        Ok(data.to_vec())
    }

    fn decompress(&self, data: &[u8], _expected_size: Option<usize>) -> Result<Vec<u8>> {
        Ok(data.to_vec())
    }
}

/// Gzip or zlib framed deflate
#[derive(Debug, Default)]
pub struct GzipCompressor {
    level: CompressionLevel,
    zlib: bool,
}

impl GzipCompressor {
    pub fn new(level: CompressionLevel) -> Self {
        Self { level, zlib: false }
    }

    pub fn zlib(level: CompressionLevel) -> Self {
        Self { level, zlib: true }
    }
}

impl Compressor for GzipCompressor {
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>> {
        let level = FlateCompression::new(u32::from(self.level.value()));
        let mut compressed = Vec::new();
        let result = if self.zlib {
            ZlibEncoder::new(data, level).read_to_end(&mut compressed)
        } else {
            GzEncoder::new(data, level).read_to_end(&mut compressed)
        };
        result.map_err(|e| N5Error::Compression(e.to_string()))?;
        Ok(compressed)
    }

    fn decompress(&self, data: &[u8], expected_size: Option<usize>) -> Result<Vec<u8>> {
        let mut decompressed = Vec::with_capacity(expected_size.unwrap_or_default().min(MAX_RESERVE));
        let result = if self.zlib {
            ZlibDecoder::new(data).read_to_end(&mut decompressed)
        } else {
            GzDecoder::new(data).read_to_end(&mut decompressed)
        };
        result.map_err(|e| N5Error::Decompression(e.to_string()))?;
        Ok(decompressed)
    }
}

/// Zstandard compression
#[derive(Debug, Default)]
pub struct ZstdCompressor {
    level: i32,
}

impl ZstdCompressor {
    pub fn new(level: i32) -> Self {
        Self { level }
    }
}

impl Compressor for ZstdCompressor {
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>> {
        zstd::encode_all(data, self.level).map_err(|e| N5Error::Compression(e.to_string()))
    }

    fn decompress(&self, data: &[u8], _expected_size: Option<usize>) -> Result<Vec<u8>> {
        zstd::decode_all(data).map_err(|e| N5Error::Decompression(e.to_string()))
    }
}

/// Get a compressor for a given method
pub fn get_compressor(method: &CompressionMethod) -> Box<dyn Compressor> {
    match method {
        CompressionMethod::Raw => Box::new(RawCompressor),
        CompressionMethod::Gzip { level, use_zlib } => {
            let level = CompressionLevel::from_n5(*level);
            if *use_zlib {
                Box::new(GzipCompressor::zlib(level))
            } else {
                Box::new(GzipCompressor::new(level))
            }
        }
        CompressionMethod::Zstd { level } => Box::new(ZstdCompressor::new(*level)),
    }
}

/// Gzip a response body at the fixed HTTP level
pub fn gzip_encode(data: &[u8]) -> Result<Vec<u8>> {
    GzipCompressor::new(CompressionLevel::new(HTTP_GZIP_LEVEL)).compress(data)
}
