//! Handler for Zstandard compressed data

use log::debug;

use crate::errors::{StormError, StormResult};
use super::handler::CompressionHandler;

/// Zstandard compression handler (compression code 14)
pub struct ZstdHandler {
    /// Compression level (1-22, default 3)
    compression_level: i32,
}

impl ZstdHandler {
    /// Create a new handler with the default compression level
    pub fn new() -> Self {
        ZstdHandler { compression_level: 3 }
    }

    /// Create a new handler with a specific compression level
    pub fn with_level(level: i32) -> Self {
        ZstdHandler { compression_level: level.clamp(1, 22) }
    }
}

impl Default for ZstdHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl CompressionHandler for ZstdHandler {
    fn decompress(&self, data: &[u8]) -> StormResult<Vec<u8>> {
        if data.is_empty() {
            return Ok(Vec::new());
        }

        debug!("ZSTD decompressing {} bytes", data.len());
        zstd::decode_all(data)
            .map_err(|e| StormError::GenericError(format!("ZSTD decompression error: {}", e)))
    }

    fn compress(&self, data: &[u8]) -> StormResult<Vec<u8>> {
        if data.is_empty() {
            return Ok(Vec::new());
        }

        debug!("ZSTD compressing {} bytes with level {}", data.len(), self.compression_level);
        zstd::encode_all(data, self.compression_level)
            .map_err(|e| StormError::GenericError(format!("ZSTD compression error: {}", e)))
    }

    fn name(&self) -> &'static str {
        "ZSTD"
    }

    fn code(&self) -> u64 {
        14
    }
}
