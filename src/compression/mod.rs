//! Compression handling for TIFF image data
//!
//! Strategy implementations for the compression methods seen in
//! elevation GeoTIFF exports: none, Adobe Deflate, and Zstandard.

mod handler;
mod uncompressed;
mod deflate;
mod zstd;
mod factory;

pub use handler::CompressionHandler;
pub use uncompressed::UncompressedHandler;
pub use deflate::AdobeDeflateHandler;
pub use self::zstd::ZstdHandler;
pub use factory::CompressionFactory;
