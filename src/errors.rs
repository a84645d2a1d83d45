//! Custom error types for the depth raster pipeline

use std::fmt;
use std::io;

/// Pipeline-specific error types
#[derive(Debug)]
pub enum StormError {
    /// I/O error
    IoError(io::Error),
    /// Invalid TIFF header
    InvalidHeader,
    /// Invalid byte order marker
    InvalidByteOrder(u16),
    /// Unsupported TIFF version
    UnsupportedVersion(u16),
    /// Tag not found
    TagNotFound(u16),
    /// Unsupported field type
    UnsupportedFieldType(u16),
    /// Unsupported compression method
    UnsupportedCompression(u64),
    /// Unsupported sample encoding (bits per sample, sample format)
    UnsupportedSampleFormat(u16, u16),
    /// Image dimensions not found
    MissingDimensions,
    /// Raster carries no usable georeferencing tags
    MissingGeoReference,
    /// An operation needed a spatial reference and none was declared
    MissingCrs(String),
    /// EPSG code not present in the projection registry
    UnknownCrs(u32),
    /// Coordinate transformation failure
    ProjectionError(String),
    /// Folder holds no input tiles
    EmptyFolder(String),
    /// GeoJSON (de)serialization failure
    JsonError(String),
    /// Generic error with message
    GenericError(String),
}

impl fmt::Display for StormError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StormError::IoError(e) => write!(f, "I/O error: {}", e),
            StormError::InvalidHeader => write!(f, "Invalid TIFF header"),
            StormError::InvalidByteOrder(v) => write!(f, "Invalid byte order marker: {:#06x}", v),
            StormError::UnsupportedVersion(v) => write!(f, "Unsupported TIFF version: {}", v),
            StormError::TagNotFound(tag) => write!(f, "Tag not found: {}", tag),
            StormError::UnsupportedFieldType(ft) => write!(f, "Unsupported field type: {}", ft),
            StormError::UnsupportedCompression(c) => write!(f, "Unsupported compression method: {}", c),
            StormError::UnsupportedSampleFormat(bits, format) =>
                write!(f, "Unsupported sample encoding: {} bits, format {}", bits, format),
            StormError::MissingDimensions => write!(f, "Image dimensions not found"),
            StormError::MissingGeoReference => write!(f, "Raster has no georeferencing tags"),
            StormError::MissingCrs(msg) => write!(f, "Missing spatial reference: {}", msg),
            StormError::UnknownCrs(code) => write!(f, "EPSG:{} is not in the projection registry", code),
            StormError::ProjectionError(msg) => write!(f, "Projection error: {}", msg),
            StormError::EmptyFolder(path) => write!(f, "No GeoTIFF tiles found in {}", path),
            StormError::JsonError(msg) => write!(f, "GeoJSON error: {}", msg),
            StormError::GenericError(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for StormError {}

impl From<io::Error> for StormError {
    fn from(error: io::Error) -> Self {
        StormError::IoError(error)
    }
}

impl From<String> for StormError {
    fn from(msg: String) -> Self {
        StormError::GenericError(msg)
    }
}

impl From<serde_json::Error> for StormError {
    fn from(error: serde_json::Error) -> Self {
        StormError::JsonError(error.to_string())
    }
}

/// Result type for pipeline operations
pub type StormResult<T> = Result<T, StormError>;
