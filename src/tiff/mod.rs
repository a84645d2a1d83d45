//! GeoTIFF reading and writing
//!
//! Implements the subset of TIFF/BigTIFF needed for single-band
//! elevation rasters: IFD parsing, strip/tile band decoding, GeoTIFF
//! georeferencing tags, and a classic-TIFF writer for mosaics.

pub mod constants;
pub mod georef;
pub mod ifd;
pub mod reader;
pub mod writer;

pub use georef::GeoReference;
pub use ifd::{Ifd, IfdEntry};
pub use reader::GeoTiffReader;
pub use writer::GeoTiffWriter;
