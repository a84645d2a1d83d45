//! Georeferencing extraction from GeoTIFF tags
//!
//! Pulls the affine transform, spatial reference and no-data sentinel
//! out of a raster's IFD and returns them as one immutable value. The
//! grid carries this value for the rest of the pipeline; nothing
//! downstream reaches back into TIFF tags.

use log::{debug, warn};

use crate::errors::{StormError, StormResult};
use crate::grid::GridTransform;
use crate::io::seekable::SeekableReader;
use crate::tiff::constants::{geo_keys, tags};
use crate::tiff::ifd::Ifd;
use crate::tiff::reader::GeoTiffReader;

/// GeoKey code meaning "user-defined", carrying no EPSG meaning
const USER_DEFINED: u64 = 32767;

/// Immutable georeferencing attached to a grid
#[derive(Debug, Clone, Copy)]
pub struct GeoReference {
    /// Pixel-to-world affine transform
    pub transform: GridTransform,
    /// EPSG code from the GeoKey directory, if declared
    pub epsg: Option<u32>,
    /// No-data sentinel from the GDAL_NODATA tag, if declared
    pub nodata: Option<f64>,
}

/// One entry of the GeoKey directory
#[derive(Debug, Clone, Copy)]
struct GeoKeyEntry {
    key_id: u16,
    tiff_tag_location: u16,
    value: u16,
}

/// Extracts the georeferencing of a raster from its IFD
pub fn extract(
    reader: &GeoTiffReader,
    src: &mut dyn SeekableReader,
    ifd: &Ifd,
) -> StormResult<GeoReference> {
    let transform = extract_transform(reader, src, ifd)?;
    let epsg = extract_epsg(reader, src, ifd)?;
    let nodata = extract_nodata(reader, src, ifd);
    Ok(GeoReference { transform, epsg, nodata })
}

/// Builds the affine transform from pixel scale + tiepoint, falling
/// back to the ModelTransformation matrix
fn extract_transform(
    reader: &GeoTiffReader,
    src: &mut dyn SeekableReader,
    ifd: &Ifd,
) -> StormResult<GridTransform> {
    if ifd.has_tag(tags::MODEL_PIXEL_SCALE_TAG) && ifd.has_tag(tags::MODEL_TIEPOINT_TAG) {
        let scale = reader.read_tag_f64s(src, ifd, tags::MODEL_PIXEL_SCALE_TAG)?;
        let tiepoint = reader.read_tag_f64s(src, ifd, tags::MODEL_TIEPOINT_TAG)?;
        if scale.len() < 2 || tiepoint.len() < 6 {
            return Err(StormError::MissingGeoReference);
        }

        // Tiepoint maps raster (i, j) to world (x, y); normalize to the
        // (0, 0) corner. Scale y is stored positive for north-up rasters.
        let (i, j) = (tiepoint[0], tiepoint[1]);
        let (x, y) = (tiepoint[3], tiepoint[4]);
        let origin_x = x - i * scale[0];
        let origin_y = y + j * scale[1];
        debug!("Transform from scale/tiepoint: origin=({}, {}), pixel=({}, {})",
               origin_x, origin_y, scale[0], -scale[1]);
        return Ok(GridTransform::new(origin_x, origin_y, scale[0], -scale[1]));
    }

    if ifd.has_tag(tags::MODEL_TRANSFORMATION_TAG) {
        let m = reader.read_tag_f64s(src, ifd, tags::MODEL_TRANSFORMATION_TAG)?;
        if m.len() < 16 {
            return Err(StormError::MissingGeoReference);
        }
        if m[1] != 0.0 || m[4] != 0.0 {
            return Err(StormError::GenericError(
                "Rotated rasters are not supported".to_string()));
        }
        return Ok(GridTransform::new(m[3], m[7], m[0], m[5]));
    }

    Err(StormError::MissingGeoReference)
}

/// Reads the EPSG code from the GeoKey directory
///
/// Prefers ProjectedCSTypeGeoKey; falls back to GeographicTypeGeoKey
/// for geographic rasters. Absence is not an error here; reprojection
/// is where a missing reference becomes fatal.
fn extract_epsg(
    reader: &GeoTiffReader,
    src: &mut dyn SeekableReader,
    ifd: &Ifd,
) -> StormResult<Option<u32>> {
    if !ifd.has_tag(tags::GEO_KEY_DIRECTORY_TAG) {
        return Ok(None);
    }

    let keys = parse_geo_key_directory(reader, src, ifd)?;

    for wanted in [geo_keys::PROJECTED_CS_TYPE, geo_keys::GEOGRAPHIC_TYPE] {
        if let Some(entry) = keys.iter().find(|k| k.key_id == wanted) {
            // Only values stored inline carry an EPSG code directly
            if entry.tiff_tag_location == 0 && (entry.value as u64) != USER_DEFINED {
                return Ok(Some(entry.value as u32));
            }
        }
    }

    Ok(None)
}

/// Parses the GeoKey directory header and entries
fn parse_geo_key_directory(
    reader: &GeoTiffReader,
    src: &mut dyn SeekableReader,
    ifd: &Ifd,
) -> StormResult<Vec<GeoKeyEntry>> {
    let raw = reader.read_tag_u64s(src, ifd, tags::GEO_KEY_DIRECTORY_TAG)?;
    if raw.len() < 4 {
        return Err(StormError::GenericError("Invalid GeoKey directory header".to_string()));
    }

    // Header: KeyDirectoryVersion, KeyRevision, MinorRevision, NumberOfKeys
    let num_keys = raw[3] as usize;
    debug!("GeoKey directory: version={}, revision={}.{}, keys={}",
           raw[0], raw[1], raw[2], num_keys);

    let mut keys = Vec::with_capacity(num_keys);
    for n in 0..num_keys {
        let base = 4 + n * 4;
        if base + 3 >= raw.len() {
            warn!("GeoKey directory truncated at entry {}", n);
            break;
        }
        keys.push(GeoKeyEntry {
            key_id: raw[base] as u16,
            tiff_tag_location: raw[base + 1] as u16,
            value: raw[base + 3] as u16,
        });
    }
    Ok(keys)
}

/// Parses the GDAL_NODATA ASCII tag, if present and well-formed
fn extract_nodata(
    reader: &GeoTiffReader,
    src: &mut dyn SeekableReader,
    ifd: &Ifd,
) -> Option<f64> {
    if !ifd.has_tag(tags::GDAL_NODATA) {
        return None;
    }
    match reader.read_tag_ascii(src, ifd, tags::GDAL_NODATA) {
        Ok(text) => {
            let trimmed = text.trim();
            if trimmed.eq_ignore_ascii_case("nan") {
                return Some(f64::NAN);
            }
            match trimmed.parse::<f64>() {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!("Unparseable GDAL_NODATA value: {:?}", trimmed);
                    None
                }
            }
        }
        Err(e) => {
            warn!("Failed to read GDAL_NODATA tag: {}", e);
            None
        }
    }
}
