//! GeoTIFF file writer
//!
//! Writes a `Grid` back to disk as a classic little-endian GeoTIFF:
//! one band of 32-bit IEEE floats in a single strip, with pixel scale,
//! tiepoint, GeoKey directory and GDAL_NODATA tags so other tools can
//! georeference the result. Used by the tile merge to persist mosaics.

use byteorder::{LittleEndian, WriteBytesExt};
use log::info;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::compression::{CompressionFactory, CompressionHandler};
use crate::errors::{StormError, StormResult};
use crate::geometry::crs;
use crate::grid::Grid;
use crate::tiff::constants::{
    field_types, geo_keys, header, model_type, photometric,
    planar_config, raster_type, sample_format, tags,
};

/// Writer for single-band GeoTIFF rasters
pub struct GeoTiffWriter {
    compressor: Box<dyn CompressionHandler>,
}

/// A pending IFD entry with either an inline value or external payload
enum TagValue {
    Short(u16),
    Long(u32),
    Doubles(Vec<f64>),
    Shorts(Vec<u16>),
    Ascii(String),
}

impl GeoTiffWriter {
    /// Creates a writer producing uncompressed output
    pub fn new() -> Self {
        GeoTiffWriter {
            compressor: Box::new(crate::compression::UncompressedHandler),
        }
    }

    /// Creates a writer using the named compression ("none", "deflate", "zstd")
    pub fn with_compression(name: &str) -> StormResult<Self> {
        Ok(GeoTiffWriter {
            compressor: CompressionFactory::get_handler_by_name(name)?,
        })
    }

    /// Writes the grid to `output_path`, overwriting any existing file
    pub fn write_grid<P: AsRef<Path>>(&self, grid: &Grid, output_path: P) -> StormResult<()> {
        let output_path = output_path.as_ref();
        info!("Writing raster: {} ({}x{}, {})",
              output_path.display(), grid.cols(), grid.rows(), self.compressor.name());

        let bytes = self.build(grid)?;
        let file = File::create(output_path)?;
        let mut writer = BufWriter::with_capacity(1024 * 1024, file);
        writer.write_all(&bytes)?;
        writer.flush()?;
        Ok(())
    }

    /// Assembles the complete file in memory
    ///
    /// Layout: header, strip data, external tag payloads, IFD. The
    /// first-IFD offset in the header is patched once the IFD position
    /// is known.
    pub fn build(&self, grid: &Grid) -> StormResult<Vec<u8>> {
        let strip = self.encode_strip(grid)?;
        let entries = self.collect_tags(grid, strip.len() as u32)?;

        let mut out: Vec<u8> = Vec::with_capacity(strip.len() + 1024);

        // Classic TIFF header, little-endian
        out.write_u16::<LittleEndian>(0x4949)?;
        out.write_u16::<LittleEndian>(header::TIFF_VERSION)?;
        out.write_u32::<LittleEndian>(0)?; // patched below

        // Strip data lives immediately after the header
        let strip_offset = out.len() as u32;
        out.extend_from_slice(&strip);
        if out.len() % 2 == 1 {
            out.push(0);
        }

        // External payloads, recording where each lands
        let mut external_offsets: Vec<Option<u32>> = Vec::with_capacity(entries.len());
        for (_, value) in &entries {
            external_offsets.push(Self::write_external(&mut out, value)?);
        }
        if out.len() % 2 == 1 {
            out.push(0);
        }

        // The IFD itself
        let ifd_offset = out.len() as u32;
        out.write_u16::<LittleEndian>(entries.len() as u16)?;
        for ((tag, value), external) in entries.iter().zip(external_offsets.iter()) {
            Self::write_entry(&mut out, *tag, value, *external, strip_offset)?;
        }
        out.write_u32::<LittleEndian>(0)?; // no further IFDs

        // Patch the first-IFD offset in the header
        out[4..8].copy_from_slice(&ifd_offset.to_le_bytes());
        Ok(out)
    }

    /// Encodes the band into one (optionally compressed) strip of f32 samples
    fn encode_strip(&self, grid: &Grid) -> StormResult<Vec<u8>> {
        let mut raw = Vec::with_capacity(grid.data().len() * 4);
        for &value in grid.data() {
            raw.write_f32::<LittleEndian>(value as f32)?;
        }
        self.compressor.compress(&raw)
    }

    /// Builds the tag list, sorted ascending as the TIFF spec requires
    fn collect_tags(&self, grid: &Grid, strip_bytes: u32) -> StormResult<Vec<(u16, TagValue)>> {
        let transform = grid.transform();
        if transform.pixel_height >= 0.0 {
            return Err(StormError::GenericError(
                "Only north-up grids can be written".to_string()));
        }

        let mut entries: Vec<(u16, TagValue)> = vec![
            (tags::IMAGE_WIDTH, TagValue::Long(grid.cols() as u32)),
            (tags::IMAGE_LENGTH, TagValue::Long(grid.rows() as u32)),
            (tags::BITS_PER_SAMPLE, TagValue::Short(32)),
            (tags::COMPRESSION, TagValue::Short(self.compressor.code() as u16)),
            (tags::PHOTOMETRIC_INTERPRETATION, TagValue::Short(photometric::BLACK_IS_ZERO)),
            (tags::STRIP_OFFSETS, TagValue::Long(0)), // strip offset patched per entry
            (tags::SAMPLES_PER_PIXEL, TagValue::Short(1)),
            (tags::ROWS_PER_STRIP, TagValue::Long(grid.rows() as u32)),
            (tags::STRIP_BYTE_COUNTS, TagValue::Long(strip_bytes)),
            (tags::PLANAR_CONFIGURATION, TagValue::Short(planar_config::CHUNKY)),
            (tags::SAMPLE_FORMAT, TagValue::Short(sample_format::IEEEFP)),
            (tags::MODEL_PIXEL_SCALE_TAG, TagValue::Doubles(vec![
                transform.pixel_width,
                -transform.pixel_height,
                0.0,
            ])),
            (tags::MODEL_TIEPOINT_TAG, TagValue::Doubles(vec![
                0.0, 0.0, 0.0,
                transform.origin_x, transform.origin_y, 0.0,
            ])),
        ];

        if let Some(epsg) = grid.epsg() {
            entries.push((tags::GEO_KEY_DIRECTORY_TAG,
                          TagValue::Shorts(Self::geo_key_directory(epsg))));
        }
        if let Some(nodata) = grid.nodata() {
            entries.push((tags::GDAL_NODATA, TagValue::Ascii(format!("{}\u{0}", nodata))));
        }

        entries.sort_by_key(|(tag, _)| *tag);
        Ok(entries)
    }

    /// Builds the GeoKey directory shorts for an EPSG code
    fn geo_key_directory(epsg: u32) -> Vec<u16> {
        let geographic = crs::is_geographic(epsg);
        let (cs_key, model) = if geographic {
            (geo_keys::GEOGRAPHIC_TYPE, model_type::GEOGRAPHIC)
        } else {
            (geo_keys::PROJECTED_CS_TYPE, model_type::PROJECTED)
        };

        let mut keys = vec![
            (geo_keys::MODEL_TYPE, model),
            (geo_keys::RASTER_TYPE, raster_type::PIXEL_IS_AREA),
            (cs_key, epsg as u16),
        ];
        keys.sort_by_key(|(id, _)| *id);

        let mut shorts = vec![1, 1, 0, keys.len() as u16];
        for (id, value) in keys {
            shorts.extend_from_slice(&[id, 0, 1, value]);
        }
        shorts
    }

    /// Writes an external payload if the value does not fit inline
    fn write_external(out: &mut Vec<u8>, value: &TagValue) -> StormResult<Option<u32>> {
        match value {
            TagValue::Doubles(values) => {
                let offset = out.len() as u32;
                for &v in values {
                    out.write_f64::<LittleEndian>(v)?;
                }
                Ok(Some(offset))
            }
            TagValue::Shorts(values) if values.len() > 2 => {
                let offset = out.len() as u32;
                for &v in values {
                    out.write_u16::<LittleEndian>(v)?;
                }
                Ok(Some(offset))
            }
            TagValue::Ascii(text) if text.len() > 4 => {
                let offset = out.len() as u32;
                out.extend_from_slice(text.as_bytes());
                if out.len() % 2 == 1 {
                    out.push(0);
                }
                Ok(Some(offset))
            }
            _ => Ok(None),
        }
    }

    /// Writes one 12-byte IFD entry
    fn write_entry(
        out: &mut Vec<u8>,
        tag: u16,
        value: &TagValue,
        external_offset: Option<u32>,
        strip_offset: u32,
    ) -> StormResult<()> {
        out.write_u16::<LittleEndian>(tag)?;
        match value {
            TagValue::Short(v) => {
                out.write_u16::<LittleEndian>(field_types::SHORT)?;
                out.write_u32::<LittleEndian>(1)?;
                out.write_u16::<LittleEndian>(*v)?;
                out.write_u16::<LittleEndian>(0)?;
            }
            TagValue::Long(v) => {
                out.write_u16::<LittleEndian>(field_types::LONG)?;
                out.write_u32::<LittleEndian>(1)?;
                let value = if tag == tags::STRIP_OFFSETS { strip_offset } else { *v };
                out.write_u32::<LittleEndian>(value)?;
            }
            TagValue::Doubles(values) => {
                out.write_u16::<LittleEndian>(field_types::DOUBLE)?;
                out.write_u32::<LittleEndian>(values.len() as u32)?;
                out.write_u32::<LittleEndian>(external_offset.unwrap_or(0))?;
            }
            TagValue::Shorts(values) => {
                out.write_u16::<LittleEndian>(field_types::SHORT)?;
                out.write_u32::<LittleEndian>(values.len() as u32)?;
                match external_offset {
                    Some(offset) => out.write_u32::<LittleEndian>(offset)?,
                    None => {
                        for &v in values {
                            out.write_u16::<LittleEndian>(v)?;
                        }
                        for _ in values.len()..2 {
                            out.write_u16::<LittleEndian>(0)?;
                        }
                    }
                }
            }
            TagValue::Ascii(text) => {
                out.write_u16::<LittleEndian>(field_types::ASCII)?;
                out.write_u32::<LittleEndian>(text.len() as u32)?;
                match external_offset {
                    Some(offset) => out.write_u32::<LittleEndian>(offset)?,
                    None => {
                        let mut padded = [0u8; 4];
                        padded[..text.len()].copy_from_slice(text.as_bytes());
                        out.extend_from_slice(&padded);
                    }
                }
            }
        }
        Ok(())
    }
}

impl Default for GeoTiffWriter {
    fn default() -> Self {
        Self::new()
    }
}
