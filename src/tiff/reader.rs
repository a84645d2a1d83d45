//! GeoTIFF file reader
//!
//! Reads classic TIFF and BigTIFF single-band elevation rasters into an
//! in-memory `Grid`. Byte-order differences are handled through the
//! Strategy pattern in `crate::io::byte_order`; strip and tile layouts
//! and the compression schemes produced by common DEM exports are all
//! supported.

use log::{debug, info, warn};
use std::fs::File;
use std::io::{BufReader, SeekFrom};
use std::path::Path;

use crate::compression::CompressionFactory;
use crate::errors::{StormError, StormResult};
use crate::grid::Grid;
use crate::io::byte_order::{ByteOrder, ByteOrderHandler};
use crate::io::seekable::SeekableReader;
use crate::tiff::constants::{field_types, header, predictor, tags};
use crate::tiff::georef;
use crate::tiff::ifd::{Ifd, IfdEntry};

/// Reader for single-band GeoTIFF rasters
pub struct GeoTiffReader {
    byte_order: Option<ByteOrder>,
    byte_order_handler: Option<Box<dyn ByteOrderHandler>>,
    is_big_tiff: bool,
}

impl GeoTiffReader {
    /// Creates a new reader
    pub fn new() -> Self {
        GeoTiffReader {
            byte_order: None,
            byte_order_handler: None,
            is_big_tiff: false,
        }
    }

    /// Loads a grid from a file path
    pub fn read_grid_from_path<P: AsRef<Path>>(&mut self, filepath: P) -> StormResult<Grid> {
        let filepath = filepath.as_ref();
        info!("Loading raster: {}", filepath.display());
        let file = File::open(filepath)?;
        let mut reader = BufReader::with_capacity(1024 * 1024, file);
        self.read_grid(&mut reader)
    }

    /// Reads a grid from any seekable reader
    ///
    /// Parses the header and first IFD, extracts georeferencing, and
    /// decodes the first band to `f64` cell values.
    pub fn read_grid(&mut self, reader: &mut dyn SeekableReader) -> StormResult<Grid> {
        let ifd = self.read_first_ifd(reader)?;

        let georef = georef::extract(self, reader, &ifd)?;
        debug!("Georeferencing: transform={:?}, epsg={:?}, nodata={:?}",
               georef.transform, georef.epsg, georef.nodata);

        let (width, height) = self.read_dimensions(reader, &ifd)?;
        let data = self.read_band(reader, &ifd)?;

        Grid::new(
            height as usize,
            width as usize,
            data,
            georef.transform,
            georef.epsg,
            georef.nodata,
        )
    }

    /// Parses the TIFF header and returns the first IFD
    pub fn read_first_ifd(&mut self, reader: &mut dyn SeekableReader) -> StormResult<Ifd> {
        reader.seek(SeekFrom::Start(0))?;

        let byte_order = ByteOrder::detect(reader)?;
        debug!("Byte order: {}", byte_order.name());

        let handler = byte_order.create_handler();
        let version = handler.read_u16(reader)?;
        let first_ifd_offset = match version {
            header::TIFF_VERSION => {
                self.is_big_tiff = false;
                handler.read_u32(reader)? as u64
            }
            header::BIG_TIFF_VERSION => {
                self.is_big_tiff = true;
                let offset_size = handler.read_u16(reader)?;
                if offset_size != header::BIGTIFF_OFFSET_SIZE {
                    return Err(StormError::InvalidHeader);
                }
                let _padding = handler.read_u16(reader)?;
                handler.read_u64(reader)?
            }
            other => return Err(StormError::UnsupportedVersion(other)),
        };

        self.byte_order = Some(byte_order);
        self.byte_order_handler = Some(handler);

        debug!("Format: {}, first IFD at {}",
               if self.is_big_tiff { "BigTIFF" } else { "TIFF" }, first_ifd_offset);

        self.read_ifd(reader, first_ifd_offset)
    }

    /// Reads the IFD at the given file offset
    fn read_ifd(&self, reader: &mut dyn SeekableReader, offset: u64) -> StormResult<Ifd> {
        reader.seek(SeekFrom::Start(offset))?;
        let handler = self.handler()?;

        let entry_count = if self.is_big_tiff {
            handler.read_u64(reader)?
        } else {
            handler.read_u16(reader)? as u64
        };
        debug!("IFD at {} with {} entries", offset, entry_count);

        let mut ifd = Ifd::new(offset);
        for _ in 0..entry_count {
            let tag = handler.read_u16(reader)?;
            let field_type = handler.read_u16(reader)?;
            let (count, value_offset) = if self.is_big_tiff {
                (handler.read_u64(reader)?, handler.read_u64(reader)?)
            } else {
                (handler.read_u32(reader)? as u64, handler.read_u32(reader)? as u64)
            };
            ifd.add_entry(IfdEntry::new(tag, field_type, count, value_offset));
        }

        Ok(ifd)
    }

    /// Reads a single-value integer tag, or None when the tag is absent
    ///
    /// Goes through the inline decoding path, so big-endian files with
    /// left-justified inline SHORT values are handled correctly.
    pub fn read_tag_scalar(
        &self,
        reader: &mut dyn SeekableReader,
        ifd: &Ifd,
        tag: u16,
    ) -> StormResult<Option<u64>> {
        if !ifd.has_tag(tag) {
            return Ok(None);
        }
        Ok(self.read_tag_u64s(reader, ifd, tag)?.into_iter().next())
    }

    /// Image width and height from their tags
    fn read_dimensions(
        &self,
        reader: &mut dyn SeekableReader,
        ifd: &Ifd,
    ) -> StormResult<(u64, u64)> {
        let width = self.read_tag_scalar(reader, ifd, tags::IMAGE_WIDTH)?
            .ok_or(StormError::MissingDimensions)?;
        let height = self.read_tag_scalar(reader, ifd, tags::IMAGE_LENGTH)?
            .ok_or(StormError::MissingDimensions)?;
        Ok((width, height))
    }

    /// Reads a tag's values as unsigned integers
    ///
    /// Handles SHORT, LONG and LONG8 arrays, both inline and external.
    pub fn read_tag_u64s(
        &self,
        reader: &mut dyn SeekableReader,
        ifd: &Ifd,
        tag: u16,
    ) -> StormResult<Vec<u64>> {
        let entry = ifd.get_entry(tag).ok_or(StormError::TagNotFound(tag))?;

        if entry.is_value_inline(self.is_big_tiff) {
            return self.inline_u64s(entry);
        }

        reader.seek(SeekFrom::Start(entry.value_offset))?;
        let handler = self.handler()?;
        let mut values = Vec::with_capacity(entry.count as usize);
        for _ in 0..entry.count {
            let value = match entry.field_type {
                field_types::BYTE => {
                    let mut byte = [0u8; 1];
                    reader.read_exact(&mut byte)?;
                    byte[0] as u64
                }
                field_types::SHORT => handler.read_u16(reader)? as u64,
                field_types::LONG => handler.read_u32(reader)? as u64,
                field_types::LONG8 => handler.read_u64(reader)?,
                other => return Err(StormError::UnsupportedFieldType(other)),
            };
            values.push(value);
        }
        Ok(values)
    }

    /// Reads a tag's values as doubles
    ///
    /// Handles FLOAT and DOUBLE arrays; DOUBLE values are never inline
    /// in classic TIFF but may be in BigTIFF.
    pub fn read_tag_f64s(
        &self,
        reader: &mut dyn SeekableReader,
        ifd: &Ifd,
        tag: u16,
    ) -> StormResult<Vec<f64>> {
        let entry = ifd.get_entry(tag).ok_or(StormError::TagNotFound(tag))?;

        if entry.is_value_inline(self.is_big_tiff) {
            return match entry.field_type {
                field_types::FLOAT => Ok(self.inline_u64s(entry)?
                    .iter()
                    .map(|&bits| f32::from_bits(bits as u32) as f64)
                    .collect()),
                field_types::DOUBLE => Ok(vec![f64::from_bits(entry.value_offset)]),
                other => Err(StormError::UnsupportedFieldType(other)),
            };
        }

        reader.seek(SeekFrom::Start(entry.value_offset))?;
        let handler = self.handler()?;
        let mut values = Vec::with_capacity(entry.count as usize);
        for _ in 0..entry.count {
            let value = match entry.field_type {
                field_types::FLOAT => handler.read_f32(reader)? as f64,
                field_types::DOUBLE => handler.read_f64(reader)?,
                other => return Err(StormError::UnsupportedFieldType(other)),
            };
            values.push(value);
        }
        Ok(values)
    }

    /// Reads an ASCII tag as a string, with trailing nulls removed
    pub fn read_tag_ascii(
        &self,
        reader: &mut dyn SeekableReader,
        ifd: &Ifd,
        tag: u16,
    ) -> StormResult<String> {
        let entry = ifd.get_entry(tag).ok_or(StormError::TagNotFound(tag))?;

        let mut buffer = if entry.is_value_inline(self.is_big_tiff) {
            self.inline_bytes(entry)
        } else {
            reader.seek(SeekFrom::Start(entry.value_offset))?;
            let mut buffer = vec![0u8; entry.count as usize];
            reader.read_exact(&mut buffer)?;
            buffer
        };

        while buffer.last() == Some(&0) {
            buffer.pop();
        }

        String::from_utf8(buffer)
            .map_err(|e| StormError::GenericError(format!("Invalid ASCII tag value: {}", e)))
    }

    /// Decodes the first band of the image into row-major f64 values
    fn read_band(&self, reader: &mut dyn SeekableReader, ifd: &Ifd) -> StormResult<Vec<f64>> {
        let (width, height) = self.read_dimensions(reader, ifd)?;
        let (width, height) = (width as usize, height as usize);

        let samples = self.read_tag_scalar(reader, ifd, tags::SAMPLES_PER_PIXEL)?.unwrap_or(1);
        if samples != 1 {
            return Err(StormError::GenericError(format!(
                "Expected a single-band raster, found {} samples per pixel", samples
            )));
        }

        if let Some(pred) = self.read_tag_scalar(reader, ifd, tags::PREDICTOR)? {
            if pred != predictor::NONE as u64 {
                return Err(StormError::GenericError(format!(
                    "Predictor {} is not supported", pred
                )));
            }
        }

        let bits = self.read_tag_scalar(reader, ifd, tags::BITS_PER_SAMPLE)?
            .unwrap_or(8) as u16;
        let format = self.read_tag_scalar(reader, ifd, tags::SAMPLE_FORMAT)?
            .unwrap_or(crate::tiff::constants::sample_format::UNSIGNED as u64) as u16;

        let compression_code = self.read_tag_scalar(reader, ifd, tags::COMPRESSION)?.unwrap_or(1);
        let compressor = CompressionFactory::create_handler(compression_code)?;
        debug!("Decoding band: {}x{}, {} bits, format {}, compression {}",
               width, height, bits, format, compressor.name());

        if ifd.is_tiled() {
            self.read_tiled_band(reader, ifd, width, height, bits, format, compressor.as_ref())
        } else {
            self.read_striped_band(reader, ifd, width, height, bits, format, compressor.as_ref())
        }
    }

    /// Decodes strip-organized image data
    fn read_striped_band(
        &self,
        reader: &mut dyn SeekableReader,
        ifd: &Ifd,
        width: usize,
        height: usize,
        bits: u16,
        format: u16,
        compressor: &dyn crate::compression::CompressionHandler,
    ) -> StormResult<Vec<f64>> {
        let offsets = self.read_tag_u64s(reader, ifd, tags::STRIP_OFFSETS)?;
        let byte_counts = self.read_tag_u64s(reader, ifd, tags::STRIP_BYTE_COUNTS)?;
        let rows_per_strip = self.read_tag_scalar(reader, ifd, tags::ROWS_PER_STRIP)?
            .unwrap_or(height as u64) as usize;

        if offsets.len() != byte_counts.len() {
            return Err(StormError::GenericError(
                "Strip offsets and byte counts disagree".to_string()));
        }

        let mut data = Vec::with_capacity(width * height);
        for (i, (&offset, &count)) in offsets.iter().zip(byte_counts.iter()).enumerate() {
            // A file may declare more strips than the height can hold
            let remaining = height.checked_sub(i * rows_per_strip)
                .ok_or_else(|| StormError::GenericError(
                    "More strips than the image height allows".to_string()))?;
            if remaining == 0 {
                return Err(StormError::GenericError(
                    "More strips than the image height allows".to_string()));
            }
            let strip_rows = rows_per_strip.min(remaining);
            let raw = read_chunk(reader, offset, count as usize)?;
            let decompressed = compressor.decompress(&raw)?;
            self.decode_samples(&decompressed, bits, format, strip_rows * width, &mut data)?;
        }

        if data.len() != width * height {
            warn!("Decoded {} samples, expected {}", data.len(), width * height);
            return Err(StormError::GenericError(
                "Band data does not match image dimensions".to_string()));
        }
        Ok(data)
    }

    /// Decodes tile-organized image data
    ///
    /// Edge tiles are padded to the full tile size in the file; the
    /// out-of-bounds portion is discarded when copying into the band.
    fn read_tiled_band(
        &self,
        reader: &mut dyn SeekableReader,
        ifd: &Ifd,
        width: usize,
        height: usize,
        bits: u16,
        format: u16,
        compressor: &dyn crate::compression::CompressionHandler,
    ) -> StormResult<Vec<f64>> {
        let tile_width = self.read_tag_scalar(reader, ifd, tags::TILE_WIDTH)?
            .ok_or(StormError::TagNotFound(tags::TILE_WIDTH))? as usize;
        let tile_length = self.read_tag_scalar(reader, ifd, tags::TILE_LENGTH)?
            .ok_or(StormError::TagNotFound(tags::TILE_LENGTH))? as usize;
        let offsets = self.read_tag_u64s(reader, ifd, tags::TILE_OFFSETS)?;
        let byte_counts = self.read_tag_u64s(reader, ifd, tags::TILE_BYTE_COUNTS)?;

        let tiles_across = width.div_ceil(tile_width);
        let tiles_down = height.div_ceil(tile_length);
        if offsets.len() < tiles_across * tiles_down {
            return Err(StormError::GenericError(
                "Tile offsets do not cover the image".to_string()));
        }

        let mut data = vec![0.0f64; width * height];
        for tile_row in 0..tiles_down {
            for tile_col in 0..tiles_across {
                let tile_index = tile_row * tiles_across + tile_col;
                let raw = read_chunk(reader, offsets[tile_index], byte_counts[tile_index] as usize)?;
                let decompressed = compressor.decompress(&raw)?;

                let mut tile = Vec::with_capacity(tile_width * tile_length);
                self.decode_samples(&decompressed, bits, format,
                                    tile_width * tile_length, &mut tile)?;

                let row0 = tile_row * tile_length;
                let col0 = tile_col * tile_width;
                for r in 0..tile_length.min(height - row0) {
                    for c in 0..tile_width.min(width - col0) {
                        data[(row0 + r) * width + col0 + c] = tile[r * tile_width + c];
                    }
                }
            }
        }
        Ok(data)
    }

    /// Converts raw sample bytes to f64 values
    fn decode_samples(
        &self,
        bytes: &[u8],
        bits: u16,
        format: u16,
        count: usize,
        out: &mut Vec<f64>,
    ) -> StormResult<()> {
        use crate::tiff::constants::sample_format as sf;

        let handler = self.handler()?;
        let sample_size = (bits / 8) as usize;
        if bytes.len() < count * sample_size {
            return Err(StormError::GenericError(format!(
                "Sample data truncated: {} bytes for {} samples of {} bits",
                bytes.len(), count, bits
            )));
        }

        for i in 0..count {
            let chunk = &bytes[i * sample_size..(i + 1) * sample_size];
            let value = match (bits, format) {
                (8, sf::UNSIGNED) => chunk[0] as f64,
                (8, sf::SIGNED) => chunk[0] as i8 as f64,
                (16, sf::UNSIGNED) => handler.u16_from_bytes(chunk) as f64,
                (16, sf::SIGNED) => handler.u16_from_bytes(chunk) as i16 as f64,
                (32, sf::UNSIGNED) => handler.u32_from_bytes(chunk) as f64,
                (32, sf::SIGNED) => handler.u32_from_bytes(chunk) as i32 as f64,
                (32, sf::IEEEFP) => f32::from_bits(handler.u32_from_bytes(chunk)) as f64,
                (64, sf::IEEEFP) => f64::from_bits(handler.u64_from_bytes(chunk)),
                (64, sf::UNSIGNED) => handler.u64_from_bytes(chunk) as f64,
                (64, sf::SIGNED) => handler.u64_from_bytes(chunk) as i64 as f64,
                _ => return Err(StormError::UnsupportedSampleFormat(bits, format)),
            };
            out.push(value);
        }
        Ok(())
    }

    /// Extracts inline values from an entry's value/offset field
    ///
    /// Inline values were packed into the raw bytes the value/offset
    /// field occupied on disk, so unpacking depends on the byte order
    /// the field was read with.
    fn inline_u64s(&self, entry: &IfdEntry) -> StormResult<Vec<u64>> {
        let bytes = self.inline_bytes(entry);
        let handler = self.handler()?;
        let size = entry.field_type_size();
        let mut values = Vec::with_capacity(entry.count as usize);
        for i in 0..entry.count as usize {
            let chunk = &bytes[i * size..(i + 1) * size];
            let value = match entry.field_type {
                field_types::BYTE => chunk[0] as u64,
                field_types::SHORT => handler.u16_from_bytes(chunk) as u64,
                field_types::LONG => handler.u32_from_bytes(chunk) as u64,
                field_types::LONG8 => handler.u64_from_bytes(chunk),
                field_types::FLOAT => handler.u32_from_bytes(chunk) as u64,
                other => return Err(StormError::UnsupportedFieldType(other)),
            };
            values.push(value);
        }
        Ok(values)
    }

    /// Reconstructs the on-disk bytes of the value/offset field
    fn inline_bytes(&self, entry: &IfdEntry) -> Vec<u8> {
        let big_endian = self.byte_order == Some(ByteOrder::BigEndian);
        let total = entry.field_type_size() * entry.count as usize;
        if self.is_big_tiff {
            let raw = if big_endian {
                entry.value_offset.to_be_bytes()
            } else {
                entry.value_offset.to_le_bytes()
            };
            raw[..total.min(8)].to_vec()
        } else {
            let raw = if big_endian {
                (entry.value_offset as u32).to_be_bytes()
            } else {
                (entry.value_offset as u32).to_le_bytes()
            };
            raw[..total.min(4)].to_vec()
        }
    }

    /// Whether the current file is BigTIFF
    pub fn is_big_tiff(&self) -> bool {
        self.is_big_tiff
    }

    fn handler(&self) -> StormResult<&dyn ByteOrderHandler> {
        self.byte_order_handler
            .as_deref()
            .ok_or_else(|| StormError::GenericError("Byte order not yet determined".to_string()))
    }
}

impl Default for GeoTiffReader {
    fn default() -> Self {
        Self::new()
    }
}

/// Reads `count` bytes at `offset`
fn read_chunk(reader: &mut dyn SeekableReader, offset: u64, count: usize) -> StormResult<Vec<u8>> {
    reader.seek(SeekFrom::Start(offset))?;
    let mut buffer = vec![0u8; count];
    reader.read_exact(&mut buffer)?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compression::UncompressedHandler;
    use std::io::Cursor;

    #[test]
    fn extra_strips_are_rejected_not_decoded() {
        let reader = GeoTiffReader {
            byte_order: Some(ByteOrder::LittleEndian),
            byte_order_handler: Some(ByteOrder::LittleEndian.create_handler()),
            is_big_tiff: true,
        };

        // 2x2 float band, but the file declares a second strip that
        // starts past the image height
        let mut ifd = Ifd::new(0);
        ifd.add_entry(IfdEntry::new(
            tags::STRIP_OFFSETS, field_types::LONG, 2, 16u64 << 32));
        ifd.add_entry(IfdEntry::new(
            tags::STRIP_BYTE_COUNTS, field_types::LONG, 2, 16 | (16u64 << 32)));

        let mut data = Cursor::new(vec![0u8; 32]);
        let result = reader.read_striped_band(
            &mut data, &ifd, 2, 2, 32,
            crate::tiff::constants::sample_format::IEEEFP,
            &UncompressedHandler);
        assert!(matches!(result, Err(StormError::GenericError(_))));
    }
}
