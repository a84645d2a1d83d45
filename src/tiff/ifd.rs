//! Image File Directory (IFD) structures
//!
//! An IFD is the TIFF metadata table: a series of tag entries, each
//! describing one aspect of the image. This crate only ever cares about
//! the first IFD of a file (single-band elevation rasters), but the
//! structures make no such assumption.

use std::collections::HashMap;
use std::fmt;

use crate::tiff::constants::{field_types, tags};

/// An Image File Directory in a TIFF file
#[derive(Debug, Clone)]
pub struct Ifd {
    /// Entries in this IFD
    pub entries: Vec<IfdEntry>,
    /// Offset to this IFD in the file
    pub offset: u64,
    /// Cached tag values for quick lookup
    tag_map: HashMap<u16, IfdEntry>,
}

/// A single entry in an IFD
///
/// For small values, `value_offset` holds the value itself; for larger
/// ones it holds the file offset where the values are stored.
#[derive(Debug, Clone, Copy)]
pub struct IfdEntry {
    /// TIFF tag identifier
    pub tag: u16,
    /// Field type
    pub field_type: u16,
    /// Number of values
    pub count: u64,
    /// Value or offset to values
    pub value_offset: u64,
}

impl IfdEntry {
    /// Creates a new IFD entry
    pub fn new(tag: u16, field_type: u16, count: u64, value_offset: u64) -> Self {
        Self { tag, field_type, count, value_offset }
    }

    /// Size in bytes of a single value of this entry's field type
    pub fn field_type_size(&self) -> usize {
        match self.field_type {
            field_types::BYTE | field_types::ASCII
            | field_types::SBYTE | field_types::UNDEFINED => 1,
            field_types::SHORT | field_types::SSHORT => 2,
            field_types::LONG | field_types::SLONG | field_types::FLOAT => 4,
            field_types::RATIONAL | field_types::SRATIONAL | field_types::DOUBLE => 8,
            field_types::LONG8 | field_types::SLONG8 | field_types::IFD8 => 8,
            _ => 1,
        }
    }

    /// Whether the value fits inline in the value/offset field
    ///
    /// Classic TIFF inlines up to 4 bytes, BigTIFF up to 8.
    pub fn is_value_inline(&self, is_big_tiff: bool) -> bool {
        let total_size = self.field_type_size() * self.count as usize;
        let inline_size = if is_big_tiff { 8 } else { 4 };
        total_size <= inline_size
    }
}

impl Ifd {
    /// Creates a new empty IFD at the given file offset
    pub fn new(offset: u64) -> Self {
        Self {
            entries: Vec::new(),
            offset,
            tag_map: HashMap::new(),
        }
    }

    /// Adds an entry and updates the tag lookup cache
    pub fn add_entry(&mut self, entry: IfdEntry) {
        self.tag_map.insert(entry.tag, entry);
        self.entries.push(entry);
    }

    /// Gets a tag's raw value/offset field
    ///
    /// Only meaningful as a value for inline LONG/LONG8 entries; use
    /// the reader's tag accessors for anything byte-order sensitive.
    pub fn get_tag_value(&self, tag: u16) -> Option<u64> {
        self.tag_map.get(&tag).map(|entry| entry.value_offset)
    }

    /// Checks whether this IFD has a specific tag
    pub fn has_tag(&self, tag: u16) -> bool {
        self.tag_map.contains_key(&tag)
    }

    /// Gets the full entry for a tag
    pub fn get_entry(&self, tag: u16) -> Option<&IfdEntry> {
        self.tag_map.get(&tag)
    }

    /// Image width and height, if both tags are present
    pub fn dimensions(&self) -> Option<(u64, u64)> {
        let width = self.get_tag_value(tags::IMAGE_WIDTH)?;
        let height = self.get_tag_value(tags::IMAGE_LENGTH)?;
        Some((width, height))
    }

    /// Whether the image data is organized in tiles rather than strips
    pub fn is_tiled(&self) -> bool {
        self.has_tag(tags::TILE_OFFSETS)
    }
}

impl fmt::Display for Ifd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "IFD (offset: {})", self.offset)?;
        writeln!(f, "  Number of entries: {}", self.entries.len())?;
        if let Some((width, height)) = self.dimensions() {
            writeln!(f, "  Dimensions: {}x{}", width, height)?;
        }
        for entry in &self.entries {
            writeln!(f, "    Tag {}: type={}, count={}, value/offset={}",
                     entry.tag, entry.field_type, entry.count, entry.value_offset)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inline_threshold_depends_on_format() {
        // 3 doubles never fit inline; 4 shorts fit only in BigTIFF
        let doubles = IfdEntry::new(tags::MODEL_PIXEL_SCALE_TAG, field_types::DOUBLE, 3, 0);
        assert!(!doubles.is_value_inline(false));
        assert!(!doubles.is_value_inline(true));

        let shorts = IfdEntry::new(tags::BITS_PER_SAMPLE, field_types::SHORT, 4, 0);
        assert!(!shorts.is_value_inline(false));
        assert!(shorts.is_value_inline(true));
    }

    #[test]
    fn entries_are_indexed_by_tag() {
        let mut ifd = Ifd::new(8);
        ifd.add_entry(IfdEntry::new(tags::IMAGE_WIDTH, field_types::LONG, 1, 640));
        ifd.add_entry(IfdEntry::new(tags::IMAGE_LENGTH, field_types::LONG, 1, 480));
        ifd.add_entry(IfdEntry::new(tags::TILE_OFFSETS, field_types::LONG, 4, 4096));

        assert!(ifd.has_tag(tags::IMAGE_WIDTH));
        assert!(!ifd.has_tag(tags::COMPRESSION));
        assert_eq!(ifd.dimensions(), Some((640, 480)));
        assert!(ifd.is_tiled());
        assert_eq!(ifd.get_entry(tags::TILE_OFFSETS).map(|e| e.count), Some(4));
    }
}
