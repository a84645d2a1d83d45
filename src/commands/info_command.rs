//! Raster information command
//!
//! The default CLI action: prints the structure and georeferencing of
//! a depth raster without producing any output file.

use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use clap::ArgMatches;
use log::info;

use crate::commands::command_traits::Command;
use crate::errors::{StormError, StormResult};
use crate::geometry::crs;
use crate::tiff::GeoTiffReader;
use crate::utils::logger::Logger;

/// Command for displaying raster structure and statistics
pub struct InfoCommand<'a> {
    /// Path to the input raster
    input: PathBuf,
    /// Whether to list every IFD entry
    verbose: bool,
    /// Logger for recording operations
    logger: &'a Logger,
}

impl<'a> InfoCommand<'a> {
    /// Create a new info command from CLI arguments
    pub fn new(args: &ArgMatches, logger: &'a Logger) -> StormResult<Self> {
        let input = PathBuf::from(args.get_one::<String>("input")
            .ok_or_else(|| StormError::GenericError("Missing input file".to_string()))?);

        Ok(InfoCommand {
            input,
            verbose: args.get_flag("verbose"),
            logger,
        })
    }
}

impl<'a> Command for InfoCommand<'a> {
    fn execute(&self) -> StormResult<()> {
        let mut reader = GeoTiffReader::new();

        // Structure pass first, while the grid is not yet in memory
        let file = File::open(&self.input)?;
        let mut buf_reader = BufReader::new(file);
        let ifd = reader.read_first_ifd(&mut buf_reader)?;

        info!("Raster: {}", self.input.display());
        info!("  Format: {}", if reader.is_big_tiff() { "BigTIFF" } else { "TIFF" });
        info!("  Layout: {}", if ifd.is_tiled() { "tiled" } else { "striped" });
        info!("  IFD entries: {} (offset {})", ifd.entries.len(), ifd.offset);

        if self.verbose {
            for entry in &ifd.entries {
                self.logger.log_line(&format!(
                    "  Tag {}: type {}, count {}, value/offset {}",
                    entry.tag, entry.field_type, entry.count, entry.value_offset))?;
            }
        }

        let grid = reader.read_grid(&mut buf_reader)?;
        let transform = grid.transform();
        let (west, south, east, north) = grid.bounds();

        info!("  Dimensions: {} columns x {} rows", grid.cols(), grid.rows());
        info!("  Resolution: {} x {}", transform.pixel_width, transform.pixel_height.abs());
        info!("  Bounds: ({}, {}) to ({}, {})", west, south, east, north);

        match grid.epsg() {
            Some(code) => info!("  Reference: EPSG:{} ({})", code, crs::name(code)),
            None => info!("  Reference: not declared"),
        }
        match grid.nodata() {
            Some(nodata) => info!("  Nodata: {}", nodata),
            None => info!("  Nodata: not declared"),
        }
        match grid.value_range() {
            Some((min, max)) => info!("  Depth range: {} to {}", min, max),
            None => info!("  Depth range: no valid cells"),
        }

        Ok(())
    }
}
