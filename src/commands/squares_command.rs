//! Point-to-square conversion command
//!
//! Reads a points GeoJSON produced by the points command and writes a
//! polygons GeoJSON with one cell-sized square per point.

use std::path::PathBuf;

use clap::ArgMatches;
use log::info;

use crate::commands::command_traits::Command;
use crate::errors::{StormError, StormResult};
use crate::geojson::{self, SQUARE_SUFFIX};
use crate::squares;

/// Command for converting depth points to square footprints
pub struct SquaresCommand {
    /// Path to the points GeoJSON input
    input: PathBuf,
    /// Path for the GeoJSON output
    output: PathBuf,
    /// Square side length; estimated from point spacing when absent
    size: Option<f64>,
}

impl SquaresCommand {
    /// Create a new squares command from CLI arguments
    pub fn new(args: &ArgMatches) -> StormResult<Self> {
        let input = PathBuf::from(args.get_one::<String>("input")
            .ok_or_else(|| StormError::GenericError("Missing input file".to_string()))?);

        let output = match args.get_one::<String>("output") {
            Some(path) => PathBuf::from(path),
            None => geojson::derive_output_path(&input, SQUARE_SUFFIX),
        };

        Ok(SquaresCommand {
            input,
            output,
            size: args.get_one::<f64>("size").copied(),
        })
    }
}

impl Command for SquaresCommand {
    fn execute(&self) -> StormResult<()> {
        info!("Converting points in {} to squares", self.input.display());

        let points = geojson::read_points(&self.input)?;
        let size = match self.size {
            Some(size) => size,
            None => squares::estimate_cell_size(&points)?,
        };
        let collection = squares::points_to_squares(&points, size)?;
        geojson::write_collection(&collection, &self.output)
    }
}
