//! Depth point extraction command
//!
//! Emits one WGS84 point per raster cell above the depth threshold,
//! carrying the raw depth value, and writes them as GeoJSON.

use std::path::PathBuf;

use clap::ArgMatches;
use log::info;

use crate::commands::command_traits::Command;
use crate::commands::load_grid;
use crate::errors::{StormError, StormResult};
use crate::geojson::{self, POINT_SUFFIX};
use crate::geometry::CrsTransformer;
use crate::tiff::constants::epsg;
use crate::vectorize::points::{extract_points, DEFAULT_POINT_THRESHOLD};

/// Command for extracting depth points
pub struct PointsCommand {
    /// Path to the input raster
    input: PathBuf,
    /// Path for the GeoJSON output
    output: PathBuf,
    /// EPSG code to assume when the raster declares none
    epsg_override: Option<u32>,
    /// Depth below which cells produce no point
    threshold: f64,
}

impl PointsCommand {
    /// Create a new points command from CLI arguments
    pub fn new(args: &ArgMatches) -> StormResult<Self> {
        let input = PathBuf::from(args.get_one::<String>("input")
            .ok_or_else(|| StormError::GenericError("Missing input file".to_string()))?);

        let output = match args.get_one::<String>("output") {
            Some(path) => PathBuf::from(path),
            None => geojson::derive_output_path(&input, POINT_SUFFIX),
        };

        Ok(PointsCommand {
            input,
            output,
            epsg_override: args.get_one::<u32>("epsg").copied(),
            threshold: args.get_one::<f64>("threshold")
                .copied()
                .unwrap_or(DEFAULT_POINT_THRESHOLD),
        })
    }
}

impl Command for PointsCommand {
    fn execute(&self) -> StormResult<()> {
        info!("Extracting depth points from {} above {} m",
              self.input.display(), self.threshold);

        let grid = load_grid(&self.input, self.epsg_override)?;
        let collection = extract_points(&grid, self.threshold);
        let collection = CrsTransformer::reproject_collection(&collection, epsg::WGS84)?;
        geojson::write_collection(&collection, &self.output)
    }
}
