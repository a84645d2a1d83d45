//! Depth polygon extraction command
//!
//! Classifies a depth raster into intervals, outlines each connected
//! same-class region, reprojects to WGS84 and writes a GeoJSON file.

use std::path::PathBuf;

use clap::ArgMatches;
use log::info;

use crate::classify::DepthBins;
use crate::commands::command_traits::Command;
use crate::commands::load_grid;
use crate::errors::{StormError, StormResult};
use crate::geojson::{self, POLYGON_SUFFIX};
use crate::geometry::CrsTransformer;
use crate::tiff::constants::epsg;
use crate::vectorize::extract_polygons;

/// Command for extracting classified depth polygons
pub struct PolygonsCommand {
    /// Path to the input raster
    input: PathBuf,
    /// Path for the GeoJSON output
    output: PathBuf,
    /// EPSG code to assume when the raster declares none
    epsg_override: Option<u32>,
    /// Depth intervals to classify into
    bins: DepthBins,
}

impl PolygonsCommand {
    /// Create a new polygons command from CLI arguments
    pub fn new(args: &ArgMatches) -> StormResult<Self> {
        let input = PathBuf::from(args.get_one::<String>("input")
            .ok_or_else(|| StormError::GenericError("Missing input file".to_string()))?);

        let output = match args.get_one::<String>("output") {
            Some(path) => PathBuf::from(path),
            None => geojson::derive_output_path(&input, POLYGON_SUFFIX),
        };

        let bins = match args.get_one::<String>("bins") {
            Some(path) => DepthBins::from_toml_file(path)?,
            None => DepthBins::default(),
        };

        Ok(PolygonsCommand {
            input,
            output,
            epsg_override: args.get_one::<u32>("epsg").copied(),
            bins,
        })
    }
}

impl Command for PolygonsCommand {
    fn execute(&self) -> StormResult<()> {
        info!("Extracting depth polygons from {}", self.input.display());

        let grid = load_grid(&self.input, self.epsg_override)?;
        let classified = self.bins.classify_grid(&grid);
        info!("{} of {} cells fall inside the depth intervals",
              classified.valid_count(), grid.rows() * grid.cols());

        let collection = extract_polygons(&grid, &classified, &self.bins);
        let collection = CrsTransformer::reproject_collection(&collection, epsg::WGS84)?;
        geojson::write_collection(&collection, &self.output)
    }
}
