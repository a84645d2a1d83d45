//! Library facade
//!
//! A thin entry point for using the pipeline from other Rust code
//! without going through the CLI. Each method mirrors one command.

use std::path::{Path, PathBuf};

use log::info;

use crate::classify::DepthBins;
use crate::commands::load_grid;
use crate::errors::StormResult;
use crate::geojson::{self, POINT_SUFFIX, POLYGON_SUFFIX, SQUARE_SUFFIX};
use crate::geometry::crs;
use crate::geometry::CrsTransformer;
use crate::merge;
use crate::render::{render_png, DEFAULT_RENDER_LIMIT};
use crate::squares;
use crate::tiff::constants::epsg;
use crate::tiff::GeoTiffReader;
use crate::utils::logger::Logger;
use crate::vectorize::points::DEFAULT_POINT_THRESHOLD;
use crate::vectorize::{extract_points, extract_polygons};

/// Main interface to the StormKit library
pub struct StormKit {
    logger: Logger,
}

impl StormKit {
    /// Create a new StormKit instance
    ///
    /// # Arguments
    /// * `log_file` - Optional path to log file, defaults to "stormkit.log"
    ///
    /// # Returns
    /// A StormKit instance or an error if initialization fails
    pub fn new(log_file: Option<&str>) -> StormResult<Self> {
        let log_path = log_file.unwrap_or("stormkit.log");
        let logger = Logger::new(log_path, false)?;
        Ok(StormKit { logger })
    }

    /// Summarize the structure and georeferencing of a raster
    pub fn describe(&self, input_path: &str) -> StormResult<String> {
        let mut reader = GeoTiffReader::new();
        let grid = reader.read_grid_from_path(input_path)?;
        let transform = grid.transform();
        let (west, south, east, north) = grid.bounds();

        let mut result = format!("Raster: {}\n", input_path);
        result.push_str(&format!("  Dimensions: {} columns x {} rows\n",
            grid.cols(), grid.rows()));
        result.push_str(&format!("  Resolution: {} x {}\n",
            transform.pixel_width, transform.pixel_height.abs()));
        result.push_str(&format!("  Bounds: ({}, {}) to ({}, {})\n",
            west, south, east, north));
        match grid.epsg() {
            Some(code) => result.push_str(&format!(
                "  Reference: EPSG:{} ({})\n", code, crs::name(code))),
            None => result.push_str("  Reference: not declared\n"),
        }
        match grid.value_range() {
            Some((min, max)) => result.push_str(&format!(
                "  Depth range: {} to {}\n", min, max)),
            None => result.push_str("  Depth range: no valid cells\n"),
        }

        self.logger.log_line(&result)?;
        Ok(result)
    }

    /// Classify a depth raster and write WGS84 polygons as GeoJSON
    ///
    /// Returns the path written to.
    pub fn extract_polygons(
        &self,
        input_path: &str,
        output_path: Option<&str>,
        epsg_override: Option<u32>,
        bins: Option<DepthBins>,
    ) -> StormResult<PathBuf> {
        let input = Path::new(input_path);
        let output = resolve_output(input, output_path, POLYGON_SUFFIX);
        let bins = bins.unwrap_or_default();

        let grid = load_grid(input, epsg_override)?;
        let classified = bins.classify_grid(&grid);
        let collection = extract_polygons(&grid, &classified, &bins);
        let collection = CrsTransformer::reproject_collection(&collection, epsg::WGS84)?;
        geojson::write_collection(&collection, &output)?;
        Ok(output)
    }

    /// Extract WGS84 depth points from a raster and write them as GeoJSON
    ///
    /// Returns the path written to.
    pub fn extract_points(
        &self,
        input_path: &str,
        output_path: Option<&str>,
        epsg_override: Option<u32>,
        threshold: Option<f64>,
    ) -> StormResult<PathBuf> {
        let input = Path::new(input_path);
        let output = resolve_output(input, output_path, POINT_SUFFIX);

        let grid = load_grid(input, epsg_override)?;
        let collection = extract_points(&grid, threshold.unwrap_or(DEFAULT_POINT_THRESHOLD));
        let collection = CrsTransformer::reproject_collection(&collection, epsg::WGS84)?;
        geojson::write_collection(&collection, &output)?;
        Ok(output)
    }

    /// Merge every GeoTIFF tile in a folder into one mosaic
    ///
    /// Returns the path written to.
    pub fn merge_tiles(
        &self,
        folder_path: &str,
        output_path: Option<&str>,
        compression: Option<&str>,
    ) -> StormResult<PathBuf> {
        let folder = Path::new(folder_path);
        let output = match output_path {
            Some(path) => PathBuf::from(path),
            None => merge::derive_mosaic_path(folder),
        };
        merge::merge_folder(folder, &output, compression)?;
        Ok(output)
    }

    /// Render a depth raster to an RGBA PNG
    ///
    /// Returns the path written to.
    pub fn render(
        &self,
        input_path: &str,
        output_path: Option<&str>,
        lower_limit: Option<f64>,
        saturation: Option<f64>,
    ) -> StormResult<PathBuf> {
        let input = Path::new(input_path);
        let output = match output_path {
            Some(path) => PathBuf::from(path),
            None => input.with_extension("png"),
        };
        let grid = load_grid(input, None)?;
        render_png(&grid, &output, lower_limit.unwrap_or(DEFAULT_RENDER_LIMIT), saturation)?;
        Ok(output)
    }

    /// Convert a points GeoJSON to cell-sized squares
    ///
    /// Returns the path written to.
    pub fn points_to_squares(
        &self,
        input_path: &str,
        output_path: Option<&str>,
        size: Option<f64>,
    ) -> StormResult<PathBuf> {
        let input = Path::new(input_path);
        let output = resolve_output(input, output_path, SQUARE_SUFFIX);

        let points = geojson::read_points(input)?;
        let size = match size {
            Some(size) => size,
            None => squares::estimate_cell_size(&points)?,
        };
        let collection = squares::points_to_squares(&points, size)?;
        geojson::write_collection(&collection, &output)?;
        info!("Squares written to {}", output.display());
        Ok(output)
    }
}

fn resolve_output(input: &Path, output_path: Option<&str>, suffix: &str) -> PathBuf {
    match output_path {
        Some(path) => PathBuf::from(path),
        None => geojson::derive_output_path(input, suffix),
    }
}
