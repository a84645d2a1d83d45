//! CLI command implementations
//!
//! This module contains implementations of the commands supported by
//! the CLI application using the Command pattern.

pub mod command_traits;
pub mod info_command;
pub mod merge_command;
pub mod points_command;
pub mod polygons_command;
pub mod render_command;
pub mod squares_command;

pub use command_traits::{Command, CommandFactory};
pub use info_command::InfoCommand;
pub use merge_command::MergeCommand;
pub use points_command::PointsCommand;
pub use polygons_command::PolygonsCommand;
pub use render_command::RenderCommand;
pub use squares_command::SquaresCommand;

use std::path::Path;

use clap::ArgMatches;

use crate::errors::StormResult;
use crate::grid::Grid;
use crate::tiff::GeoTiffReader;
use crate::utils::logger::Logger;

/// Factory for creating command instances based on CLI arguments
///
/// This factory examines the command-line arguments and creates
/// the appropriate command instance for execution.
pub struct StormkitCommandFactory;

impl StormkitCommandFactory {
    /// Create a new factory instance
    pub fn new() -> Self {
        StormkitCommandFactory
    }
}

impl<'a> CommandFactory<'a> for StormkitCommandFactory {
    fn create_command(&self, args: &ArgMatches, logger: &'a Logger) -> StormResult<Box<dyn Command + 'a>> {
        // Determine which command to run based on args
        if args.get_flag("polygons") {
            Ok(Box::new(PolygonsCommand::new(args)?))
        } else if args.get_flag("points") {
            Ok(Box::new(PointsCommand::new(args)?))
        } else if args.get_flag("merge") {
            Ok(Box::new(MergeCommand::new(args)?))
        } else if args.get_flag("render") {
            Ok(Box::new(RenderCommand::new(args)?))
        } else if args.get_flag("squares") {
            Ok(Box::new(SquaresCommand::new(args)?))
        } else {
            // Default to showing raster information
            Ok(Box::new(InfoCommand::new(args, logger)?))
        }
    }
}

/// Loads a raster, applying the EPSG override when the user gave one
pub(crate) fn load_grid(input: &Path, epsg_override: Option<u32>) -> StormResult<Grid> {
    let mut reader = GeoTiffReader::new();
    let grid = reader.read_grid_from_path(input)?;
    Ok(match epsg_override {
        Some(code) => grid.with_epsg(code),
        None => grid,
    })
}
