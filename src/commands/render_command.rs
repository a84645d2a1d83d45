//! Raster rendering command
//!
//! Paints a depth raster to a PNG for visual inspection.

use std::path::PathBuf;

use clap::ArgMatches;
use log::info;

use crate::commands::command_traits::Command;
use crate::commands::load_grid;
use crate::errors::{StormError, StormResult};
use crate::render::{render_png, DEFAULT_RENDER_LIMIT};

/// Command for rendering a raster to PNG
pub struct RenderCommand {
    /// Path to the input raster
    input: PathBuf,
    /// Path for the PNG output
    output: PathBuf,
    /// Depth below which cells render transparent
    lower_limit: f64,
    /// Optional clamp applied to deep cells before normalization
    saturation: Option<f64>,
}

impl RenderCommand {
    /// Create a new render command from CLI arguments
    pub fn new(args: &ArgMatches) -> StormResult<Self> {
        let input = PathBuf::from(args.get_one::<String>("input")
            .ok_or_else(|| StormError::GenericError("Missing input file".to_string()))?);

        let output = match args.get_one::<String>("output") {
            Some(path) => PathBuf::from(path),
            None => input.with_extension("png"),
        };

        Ok(RenderCommand {
            input,
            output,
            lower_limit: args.get_one::<f64>("threshold")
                .copied()
                .unwrap_or(DEFAULT_RENDER_LIMIT),
            saturation: args.get_one::<f64>("saturation").copied(),
        })
    }
}

impl Command for RenderCommand {
    fn execute(&self) -> StormResult<()> {
        info!("Rendering {} to {}", self.input.display(), self.output.display());
        let grid = load_grid(&self.input, None)?;
        render_png(&grid, &self.output, self.lower_limit, self.saturation)
    }
}
