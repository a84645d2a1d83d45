//! Tile merge command
//!
//! Merges every GeoTIFF in a folder into one mosaic raster.

use std::path::PathBuf;

use clap::ArgMatches;
use log::info;

use crate::commands::command_traits::Command;
use crate::errors::{StormError, StormResult};
use crate::merge;

/// Command for merging a folder of depth tiles
pub struct MergeCommand {
    /// Folder holding the input tiles
    folder: PathBuf,
    /// Path for the mosaic output
    output: PathBuf,
    /// Compression to apply to the mosaic, if any
    compression: Option<String>,
}

impl MergeCommand {
    /// Create a new merge command from CLI arguments
    pub fn new(args: &ArgMatches) -> StormResult<Self> {
        let folder = PathBuf::from(args.get_one::<String>("input")
            .ok_or_else(|| StormError::GenericError("Missing input folder".to_string()))?);

        let output = match args.get_one::<String>("output") {
            Some(path) => PathBuf::from(path),
            None => merge::derive_mosaic_path(&folder),
        };

        Ok(MergeCommand {
            folder,
            output,
            compression: args.get_one::<String>("compression").cloned(),
        })
    }
}

impl Command for MergeCommand {
    fn execute(&self) -> StormResult<()> {
        info!("Merging tiles in {}", self.folder.display());
        merge::merge_folder(&self.folder, &self.output, self.compression.as_deref())?;
        Ok(())
    }
}
