pub mod api;
pub mod classify;
pub mod commands;
pub mod compression;
pub mod errors;
pub mod geojson;
pub mod geometry;
pub mod grid;
pub mod io;
pub mod merge;
pub mod render;
pub mod squares;
pub mod tiff;
pub mod utils;
pub mod vectorize;

pub use crate::api::StormKit;

pub use classify::{ClassifiedGrid, DepthBins};
pub use errors::{StormError, StormResult};
pub use geometry::{CrsTransformer, Feature, FeatureCollection, Geometry};
pub use grid::{Grid, GridTransform};
pub use tiff::{GeoTiffReader, GeoTiffWriter};
