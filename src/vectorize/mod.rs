//! Raster to vector conversion
//!
//! Two extraction modes over a classified depth grid: polygon outlines
//! of connected same-class regions, and one point per valid cell.

pub mod points;
pub mod polygons;

pub use points::extract_points;
pub use polygons::extract_polygons;
