//! Depth raster rendering to PNG
//!
//! Paints a depth grid with the viridis ramp for quick visual checks.
//! Cells below the lower limit (and nodata cells) come out fully
//! transparent; the rest are normalized over the visible value range
//! and colored by linear interpolation between ramp control points.

use std::path::Path;

use image::{ImageBuffer, Rgba};
use log::info;

use crate::errors::{StormError, StormResult};
use crate::grid::Grid;

/// Default depth below which cells render transparent, in metres
pub const DEFAULT_RENDER_LIMIT: f64 = 0.1;

/// Viridis control points as (position, r, g, b), position in 0..=1
const VIRIDIS: [(f32, u8, u8, u8); 9] = [
    (0.000, 68, 1, 84),
    (0.125, 72, 40, 120),
    (0.250, 62, 74, 137),
    (0.375, 49, 104, 142),
    (0.500, 38, 130, 142),
    (0.625, 31, 158, 137),
    (0.750, 53, 183, 121),
    (0.875, 109, 205, 89),
    (1.000, 253, 231, 37),
];

/// Renders a depth grid to an RGBA PNG file
///
/// `lower_limit` masks shallow cells to transparency. `saturation`
/// optionally clamps depths above it before normalizing, so a few very
/// deep cells do not wash out the rest of the image.
pub fn render_png(
    grid: &Grid,
    output: &Path,
    lower_limit: f64,
    saturation: Option<f64>,
) -> StormResult<()> {
    let source;
    let grid = match saturation {
        Some(upper) => {
            source = grid.saturated(upper);
            &source
        }
        None => grid,
    };

    let (low, high) = visible_range(grid, lower_limit).ok_or_else(|| {
        StormError::GenericError(format!(
            "No cell at or above {} to render in {}x{} grid",
            lower_limit, grid.cols(), grid.rows()))
    })?;
    let span = if high > low { high - low } else { 1.0 };

    let mut image = ImageBuffer::new(grid.cols() as u32, grid.rows() as u32);
    for row in 0..grid.rows() {
        for col in 0..grid.cols() {
            let pixel = image.get_pixel_mut(col as u32, row as u32);
            if grid.is_nodata(row, col) {
                *pixel = Rgba([0, 0, 0, 0]);
                continue;
            }
            let value = grid.get(row, col);
            if value < lower_limit {
                *pixel = Rgba([0, 0, 0, 0]);
                continue;
            }
            let t = ((value - low) / span) as f32;
            let (r, g, b) = viridis_color(t);
            *pixel = Rgba([r, g, b, 255]);
        }
    }

    image.save(output).map_err(|e| StormError::GenericError(format!(
        "Failed to write {}: {}", output.display(), e)))?;
    info!("Rendered {}x{} PNG to {}", grid.cols(), grid.rows(), output.display());
    Ok(())
}

/// Min and max over cells at or above the lower limit, skipping nodata
fn visible_range(grid: &Grid, lower_limit: f64) -> Option<(f64, f64)> {
    let mut range: Option<(f64, f64)> = None;
    for row in 0..grid.rows() {
        for col in 0..grid.cols() {
            if grid.is_nodata(row, col) {
                continue;
            }
            let value = grid.get(row, col);
            if value < lower_limit {
                continue;
            }
            range = Some(match range {
                None => (value, value),
                Some((low, high)) => (low.min(value), high.max(value)),
            });
        }
    }
    range
}

/// Interpolates the viridis ramp at `t` in 0..=1
fn viridis_color(t: f32) -> (u8, u8, u8) {
    let t = t.clamp(0.0, 1.0);

    // Find the bracketing control points
    let mut lower = VIRIDIS[0];
    let mut upper = VIRIDIS[VIRIDIS.len() - 1];
    for window in VIRIDIS.windows(2) {
        if window[0].0 <= t && t <= window[1].0 {
            lower = window[0];
            upper = window[1];
            break;
        }
    }

    let span = upper.0 - lower.0;
    if span <= 0.0 {
        return (lower.1, lower.2, lower.3);
    }
    let s = (t - lower.0) / span;
    let lerp = |a: u8, b: u8| (a as f32 * (1.0 - s) + b as f32 * s).round() as u8;
    (lerp(lower.1, upper.1), lerp(lower.2, upper.2), lerp(lower.3, upper.3))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::GridTransform;

    #[test]
    fn ramp_endpoints_match_control_points() {
        assert_eq!(viridis_color(0.0), (68, 1, 84));
        assert_eq!(viridis_color(1.0), (253, 231, 37));
        // Out-of-range input clamps rather than wrapping
        assert_eq!(viridis_color(-0.5), (68, 1, 84));
        assert_eq!(viridis_color(1.5), (253, 231, 37));
    }

    #[test]
    fn interpolation_stays_between_neighbours() {
        let (r, g, b) = viridis_color(0.0625);
        assert!((68..=72).contains(&r));
        assert!((1..=40).contains(&g));
        assert!((84..=120).contains(&b), "b = {}", b);
    }

    #[test]
    fn visible_range_skips_shallow_and_nodata() {
        let transform = GridTransform::new(0.0, 2.0, 1.0, -1.0);
        let grid = Grid::new(
            2, 2,
            vec![-9999.0, 0.05, 0.2, 1.5],
            transform, None, Some(-9999.0),
        ).unwrap();
        assert_eq!(visible_range(&grid, 0.1), Some((0.2, 1.5)));
        assert_eq!(visible_range(&grid, 2.0), None);
    }
}
