//! Mosaic assembly from a folder of depth tiles
//!
//! Reads every GeoTIFF in a folder and pastes them onto one grid
//! covering the union of their extents, at the first tile's resolution.
//! Overlapping cells keep the value of the tile read first; gaps are
//! filled with the nodata value. Tile order is alphabetical by file
//! name so a rerun produces an identical mosaic.

use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use crate::errors::{StormError, StormResult};
use crate::grid::{Grid, GridTransform};
use crate::tiff::{GeoTiffReader, GeoTiffWriter};
use crate::utils::progress::ProgressTracker;

/// Nodata value assigned to mosaic cells no tile covers
pub const MERGE_NODATA: f64 = -9999.0;

/// Relative tolerance for resolution and alignment checks
const GRID_TOLERANCE: f64 = 1e-6;

/// Builds the default mosaic path: `<folder>/<folder_name>.tif`
pub fn derive_mosaic_path(folder: &Path) -> PathBuf {
    let name = folder.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "mosaic".to_string());
    folder.join(format!("{}.tif", name))
}

/// Lists the GeoTIFF tiles in a folder, sorted by file name
///
/// Fails with `EmptyFolder` when no .tif file is found.
pub fn list_tiles(folder: &Path) -> StormResult<Vec<PathBuf>> {
    let mut tiles = Vec::new();
    for entry in std::fs::read_dir(folder)? {
        let path = entry?.path();
        let is_tif = path.extension()
            .map(|ext| ext.eq_ignore_ascii_case("tif") || ext.eq_ignore_ascii_case("tiff"))
            .unwrap_or(false);
        if path.is_file() && is_tif {
            tiles.push(path);
        }
    }
    if tiles.is_empty() {
        return Err(StormError::EmptyFolder(folder.display().to_string()));
    }
    tiles.sort();
    Ok(tiles)
}

/// Merges all tiles in `folder` and writes the mosaic to `output`
///
/// Returns the mosaic grid so callers can chain further processing.
pub fn merge_folder(folder: &Path, output: &Path, compression: Option<&str>) -> StormResult<Grid> {
    // The output of a previous run may sit in the same folder; it must
    // not contribute cells or stretch the canvas extent
    let tiles: Vec<PathBuf> = list_tiles(folder)?
        .into_iter()
        .filter(|path| path != output)
        .collect();
    if tiles.is_empty() {
        return Err(StormError::EmptyFolder(folder.display().to_string()));
    }
    info!("Merging {} tiles from {}", tiles.len(), folder.display());

    let progress = ProgressTracker::new(tiles.len() as u64, "Merging tiles");
    let mut reader = GeoTiffReader::new();

    // Each tile is decoded exactly once and held until pasted
    let mut grids = Vec::with_capacity(tiles.len());
    for tile_path in &tiles {
        grids.push(reader.read_grid_from_path(tile_path)?);
        progress.increment(1);
    }

    let mut mosaic = seed_mosaic(&grids);
    for (grid, tile_path) in grids.iter().zip(&tiles).skip(1) {
        paste_tile(&mut mosaic, grid, tile_path)?;
    }
    progress.finish();

    let writer = match compression {
        Some(name) => GeoTiffWriter::with_compression(name)?,
        None => GeoTiffWriter::new(),
    };
    writer.write_grid(&mosaic, output)?;
    info!("Mosaic {}x{} written to {}", mosaic.cols(), mosaic.rows(), output.display());
    Ok(mosaic)
}

/// Allocates the mosaic canvas covering every tile's extent, filled
/// with nodata, then pastes the first tile onto it
///
/// The first tile defines the resolution, so it needs no alignment
/// check before pasting.
fn seed_mosaic(grids: &[Grid]) -> Grid {
    let first = &grids[0];
    let pixel_width = first.transform().pixel_width;
    let pixel_height = first.transform().pixel_height;

    let (mut west, mut south, mut east, mut north) = first.bounds();
    for grid in &grids[1..] {
        let (w, s, e, n) = grid.bounds();
        west = west.min(w);
        south = south.min(s);
        east = east.max(e);
        north = north.max(n);
    }

    let cols = ((east - west) / pixel_width).round() as usize;
    let rows = ((north - south) / -pixel_height).round() as usize;
    debug!("Mosaic canvas: {}x{} cells, extent ({}, {}) to ({}, {})",
           cols, rows, west, south, east, north);

    let transform = GridTransform::new(west, north, pixel_width, pixel_height);
    let mut canvas = Grid::filled(
        rows, cols, MERGE_NODATA, transform, first.epsg(), Some(MERGE_NODATA));
    copy_cells(&mut canvas, first);
    canvas
}

/// Pastes a tile onto the canvas, first-wins on overlap
fn paste_tile(canvas: &mut Grid, tile: &Grid, path: &Path) -> StormResult<()> {
    let canvas_t = canvas.transform();
    let tile_t = tile.transform();

    let width_ratio = tile_t.pixel_width / canvas_t.pixel_width;
    let height_ratio = tile_t.pixel_height / canvas_t.pixel_height;
    if (width_ratio - 1.0).abs() > GRID_TOLERANCE || (height_ratio - 1.0).abs() > GRID_TOLERANCE {
        return Err(StormError::GenericError(format!(
            "{}: tile resolution {}x{} does not match mosaic {}x{}",
            path.display(),
            tile_t.pixel_width, tile_t.pixel_height,
            canvas_t.pixel_width, canvas_t.pixel_height)));
    }

    if canvas.epsg() != tile.epsg() {
        warn!("{}: tile EPSG {:?} differs from mosaic EPSG {:?}",
              path.display(), tile.epsg(), canvas.epsg());
    }

    copy_cells(canvas, tile);
    Ok(())
}

/// Copies tile cells into the canvas at their world position
///
/// Cells already holding a value (anything other than the canvas
/// nodata) are left alone.
fn copy_cells(canvas: &mut Grid, tile: &Grid) {
    let (origin_row, origin_col) = {
        let (x, y) = tile.transform().corner(0.0, 0.0);
        canvas.transform().world_to_cell(x, y)
    };

    for row in 0..tile.rows() {
        let canvas_row = origin_row + row as i64;
        if canvas_row < 0 || canvas_row as usize >= canvas.rows() {
            continue;
        }
        for col in 0..tile.cols() {
            let canvas_col = origin_col + col as i64;
            if canvas_col < 0 || canvas_col as usize >= canvas.cols() {
                continue;
            }
            let (cr, cc) = (canvas_row as usize, canvas_col as usize);
            if canvas.get(cr, cc) != MERGE_NODATA {
                continue;
            }
            let value = tile.get(row, col);
            // Tile nodata stays a gap on the canvas
            if tile.is_nodata(row, col) {
                continue;
            }
            canvas.set(cr, cc, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tile(origin_x: f64, origin_y: f64, rows: usize, cols: usize, value: f64) -> Grid {
        let transform = GridTransform::new(origin_x, origin_y, 1.0, -1.0);
        Grid::filled(rows, cols, value, transform, Some(3006), None)
    }

    #[test]
    fn mosaic_path_uses_folder_name() {
        let path = derive_mosaic_path(Path::new("/data/scenario_a"));
        assert_eq!(path, Path::new("/data/scenario_a/scenario_a.tif"));
    }

    #[test]
    fn canvas_covers_union_of_extents() {
        // Two 2x2 tiles meeting corner to corner span a 4x4 canvas
        let first = tile(0.0, 4.0, 2, 2, 1.0);
        let second = tile(2.0, 2.0, 2, 2, 2.0);

        let transform = GridTransform::new(0.0, 4.0, 1.0, -1.0);
        let mut canvas = Grid::filled(4, 4, MERGE_NODATA, transform, Some(3006), Some(MERGE_NODATA));
        copy_cells(&mut canvas, &first);
        copy_cells(&mut canvas, &second);

        assert_eq!(canvas.get(0, 0), 1.0);
        assert_eq!(canvas.get(2, 2), 2.0);
        // Off-diagonal quadrants stay nodata
        assert_eq!(canvas.get(0, 2), MERGE_NODATA);
        assert_eq!(canvas.get(2, 0), MERGE_NODATA);
    }

    #[test]
    fn seeded_canvas_spans_the_union_and_holds_the_first_tile() {
        let grids = vec![tile(0.0, 2.0, 2, 2, 1.0), tile(2.0, 2.0, 2, 2, 2.0)];
        let canvas = seed_mosaic(&grids);
        assert_eq!(canvas.rows(), 2);
        assert_eq!(canvas.cols(), 4);
        assert_eq!(canvas.get(0, 0), 1.0);
        // The second tile is not pasted during seeding
        assert_eq!(canvas.get(0, 2), MERGE_NODATA);
    }

    #[test]
    fn paste_offset_is_not_transposed() {
        // 1x1 tile one row down and two columns right of the origin
        let second = tile(2.0, 2.0, 1, 1, 7.0);

        let transform = GridTransform::new(0.0, 3.0, 1.0, -1.0);
        let mut canvas = Grid::filled(2, 3, MERGE_NODATA, transform, Some(3006), Some(MERGE_NODATA));
        copy_cells(&mut canvas, &second);

        assert_eq!(canvas.get(1, 2), 7.0);
        // The transposed cell stays empty
        assert_eq!(canvas.get(0, 1), MERGE_NODATA);
    }

    #[test]
    fn overlap_keeps_the_first_value() {
        let first = tile(0.0, 2.0, 2, 2, 1.0);
        let second = tile(1.0, 2.0, 2, 2, 2.0);

        let transform = GridTransform::new(0.0, 2.0, 1.0, -1.0);
        let mut canvas = Grid::filled(2, 3, MERGE_NODATA, transform, Some(3006), Some(MERGE_NODATA));
        copy_cells(&mut canvas, &first);
        copy_cells(&mut canvas, &second);

        // Column 1 is covered by both tiles, the first tile wins
        assert_eq!(canvas.get(0, 1), 1.0);
        assert_eq!(canvas.get(0, 2), 2.0);
    }

    #[test]
    fn mismatched_resolution_is_rejected() {
        let transform = GridTransform::new(0.0, 2.0, 1.0, -1.0);
        let mut canvas = Grid::filled(2, 2, MERGE_NODATA, transform, Some(3006), Some(MERGE_NODATA));
        let coarse = Grid::filled(
            1, 1, 5.0, GridTransform::new(0.0, 2.0, 2.0, -2.0), Some(3006), None);
        let result = paste_tile(&mut canvas, &coarse, Path::new("coarse.tif"));
        assert!(result.is_err());
    }

    #[test]
    fn missing_tiles_reported_as_empty_folder() {
        let dir = std::env::temp_dir().join("stormkit_merge_empty_test");
        std::fs::create_dir_all(&dir).unwrap();
        let result = list_tiles(&dir);
        assert!(matches!(result, Err(StormError::EmptyFolder(_))));
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
