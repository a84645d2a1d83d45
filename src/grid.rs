//! In-memory raster grid and its georeferencing
//!
//! A `Grid` is the immutable product of the raster loader: one band of
//! `f64` cell values in row-major order, together with the affine
//! transform mapping row/column indices to world coordinates and the
//! spatial reference the coordinates live in. Outside the crate a grid
//! is immutable; derived rasters (mosaics, saturated copies) are new
//! values built cell by cell.

use crate::errors::{StormError, StormResult};

/// Affine pixel-to-world mapping for a north-up raster
///
/// `pixel_height` is negative for the usual north-up orientation
/// (row index grows southward while world y grows northward).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridTransform {
    /// World x of the outer corner of cell (0, 0)
    pub origin_x: f64,
    /// World y of the outer corner of cell (0, 0)
    pub origin_y: f64,
    /// Cell width in world units
    pub pixel_width: f64,
    /// Cell height in world units, negative for north-up rasters
    pub pixel_height: f64,
}

impl GridTransform {
    /// Create a new transform from origin and pixel size
    pub fn new(origin_x: f64, origin_y: f64, pixel_width: f64, pixel_height: f64) -> Self {
        GridTransform { origin_x, origin_y, pixel_width, pixel_height }
    }

    /// World coordinates of the corner shared by cells (row-1, col-1) and (row, col)
    ///
    /// Accepts fractional and one-past-the-end indices so polygon rings
    /// built on the cell lattice can be mapped directly.
    pub fn corner(&self, row: f64, col: f64) -> (f64, f64) {
        (
            self.origin_x + col * self.pixel_width,
            self.origin_y + row * self.pixel_height,
        )
    }

    /// World coordinates of the center of cell (row, col)
    pub fn cell_center(&self, row: usize, col: usize) -> (f64, f64) {
        self.corner(row as f64 + 0.5, col as f64 + 0.5)
    }

    /// Grid indices (row, col) containing the world point, without bounds checking
    pub fn world_to_cell(&self, x: f64, y: f64) -> (i64, i64) {
        let col = ((x - self.origin_x) / self.pixel_width).floor() as i64;
        let row = ((y - self.origin_y) / self.pixel_height).floor() as i64;
        (row, col)
    }
}

/// One band of raster data with its georeferencing
#[derive(Debug, Clone)]
pub struct Grid {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
    transform: GridTransform,
    /// EPSG code of the coordinate system, if the raster declared one
    epsg: Option<u32>,
    /// No-data sentinel, if the raster declared one
    nodata: Option<f64>,
}

impl Grid {
    /// Create a grid from row-major data
    pub fn new(
        rows: usize,
        cols: usize,
        data: Vec<f64>,
        transform: GridTransform,
        epsg: Option<u32>,
        nodata: Option<f64>,
    ) -> StormResult<Self> {
        if data.len() != rows * cols {
            return Err(StormError::GenericError(format!(
                "Grid data length {} does not match {}x{} cells",
                data.len(), rows, cols
            )));
        }
        Ok(Grid { rows, cols, data, transform, epsg, nodata })
    }

    /// Create a grid filled with a constant value
    pub fn filled(
        rows: usize,
        cols: usize,
        value: f64,
        transform: GridTransform,
        epsg: Option<u32>,
        nodata: Option<f64>,
    ) -> Self {
        Grid {
            rows,
            cols,
            data: vec![value; rows * cols],
            transform,
            epsg,
            nodata,
        }
    }

    /// Number of rows
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Cell value at (row, col)
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[row * self.cols + col]
    }

    /// Overwrites one cell; only mosaic assembly builds grids in place
    pub(crate) fn set(&mut self, row: usize, col: usize, value: f64) {
        self.data[row * self.cols + col] = value;
    }

    /// Raw row-major data
    pub fn data(&self) -> &[f64] {
        &self.data
    }

    /// The affine transform
    pub fn transform(&self) -> &GridTransform {
        &self.transform
    }

    /// Declared EPSG code, if any
    pub fn epsg(&self) -> Option<u32> {
        self.epsg
    }

    /// Declared no-data sentinel, if any
    pub fn nodata(&self) -> Option<f64> {
        self.nodata
    }

    /// Return a copy with a different EPSG code
    ///
    /// The raster object never mutates in place; reference overrides
    /// produce a new value (the CLI uses this for `--epsg`).
    pub fn with_epsg(&self, epsg: u32) -> Grid {
        let mut grid = self.clone();
        grid.epsg = Some(epsg);
        grid
    }

    /// Whether a cell holds the no-data sentinel
    pub fn is_nodata(&self, row: usize, col: usize) -> bool {
        match self.nodata {
            Some(nodata) => {
                let v = self.get(row, col);
                v == nodata || (v.is_nan() && nodata.is_nan())
            }
            None => false,
        }
    }

    /// World bounds as (west, south, east, north)
    pub fn bounds(&self) -> (f64, f64, f64, f64) {
        let t = &self.transform;
        let (x0, y0) = t.corner(0.0, 0.0);
        let (x1, y1) = t.corner(self.rows as f64, self.cols as f64);
        (x0.min(x1), y0.min(y1), x0.max(x1), y0.max(y1))
    }

    /// Minimum and maximum cell value, ignoring no-data cells
    ///
    /// Returns None when every cell is no-data.
    pub fn value_range(&self) -> Option<(f64, f64)> {
        let mut range: Option<(f64, f64)> = None;
        for row in 0..self.rows {
            for col in 0..self.cols {
                if self.is_nodata(row, col) {
                    continue;
                }
                let v = self.get(row, col);
                if v.is_nan() {
                    continue;
                }
                range = Some(match range {
                    Some((min, max)) => (min.min(v), max.max(v)),
                    None => (v, v),
                });
            }
        }
        range
    }

    /// Copy with every value clamped to an upper limit
    ///
    /// Mirrors the saturation step applied before rendering so a few
    /// deep cells do not wash out the color ramp. No-data cells pass
    /// through untouched.
    pub fn saturated(&self, upper_limit: f64) -> Grid {
        let mut grid = self.clone();
        for row in 0..self.rows {
            for col in 0..self.cols {
                if !grid.is_nodata(row, col) {
                    let idx = row * self.cols + col;
                    grid.data[idx] = grid.data[idx].min(upper_limit);
                }
            }
        }
        grid
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn north_up_transform() -> GridTransform {
        GridTransform::new(100.0, 200.0, 1.0, -1.0)
    }

    #[test]
    fn cell_center_uses_half_cell_offset() {
        let t = north_up_transform();
        assert_eq!(t.cell_center(0, 0), (100.5, 199.5));
        assert_eq!(t.cell_center(2, 3), (103.5, 197.5));
    }

    #[test]
    fn world_to_cell_inverts_cell_center() {
        let t = north_up_transform();
        let (x, y) = t.cell_center(4, 7);
        assert_eq!(t.world_to_cell(x, y), (4, 7));
    }

    #[test]
    fn bounds_are_ordered() {
        let grid = Grid::filled(3, 4, 0.0, north_up_transform(), Some(3006), None);
        let (west, south, east, north) = grid.bounds();
        assert_eq!((west, south, east, north), (100.0, 197.0, 104.0, 200.0));
    }

    #[test]
    fn data_length_is_validated() {
        let result = Grid::new(2, 2, vec![0.0; 3], north_up_transform(), None, None);
        assert!(result.is_err());
    }

    #[test]
    fn value_range_skips_nodata() {
        let grid = Grid::new(
            1, 3,
            vec![-9999.0, 0.5, 1.5],
            north_up_transform(),
            None,
            Some(-9999.0),
        ).unwrap();
        assert_eq!(grid.value_range(), Some((0.5, 1.5)));
    }

    #[test]
    fn saturated_clamps_values() {
        let grid = Grid::new(1, 3, vec![0.2, 1.5, 3.0], north_up_transform(), None, None).unwrap();
        let clamped = grid.saturated(1.0);
        assert_eq!(clamped.data(), &[0.2, 1.0, 1.0]);
    }
}
