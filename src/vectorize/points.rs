//! Point extraction from a depth grid
//!
//! One point per cell whose depth exceeds a threshold, placed at the
//! cell centre and carrying the raw depth as a numeric attribute.
//! Nodata cells never produce points regardless of their stored value.

use log::info;

use crate::geometry::{AttrValue, Feature, FeatureCollection, Geometry};
use crate::grid::Grid;

/// Attribute carrying the raw depth value on point features
pub const DEPTH_ATTRIBUTE: &str = "depth";

/// Default depth below which cells produce no point, in metres
pub const DEFAULT_POINT_THRESHOLD: f64 = 0.1;

/// Extracts cell-centre points for all cells with depth above `threshold`
///
/// Features come out in row-major cell order. A grid with no cell above
/// the threshold yields an empty collection.
pub fn extract_points(grid: &Grid, threshold: f64) -> FeatureCollection {
    let mut collection = FeatureCollection::new(grid.epsg());

    for row in 0..grid.rows() {
        for col in 0..grid.cols() {
            if grid.is_nodata(row, col) {
                continue;
            }
            let value = grid.get(row, col);
            if value > threshold {
                let (x, y) = grid.transform().cell_center(row, col);
                collection.features.push(Feature::new(
                    Geometry::Point(x, y),
                    DEPTH_ATTRIBUTE,
                    AttrValue::Number(value),
                ));
            }
        }
    }

    info!("Extracted {} points above {} m from {}x{} cells",
          collection.len(), threshold, grid.rows(), grid.cols());
    collection
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::GridTransform;

    fn grid_with_nodata(values: &[f64], nodata: Option<f64>) -> Grid {
        let transform = GridTransform::new(100.0, 200.0, 1.0, -1.0);
        Grid::new(2, 2, values.to_vec(), transform, Some(3006), nodata).unwrap()
    }

    #[test]
    fn threshold_is_exclusive() {
        let grid = grid_with_nodata(&[0.1, 0.11, 0.0, 2.0], None);
        let collection = extract_points(&grid, DEFAULT_POINT_THRESHOLD);
        assert_eq!(collection.len(), 2);
    }

    #[test]
    fn nodata_cells_produce_no_points() {
        // -9999 would pass a naive threshold test at threshold -10000
        let grid = grid_with_nodata(&[-9999.0, 0.5, 0.5, -9999.0], Some(-9999.0));
        let collection = extract_points(&grid, DEFAULT_POINT_THRESHOLD);
        assert_eq!(collection.len(), 2);
        for feature in &collection.features {
            assert_eq!(feature.properties[0].1, AttrValue::Number(0.5));
        }
    }

    #[test]
    fn points_sit_at_cell_centres_in_row_major_order() {
        let grid = grid_with_nodata(&[0.2, 0.3, 0.4, 0.5], None);
        let collection = extract_points(&grid, DEFAULT_POINT_THRESHOLD);
        assert_eq!(collection.len(), 4);
        assert_eq!(collection.epsg, Some(3006));

        let centres: Vec<_> = collection.features.iter().map(|f| match f.geometry {
            Geometry::Point(x, y) => (x, y),
            ref other => panic!("expected point, got {:?}", other),
        }).collect();
        assert_eq!(centres, vec![
            (100.5, 199.5), (101.5, 199.5),
            (100.5, 198.5), (101.5, 198.5),
        ]);
    }

    #[test]
    fn all_dry_grid_is_empty_not_an_error() {
        let grid = grid_with_nodata(&[0.0, 0.0, 0.05, 0.1], None);
        let collection = extract_points(&grid, DEFAULT_POINT_THRESHOLD);
        assert!(collection.is_empty());
    }
}
