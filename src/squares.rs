//! Point-to-square conversion
//!
//! Turns a point collection back into cell footprints. The cell size
//! is not stored in a points file, so it is recovered as the median
//! positive gap between sorted x coordinates; on a regular grid that
//! gap is exactly one cell width. Each point then becomes an
//! axis-aligned square of that size centred on it.

use log::{debug, info};

use crate::errors::{StormError, StormResult};
use crate::geometry::{Feature, FeatureCollection, Geometry, Polygon, Ring};

/// Estimates the grid cell size from point spacing
///
/// Takes the median of the positive differences between consecutive
/// sorted x coordinates. Duplicated columns contribute zero differences
/// and are skipped; fails when every point sits in one column.
pub fn estimate_cell_size(collection: &FeatureCollection) -> StormResult<f64> {
    let mut xs: Vec<f64> = collection.features.iter()
        .filter_map(|feature| match feature.geometry {
            Geometry::Point(x, _) => Some(x),
            _ => None,
        })
        .collect();
    xs.sort_by(|a, b| a.total_cmp(b));

    let mut gaps: Vec<f64> = xs.windows(2)
        .map(|pair| pair[1] - pair[0])
        .filter(|gap| *gap > 0.0)
        .collect();
    if gaps.is_empty() {
        return Err(StormError::GenericError(format!(
            "Cannot estimate cell size from {} point(s) with no x spread",
            collection.len())));
    }
    gaps.sort_by(|a, b| a.total_cmp(b));
    let size = gaps[gaps.len() / 2];
    debug!("Estimated cell size {} from {} gaps", size, gaps.len());
    Ok(size)
}

/// Replaces every point with a square of `size` centred on it
///
/// Attributes carry over unchanged; non-point features are rejected.
pub fn points_to_squares(collection: &FeatureCollection, size: f64) -> StormResult<FeatureCollection> {
    let half = size / 2.0;
    let mut output = FeatureCollection::new(collection.epsg);

    for feature in &collection.features {
        let (x, y) = match feature.geometry {
            Geometry::Point(x, y) => (x, y),
            ref other => {
                return Err(StormError::GenericError(format!(
                    "Expected point geometry, found {:?}", other)));
            }
        };
        // Counterclockwise square, closed ring
        let exterior = Ring(vec![
            (x - half, y - half),
            (x + half, y - half),
            (x + half, y + half),
            (x - half, y + half),
            (x - half, y - half),
        ]);
        output.features.push(Feature {
            geometry: Geometry::Polygon(Polygon::new(exterior)),
            properties: feature.properties.clone(),
        });
    }

    info!("Converted {} points to squares of side {}", output.len(), size);
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::AttrValue;

    fn point_collection(points: &[(f64, f64)]) -> FeatureCollection {
        let mut collection = FeatureCollection::new(Some(4326));
        for &(x, y) in points {
            collection.features.push(Feature::new(
                Geometry::Point(x, y), "depth", AttrValue::Number(1.0)));
        }
        collection
    }

    #[test]
    fn median_gap_ignores_duplicate_columns() {
        // Gaps: 0 (duplicate), 2, 2, 10; median of [2, 2, 10] is 2
        let collection = point_collection(&[
            (0.0, 0.0), (0.0, 5.0), (2.0, 0.0), (4.0, 0.0), (14.0, 0.0),
        ]);
        assert_eq!(estimate_cell_size(&collection).unwrap(), 2.0);
    }

    #[test]
    fn single_column_of_points_is_an_error() {
        let collection = point_collection(&[(1.0, 0.0), (1.0, 5.0), (1.0, 9.0)]);
        assert!(estimate_cell_size(&collection).is_err());
    }

    #[test]
    fn squares_are_centred_and_keep_attributes() {
        let collection = point_collection(&[(10.0, 20.0)]);
        let squares = points_to_squares(&collection, 2.0).unwrap();
        assert_eq!(squares.len(), 1);
        assert_eq!(squares.epsg, Some(4326));
        assert_eq!(squares.features[0].properties[0].1, AttrValue::Number(1.0));

        match &squares.features[0].geometry {
            Geometry::Polygon(polygon) => {
                assert_eq!(polygon.exterior.len(), 5);
                assert!(polygon.exterior.0.contains(&(9.0, 19.0)));
                assert!(polygon.exterior.0.contains(&(11.0, 21.0)));
                assert!((polygon.exterior.signed_area() - 4.0).abs() < 1e-12);
            }
            other => panic!("expected polygon, got {:?}", other),
        }
    }
}
