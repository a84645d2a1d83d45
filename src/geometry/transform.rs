//! Coordinate transformation between reference systems
//!
//! Wraps proj4rs with the EPSG registry in `crs`. A transformer is
//! built once per (source, target) pair and reused for every vertex.
//! Collection reprojection is all-or-nothing: one failing vertex (or a
//! missing source reference) aborts the whole operation, because a
//! mixed-reference collection is meaningless downstream.

use log::{debug, info};
use proj4rs::proj::Proj;
use proj4rs::transform::transform;

use crate::errors::{StormError, StormResult};
use crate::geometry::crs;
use crate::geometry::FeatureCollection;
use crate::tiff::constants::epsg;

/// Transformer between two EPSG-coded reference systems
pub struct CrsTransformer {
    source_proj: Proj,
    target_proj: Proj,
    source_epsg: u32,
    target_epsg: u32,
    source_is_geographic: bool,
    target_is_geographic: bool,
}

impl CrsTransformer {
    /// Creates a transformer between two EPSG codes
    pub fn new(source_epsg: u32, target_epsg: u32) -> StormResult<Self> {
        let source_proj = Proj::from_proj_string(crs::proj_string(source_epsg)?)
            .map_err(|e| StormError::ProjectionError(format!(
                "Invalid source projection EPSG:{}: {:?}", source_epsg, e)))?;
        let target_proj = Proj::from_proj_string(crs::proj_string(target_epsg)?)
            .map_err(|e| StormError::ProjectionError(format!(
                "Invalid target projection EPSG:{}: {:?}", target_epsg, e)))?;

        debug!("Transformer: {} -> {}", crs::name(source_epsg), crs::name(target_epsg));

        Ok(CrsTransformer {
            source_proj,
            target_proj,
            source_epsg,
            target_epsg,
            source_is_geographic: crs::is_geographic(source_epsg),
            target_is_geographic: crs::is_geographic(target_epsg),
        })
    }

    /// Creates a transformer from `source_epsg` to WGS84 longitude/latitude
    pub fn to_lonlat_from(source_epsg: u32) -> StormResult<Self> {
        Self::new(source_epsg, epsg::WGS84)
    }

    /// Source EPSG code
    pub fn source_epsg(&self) -> u32 {
        self.source_epsg
    }

    /// Target EPSG code
    pub fn target_epsg(&self) -> u32 {
        self.target_epsg
    }

    /// Transforms one coordinate pair
    ///
    /// Degree/radian conversion is applied automatically for
    /// geographic systems on either side.
    pub fn transform_point(&self, x: f64, y: f64) -> StormResult<(f64, f64)> {
        if self.source_epsg == self.target_epsg {
            return Ok((x, y));
        }

        let (in_x, in_y) = if self.source_is_geographic {
            (x.to_radians(), y.to_radians())
        } else {
            (x, y)
        };

        let mut point = (in_x, in_y, 0.0);
        transform(&self.source_proj, &self.target_proj, &mut point)
            .map_err(|e| StormError::ProjectionError(format!(
                "Transform failed at ({}, {}): {:?}", x, y, e)))?;

        if self.target_is_geographic {
            Ok((point.0.to_degrees(), point.1.to_degrees()))
        } else {
            Ok((point.0, point.1))
        }
    }

    /// Reprojects a whole feature collection, all-or-nothing
    ///
    /// The input collection must carry a source EPSG code; a missing
    /// reference is a fatal configuration error, not a fallback case.
    pub fn reproject_collection(
        collection: &FeatureCollection,
        target_epsg: u32,
    ) -> StormResult<FeatureCollection> {
        let source_epsg = collection.epsg.ok_or_else(|| StormError::MissingCrs(
            "feature collection has no spatial reference; pass --epsg".to_string()))?;

        if source_epsg == target_epsg {
            return Ok(collection.clone());
        }

        let transformer = Self::new(source_epsg, target_epsg)?;
        info!("Reprojecting {} features from EPSG:{} to EPSG:{}",
              collection.len(), source_epsg, target_epsg);

        let mut features = Vec::with_capacity(collection.len());
        for feature in &collection.features {
            let geometry = feature.geometry.try_map_vertices(&mut |x, y| {
                transformer.transform_point(x, y).map_err(|e| e.to_string())
            }).map_err(StormError::ProjectionError)?;
            features.push(crate::geometry::Feature {
                geometry,
                properties: feature.properties.clone(),
            });
        }

        Ok(FeatureCollection { features, epsg: Some(target_epsg) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{AttrValue, Feature, Geometry};

    const TOLERANCE: f64 = 1e-6;

    #[test]
    fn identity_transform_returns_input() {
        let transformer = CrsTransformer::new(3006, 3006).unwrap();
        let (x, y) = transformer.transform_point(500000.0, 6500000.0).unwrap();
        assert_eq!((x, y), (500000.0, 6500000.0));
    }

    #[test]
    fn sweref99_tm_false_easting_maps_to_central_meridian() {
        // x = 500000 on the SWEREF99 TM grid lies on the 15E meridian
        let transformer = CrsTransformer::to_lonlat_from(3006).unwrap();
        let (lon, _lat) = transformer.transform_point(500000.0, 6500000.0).unwrap();
        assert!((lon - 15.0).abs() < 1e-4, "expected ~15 degrees, got {}", lon);
    }

    #[test]
    fn wgs84_output_is_in_degrees_not_radians() {
        let transformer = CrsTransformer::to_lonlat_from(3006).unwrap();
        let (lon, lat) = transformer.transform_point(500000.0, 6500000.0).unwrap();
        assert!((14.9..15.1).contains(&lon), "lon {}", lon);
        assert!((58.0..59.0).contains(&lat), "lat {}", lat);
    }

    #[test]
    fn round_trip_is_within_tolerance() {
        let forward = CrsTransformer::new(3006, 4326).unwrap();
        let back = CrsTransformer::new(4326, 3006).unwrap();

        let (x0, y0) = (674000.0, 6580000.0);
        let (lon, lat) = forward.transform_point(x0, y0).unwrap();
        let (x1, y1) = back.transform_point(lon, lat).unwrap();
        assert!((x0 - x1).abs() < 1e-3, "x drifted by {}", (x0 - x1).abs());
        assert!((y0 - y1).abs() < 1e-3, "y drifted by {}", (y0 - y1).abs());
    }

    #[test]
    fn lonlat_round_trip_through_web_mercator() {
        let forward = CrsTransformer::new(4326, 3857).unwrap();
        let back = CrsTransformer::new(3857, 4326).unwrap();
        let (x, y) = forward.transform_point(18.07, 59.33).unwrap();
        let (lon, lat) = back.transform_point(x, y).unwrap();
        assert!((lon - 18.07).abs() < TOLERANCE);
        assert!((lat - 59.33).abs() < TOLERANCE);
    }

    #[test]
    fn collection_without_reference_fails_whole_operation() {
        let mut collection = FeatureCollection::new(None);
        collection.features.push(Feature::new(
            Geometry::Point(0.0, 0.0), "depth", AttrValue::Number(0.5)));
        let result = CrsTransformer::reproject_collection(&collection, 4326);
        assert!(matches!(result, Err(StormError::MissingCrs(_))));
    }

    #[test]
    fn reprojection_keeps_feature_order_and_attributes() {
        let mut collection = FeatureCollection::new(Some(3006));
        for (i, x) in [500000.0, 500100.0, 500200.0].iter().enumerate() {
            collection.features.push(Feature::new(
                Geometry::Point(*x, 6500000.0),
                "depth",
                AttrValue::Number(i as f64),
            ));
        }
        let reprojected = CrsTransformer::reproject_collection(&collection, 4326).unwrap();
        assert_eq!(reprojected.len(), 3);
        assert_eq!(reprojected.epsg, Some(4326));
        for (i, feature) in reprojected.features.iter().enumerate() {
            assert_eq!(feature.properties[0].1, AttrValue::Number(i as f64));
        }
    }
}
