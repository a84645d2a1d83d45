//! GeoJSON reading and writing
//!
//! Serializes feature collections to GeoJSON files and reads point
//! collections back in. Output in WGS84 carries no `crs` member per
//! RFC 7946; any other reference is recorded as a legacy named CRS so
//! the code survives a round trip.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use log::info;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use crate::errors::{StormError, StormResult};
use crate::geometry::{AttrValue, Feature, FeatureCollection, Geometry, Polygon, Ring};
use crate::tiff::constants::epsg;

/// Suffix appended to the input stem for polygon output
pub const POLYGON_SUFFIX: &str = "polygons";

/// Suffix appended to the input stem for point output
pub const POINT_SUFFIX: &str = "points";

/// Suffix appended to the input stem for square output
pub const SQUARE_SUFFIX: &str = "squares";

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type", content = "coordinates")]
enum GeoJsonGeometry {
    Point([f64; 2]),
    Polygon(Vec<Vec<[f64; 2]>>),
    MultiPolygon(Vec<Vec<Vec<[f64; 2]>>>),
}

#[derive(Debug, Serialize, Deserialize)]
struct GeoJsonFeature {
    #[serde(rename = "type")]
    kind: String,
    geometry: GeoJsonGeometry,
    properties: Map<String, Value>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeoJsonDocument {
    #[serde(rename = "type")]
    kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    crs: Option<Value>,
    features: Vec<GeoJsonFeature>,
}

/// Builds the output path for a derived product:
/// `<dir>/<stem>_<suffix>.geojson` next to the input file
pub fn derive_output_path(input: &Path, suffix: &str) -> PathBuf {
    let stem = input.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "output".to_string());
    input.with_file_name(format!("{}_{}.geojson", stem, suffix))
}

/// Writes a feature collection as GeoJSON, replacing any existing file
pub fn write_collection(collection: &FeatureCollection, path: &Path) -> StormResult<()> {
    let document = to_document(collection)?;
    let file = File::create(path)?;
    serde_json::to_writer(BufWriter::new(file), &document)?;
    info!("Wrote {} features to {}", collection.len(), path.display());
    Ok(())
}

/// Reads a point collection from a GeoJSON file
///
/// A document without a `crs` member is WGS84 by the GeoJSON default.
/// Non-point geometries are rejected.
pub fn read_points(path: &Path) -> StormResult<FeatureCollection> {
    let file = File::open(path)?;
    let document: GeoJsonDocument = serde_json::from_reader(BufReader::new(file))?;

    let code = match &document.crs {
        Some(value) => parse_crs_member(value)?,
        None => epsg::WGS84,
    };

    let mut collection = FeatureCollection::new(Some(code));
    for feature in document.features {
        let geometry = match feature.geometry {
            GeoJsonGeometry::Point([x, y]) => Geometry::Point(x, y),
            other => {
                return Err(StormError::JsonError(format!(
                    "{}: expected Point geometry, found {:?}", path.display(), other)));
            }
        };
        let mut properties = Vec::with_capacity(feature.properties.len());
        for (key, value) in feature.properties {
            properties.push((key, attr_from_value(value)));
        }
        collection.features.push(Feature { geometry, properties });
    }

    info!("Read {} points from {}", collection.len(), path.display());
    Ok(collection)
}

fn to_document(collection: &FeatureCollection) -> StormResult<GeoJsonDocument> {
    let crs = match collection.epsg {
        Some(code) if code != epsg::WGS84 => Some(crs_member(code)),
        _ => None,
    };

    let mut features = Vec::with_capacity(collection.len());
    for feature in &collection.features {
        let mut properties = Map::new();
        for (key, value) in &feature.properties {
            properties.insert(key.clone(), value_from_attr(value));
        }
        features.push(GeoJsonFeature {
            kind: "Feature".to_string(),
            geometry: geometry_to_geojson(&feature.geometry),
            properties,
        });
    }

    Ok(GeoJsonDocument {
        kind: "FeatureCollection".to_string(),
        crs,
        features,
    })
}

fn geometry_to_geojson(geometry: &Geometry) -> GeoJsonGeometry {
    let ring_coords = |ring: &Ring| -> Vec<[f64; 2]> {
        ring.0.iter().map(|&(x, y)| [x, y]).collect()
    };
    let polygon_coords = |polygon: &Polygon| -> Vec<Vec<[f64; 2]>> {
        let mut rings = vec![ring_coords(&polygon.exterior)];
        rings.extend(polygon.holes.iter().map(ring_coords));
        rings
    };

    match geometry {
        Geometry::Point(x, y) => GeoJsonGeometry::Point([*x, *y]),
        Geometry::Polygon(polygon) => GeoJsonGeometry::Polygon(polygon_coords(polygon)),
        Geometry::MultiPolygon(polygons) => {
            GeoJsonGeometry::MultiPolygon(polygons.iter().map(polygon_coords).collect())
        }
    }
}

fn value_from_attr(attr: &AttrValue) -> Value {
    match attr {
        AttrValue::Text(text) => Value::String(text.clone()),
        AttrValue::Number(number) => {
            Number::from_f64(*number).map(Value::Number).unwrap_or(Value::Null)
        }
    }
}

fn attr_from_value(value: Value) -> AttrValue {
    match value {
        Value::Number(number) => AttrValue::Number(number.as_f64().unwrap_or(f64::NAN)),
        Value::String(text) => AttrValue::Text(text),
        other => AttrValue::Text(other.to_string()),
    }
}

fn crs_member(code: u32) -> Value {
    serde_json::json!({
        "type": "name",
        "properties": { "name": format!("urn:ogc:def:crs:EPSG::{}", code) }
    })
}

fn parse_crs_member(value: &Value) -> StormResult<u32> {
    let name = value.pointer("/properties/name")
        .and_then(Value::as_str)
        .ok_or_else(|| StormError::JsonError("malformed crs member".to_string()))?;
    let code = name.rsplit(':').next()
        .and_then(|tail| tail.parse::<u32>().ok())
        .ok_or_else(|| StormError::JsonError(format!("unrecognized crs name '{}'", name)))?;
    Ok(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_path_keeps_directory_and_stem() {
        let path = derive_output_path(Path::new("/data/depth_max.tif"), POLYGON_SUFFIX);
        assert_eq!(path, Path::new("/data/depth_max_polygons.geojson"));
        let path = derive_output_path(Path::new("scenario.tif"), POINT_SUFFIX);
        assert_eq!(path, Path::new("scenario_points.geojson"));
    }

    #[test]
    fn wgs84_document_has_no_crs_member() {
        let mut collection = FeatureCollection::new(Some(epsg::WGS84));
        collection.features.push(Feature::new(
            Geometry::Point(15.0, 59.0), "depth", AttrValue::Number(0.5)));
        let document = to_document(&collection).unwrap();
        assert!(document.crs.is_none());

        let json = serde_json::to_value(&document).unwrap();
        assert_eq!(json["type"], "FeatureCollection");
        assert_eq!(json["features"][0]["geometry"]["type"], "Point");
        assert_eq!(json["features"][0]["geometry"]["coordinates"][0], 15.0);
        assert_eq!(json["features"][0]["properties"]["depth"], 0.5);
    }

    #[test]
    fn projected_document_round_trips_its_reference() {
        let mut collection = FeatureCollection::new(Some(3006));
        collection.features.push(Feature::new(
            Geometry::Point(500000.0, 6500000.0), "depth", AttrValue::Number(1.25)));
        let document = to_document(&collection).unwrap();
        let code = parse_crs_member(document.crs.as_ref().unwrap()).unwrap();
        assert_eq!(code, 3006);
    }

    #[test]
    fn polygon_coordinates_nest_exterior_then_holes() {
        let exterior = Ring(vec![(0.0, 0.0), (2.0, 0.0), (2.0, 2.0), (0.0, 2.0), (0.0, 0.0)]);
        let hole = Ring(vec![(0.5, 0.5), (0.5, 1.5), (1.5, 1.5), (1.5, 0.5), (0.5, 0.5)]);
        let geometry = Geometry::Polygon(Polygon { exterior, holes: vec![hole] });
        match geometry_to_geojson(&geometry) {
            GeoJsonGeometry::Polygon(rings) => {
                assert_eq!(rings.len(), 2);
                assert_eq!(rings[0].len(), 5);
                assert_eq!(rings[0][0], [0.0, 0.0]);
                assert_eq!(rings[1][0], [0.5, 0.5]);
            }
            other => panic!("expected polygon, got {:?}", other),
        }
    }
}
