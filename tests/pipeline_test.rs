//! Integration tests for the depth raster pipeline

use std::io::Cursor;
use std::path::PathBuf;

use stormkit::classify::DepthBins;
use stormkit::geojson;
use stormkit::geometry::{AttrValue, CrsTransformer, Geometry};
use stormkit::grid::{Grid, GridTransform};
use stormkit::merge;
use stormkit::squares;
use stormkit::tiff::{GeoTiffReader, GeoTiffWriter};
use stormkit::vectorize::{extract_points, extract_polygons};

/// SWEREF99 TM grid anchored near the 15E central meridian
fn sweref_grid(rows: usize, cols: usize, values: &[f64], nodata: Option<f64>) -> Grid {
    let transform = GridTransform::new(500000.0, 6500000.0, 10.0, -10.0);
    Grid::new(rows, cols, values.to_vec(), transform, Some(3006), nodata).unwrap()
}

fn temp_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("stormkit_{}_{}", name, std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
fn tiff_round_trip_preserves_grid() {
    // Values chosen to be exact in f32
    let grid = sweref_grid(2, 3, &[0.0, 0.25, 0.5, 1.5, -9999.0, 0.125], Some(-9999.0));

    let bytes = GeoTiffWriter::new().build(&grid).unwrap();
    let mut cursor = Cursor::new(bytes);
    let mut reader = GeoTiffReader::new();
    let restored = reader.read_grid(&mut cursor).unwrap();

    assert_eq!(restored.rows(), 2);
    assert_eq!(restored.cols(), 3);
    assert_eq!(restored.data(), grid.data());
    assert_eq!(restored.transform(), grid.transform());
    assert_eq!(restored.epsg(), Some(3006));
    assert_eq!(restored.nodata(), Some(-9999.0));
    assert!(restored.is_nodata(1, 1));
}

#[test]
fn compressed_round_trip_matches_uncompressed() {
    let grid = sweref_grid(4, 4, &[0.5; 16], None);

    for name in ["deflate", "zstd"] {
        let bytes = GeoTiffWriter::with_compression(name).unwrap().build(&grid).unwrap();
        let mut cursor = Cursor::new(bytes);
        let restored = GeoTiffReader::new().read_grid(&mut cursor).unwrap();
        assert_eq!(restored.data(), grid.data(), "compression {}", name);
    }
}

#[test]
fn polygon_pipeline_produces_wgs84_geojson() {
    // 3x3 scenario: six cells inside the intervals, three dry
    let values = [
        0.0, 0.15, 0.25,
        0.6, 0.8, 1.2,
        0.0, 0.0, 0.5,
    ];
    let grid = sweref_grid(3, 3, &values, None);
    let bins = DepthBins::default();
    let classified = bins.classify_grid(&grid);
    assert_eq!(classified.valid_count(), 6);

    let collection = extract_polygons(&grid, &classified, &bins);
    assert!(!collection.is_empty());
    assert_eq!(collection.epsg, Some(3006));

    let wgs84 = CrsTransformer::reproject_collection(&collection, 4326).unwrap();
    assert_eq!(wgs84.len(), collection.len());
    assert_eq!(wgs84.epsg, Some(4326));

    // Every vertex must land near 15E, 58-59N
    for feature in &wgs84.features {
        feature.geometry.try_map_vertices(&mut |lon, lat| {
            assert!((14.9..15.1).contains(&lon), "lon {}", lon);
            assert!((58.0..59.5).contains(&lat), "lat {}", lat);
            Ok((lon, lat))
        }).unwrap();
    }

    let dir = temp_dir("polygons");
    let output = dir.join("scenario_polygons.geojson");
    geojson::write_collection(&wgs84, &output).unwrap();

    let text = std::fs::read_to_string(&output).unwrap();
    let json: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(json["type"], "FeatureCollection");
    assert!(json.get("crs").is_none());
    assert_eq!(json["features"].as_array().unwrap().len(), wgs84.len());
    assert_eq!(json["features"][0]["geometry"]["type"], "Polygon");
    assert!(json["features"][0]["properties"]["depth_class"].is_string());

    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn points_written_then_read_back_unchanged() {
    let values = [
        0.0, 0.3,
        1.5, 0.05,
    ];
    let grid = sweref_grid(2, 2, &values, None);
    let points = extract_points(&grid, 0.1);
    assert_eq!(points.len(), 2);

    let wgs84 = CrsTransformer::reproject_collection(&points, 4326).unwrap();

    let dir = temp_dir("points");
    let output = dir.join("scenario_points.geojson");
    geojson::write_collection(&wgs84, &output).unwrap();
    let restored = geojson::read_points(&output).unwrap();

    assert_eq!(restored.len(), 2);
    assert_eq!(restored.epsg, Some(4326));
    for (original, read_back) in wgs84.features.iter().zip(restored.features.iter()) {
        let (ox, oy) = match original.geometry {
            Geometry::Point(x, y) => (x, y),
            ref other => panic!("expected point, got {:?}", other),
        };
        let (rx, ry) = match read_back.geometry {
            Geometry::Point(x, y) => (x, y),
            ref other => panic!("expected point, got {:?}", other),
        };
        assert!((ox - rx).abs() < 1e-9 && (oy - ry).abs() < 1e-9);
        assert_eq!(original.properties, read_back.properties);
    }

    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn merged_mosaic_covers_both_tiles() {
    let dir = temp_dir("merge");

    // Two abutting 2x2 tiles at 10 m, the second shifted east
    let left = Grid::new(
        2, 2, vec![1.0; 4],
        GridTransform::new(500000.0, 6500000.0, 10.0, -10.0),
        Some(3006), None,
    ).unwrap();
    let right = Grid::new(
        2, 2, vec![2.0; 4],
        GridTransform::new(500020.0, 6500000.0, 10.0, -10.0),
        Some(3006), None,
    ).unwrap();

    let writer = GeoTiffWriter::new();
    writer.write_grid(&left, dir.join("a_left.tif")).unwrap();
    writer.write_grid(&right, dir.join("b_right.tif")).unwrap();

    let output = merge::derive_mosaic_path(&dir);
    let mosaic = merge::merge_folder(&dir, &output, None).unwrap();

    assert!(mosaic.rows() >= left.rows() && mosaic.rows() >= right.rows());
    assert!(mosaic.cols() >= left.cols() && mosaic.cols() >= right.cols());
    assert_eq!(mosaic.rows(), 2);
    assert_eq!(mosaic.cols(), 4);
    assert_eq!(mosaic.get(0, 0), 1.0);
    assert_eq!(mosaic.get(1, 3), 2.0);

    // The mosaic file itself reads back with the same content
    let restored = GeoTiffReader::new().read_grid_from_path(&output).unwrap();
    assert_eq!(restored.data(), mosaic.data());
    assert_eq!(restored.epsg(), Some(3006));

    // Rerunning with the mosaic present must not grow the canvas
    let again = merge::merge_folder(&dir, &output, None).unwrap();
    assert_eq!(again.rows(), 2);
    assert_eq!(again.cols(), 4);

    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn squares_rebuild_cell_footprints_from_points() {
    let grid = sweref_grid(2, 2, &[0.3, 0.4, 0.5, 0.6], None);
    let points = extract_points(&grid, 0.1);

    let dir = temp_dir("squares");
    let input = dir.join("depth_points.geojson");
    geojson::write_collection(&points, &input).unwrap();

    let restored = geojson::read_points(&input).unwrap();
    assert_eq!(restored.epsg, Some(3006));

    let size = squares::estimate_cell_size(&restored).unwrap();
    assert!((size - 10.0).abs() < 1e-9);

    let footprints = squares::points_to_squares(&restored, size).unwrap();
    assert_eq!(footprints.len(), 4);
    match &footprints.features[0].geometry {
        Geometry::Polygon(polygon) => {
            assert!((polygon.exterior.signed_area() - 100.0).abs() < 1e-6);
        }
        other => panic!("expected polygon, got {:?}", other),
    }
    assert_eq!(footprints.features[0].properties[0].1, AttrValue::Number(0.3));

    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn classification_is_stable_under_reapplication() {
    let values = [0.0, 0.15, 0.25, 0.6, 0.8, 1.2, 0.0, 0.0, 0.5];
    let grid = sweref_grid(3, 3, &values, None);
    let bins = DepthBins::default();

    let first = bins.classify_grid(&grid);
    let second = bins.classify_grid(&grid);
    assert_eq!(first.classes, second.classes);
    assert_eq!(first.mask, second.mask);
}
