//! Polygon extraction from a classified grid
//!
//! Connected regions of equal class become polygon features. A region
//! is a 4-connected component; its outline is traced along cell edges,
//! so output polygons follow the pixel grid exactly. Interior islands
//! of invalid or differently classed cells become holes.
//!
//! Tracing works on directed boundary edges. Every cell side whose
//! neighbour lies outside the region contributes one directed edge,
//! oriented so the region interior stays on a consistent side. Chaining
//! the edges end to end yields closed rings; in pixel coordinates
//! (column right, row down) a positive shoelace area marks the exterior
//! ring and a negative one marks a hole.

use std::collections::{HashMap, VecDeque};

use log::{debug, info};

use crate::classify::{ClassifiedGrid, DepthBins};
use crate::geometry::{AttrValue, Feature, FeatureCollection, Geometry, Polygon, Ring};
use crate::grid::Grid;

/// Attribute carrying the depth interval label on polygon features
pub const DEPTH_CLASS_ATTRIBUTE: &str = "depth_class";

/// Grid corner in pixel coordinates, (column, row)
type Corner = (i64, i64);

/// Extracts one polygon feature per connected same-class region
///
/// Features are ordered by class index, then by the row-major position
/// of each region's first cell. An all-invalid grid yields an empty
/// collection, not an error.
pub fn extract_polygons(grid: &Grid, classified: &ClassifiedGrid, bins: &DepthBins) -> FeatureCollection {
    let mut collection = FeatureCollection::new(grid.epsg());
    let (rows, cols) = (classified.rows, classified.cols);

    // Component id per cell, one pass of flood fills; usize::MAX = unassigned
    let mut component = vec![usize::MAX; rows * cols];
    let mut regions: Vec<(usize, Vec<usize>)> = Vec::new();

    for row in 0..rows {
        for col in 0..cols {
            let idx = row * cols + col;
            if component[idx] != usize::MAX {
                continue;
            }
            let class = match classified.class_at(row, col) {
                Some(class) => class,
                None => continue,
            };
            let id = regions.len();
            let cells = flood_fill(classified, &mut component, id, row, col, class);
            regions.push((class, cells));
        }
    }

    regions.sort_by_key(|(class, cells)| (*class, cells[0]));
    info!("Found {} connected regions across {} classes", regions.len(), bins.len());

    for (class, cells) in &regions {
        let rings = trace_boundary(cells, &component, cols, rows);
        let polygon = assemble_polygon(rings, grid);
        debug!("Region class {} ({} cells): {} hole(s)",
               class, cells.len(), polygon.holes.len());
        collection.features.push(Feature::new(
            Geometry::Polygon(polygon),
            DEPTH_CLASS_ATTRIBUTE,
            AttrValue::Text(bins.label(*class).to_string()),
        ));
    }

    collection
}

/// Collects the 4-connected component containing (row, col), marking
/// each visited cell with `id`. Returns the cell indices in ascending
/// row-major order of discovery.
fn flood_fill(
    classified: &ClassifiedGrid,
    component: &mut [usize],
    id: usize,
    row: usize,
    col: usize,
    class: usize,
) -> Vec<usize> {
    let cols = classified.cols;
    let mut cells = Vec::new();
    let mut queue = VecDeque::new();

    component[row * cols + col] = id;
    queue.push_back((row, col));

    while let Some((r, c)) = queue.pop_front() {
        cells.push(r * cols + c);
        let mut visit = |nr: usize, nc: usize| {
            let nidx = nr * cols + nc;
            if component[nidx] == usize::MAX && classified.class_at(nr, nc) == Some(class) {
                component[nidx] = id;
                queue.push_back((nr, nc));
            }
        };
        if r > 0 { visit(r - 1, c); }
        if r + 1 < classified.rows { visit(r + 1, c); }
        if c > 0 { visit(r, c - 1); }
        if c + 1 < cols { visit(r, c + 1); }
    }

    cells.sort_unstable();
    cells
}

/// Traces all closed rings bounding one component
///
/// Each cell side facing a non-member neighbour contributes a directed
/// edge between grid corners. The directions run clockwise on screen
/// around the region, which makes the exterior ring's shoelace area
/// positive in (column, row) coordinates.
fn trace_boundary(cells: &[usize], component: &[usize], cols: usize, rows: usize) -> Vec<Vec<Corner>> {
    let id = component[cells[0]];
    let inside = |r: i64, c: i64| -> bool {
        r >= 0 && c >= 0 && (r as usize) < rows && (c as usize) < cols
            && component[r as usize * cols + c as usize] == id
    };

    let mut outgoing: HashMap<Corner, Vec<Corner>> = HashMap::new();
    let mut edge_count = 0usize;
    let add = |from: Corner, to: Corner, outgoing: &mut HashMap<Corner, Vec<Corner>>| {
        outgoing.entry(from).or_default().push(to);
    };

    for &idx in cells {
        let r = (idx / cols) as i64;
        let c = (idx % cols) as i64;
        if !inside(r - 1, c) {
            add((c, r), (c + 1, r), &mut outgoing);
            edge_count += 1;
        }
        if !inside(r, c + 1) {
            add((c + 1, r), (c + 1, r + 1), &mut outgoing);
            edge_count += 1;
        }
        if !inside(r + 1, c) {
            add((c + 1, r + 1), (c, r + 1), &mut outgoing);
            edge_count += 1;
        }
        if !inside(r, c - 1) {
            add((c, r + 1), (c, r), &mut outgoing);
            edge_count += 1;
        }
    }

    let mut rings = Vec::new();
    let mut consumed = 0usize;

    // Deterministic ring order: start each walk from the smallest
    // remaining corner rather than arbitrary hash order.
    while consumed < edge_count {
        let start = match outgoing
            .iter()
            .filter(|(_, ends)| !ends.is_empty())
            .map(|(&corner, _)| corner)
            .min()
        {
            Some(corner) => corner,
            None => break,
        };
        rings.push(walk_ring(start, &mut outgoing, &mut consumed));
    }

    rings
}

/// Follows directed edges from `start` until the ring closes
///
/// Where two rings touch at a single corner the walk has a choice of
/// outgoing edges; taking the tightest right turn relative to the
/// incoming direction keeps each ring separate instead of merging them
/// into a self-intersecting loop.
fn walk_ring(
    start: Corner,
    outgoing: &mut HashMap<Corner, Vec<Corner>>,
    consumed: &mut usize,
) -> Vec<Corner> {
    let mut ring = vec![start];
    let mut current = start;
    let mut direction: Option<(i64, i64)> = None;

    loop {
        let next = {
            let candidates = outgoing
                .get_mut(&current)
                .unwrap_or_else(|| unreachable!("boundary edges form closed cycles"));
            let pick = match direction {
                None => 0,
                Some(dir) => {
                    let mut best = 0;
                    let mut best_rank = u8::MAX;
                    for (i, &to) in candidates.iter().enumerate() {
                        let step = (to.0 - current.0, to.1 - current.1);
                        let rank = turn_rank(dir, step);
                        if rank < best_rank {
                            best_rank = rank;
                            best = i;
                        }
                    }
                    best
                }
            };
            candidates.swap_remove(pick)
        };
        *consumed += 1;
        direction = Some((next.0 - current.0, next.1 - current.1));
        ring.push(next);
        current = next;
        if current == start {
            break;
        }
    }

    compress_collinear(ring)
}

/// Ranks a candidate step relative to the incoming direction:
/// right turn first, then straight, then left. A reversal cannot occur
/// on a well-formed boundary.
fn turn_rank(incoming: (i64, i64), step: (i64, i64)) -> u8 {
    // Screen coordinates, row axis pointing down: a right turn rotates
    // (dx, dy) to (-dy, dx).
    let right = (-incoming.1, incoming.0);
    let left = (incoming.1, -incoming.0);
    if step == right {
        0
    } else if step == incoming {
        1
    } else if step == left {
        2
    } else {
        3
    }
}

/// Drops interior vertices of straight runs, keeping the closing vertex
fn compress_collinear(ring: Vec<Corner>) -> Vec<Corner> {
    if ring.len() < 4 {
        return ring;
    }
    // ring[0] == ring[last]; work on the open cycle then re-close it
    let open = &ring[..ring.len() - 1];
    let n = open.len();
    let mut kept = Vec::with_capacity(n);
    for i in 0..n {
        let prev = open[(i + n - 1) % n];
        let here = open[i];
        let next = open[(i + 1) % n];
        let a = (here.0 - prev.0, here.1 - prev.1);
        let b = (next.0 - here.0, next.1 - here.1);
        if a.0 * b.1 - a.1 * b.0 != 0 {
            kept.push(here);
        }
    }
    if let Some(&first) = kept.first() {
        kept.push(first);
    }
    kept
}

/// Signed shoelace area of a closed pixel-space ring
fn pixel_area(ring: &[Corner]) -> i64 {
    let mut sum = 0i64;
    for pair in ring.windows(2) {
        sum += pair[0].0 * pair[1].1 - pair[1].0 * pair[0].1;
    }
    sum
}

/// Maps pixel rings to world space and splits exterior from holes
///
/// A 4-connected component has exactly one exterior ring; every
/// negative-area ring encloses an island and becomes a hole. Winding is
/// normalized in world coordinates since a north-up transform flips
/// orientation.
fn assemble_polygon(rings: Vec<Vec<Corner>>, grid: &Grid) -> Polygon {
    let transform = grid.transform();
    let to_world = |ring: &[Corner]| -> Ring {
        Ring(ring.iter()
            .map(|&(col, row)| transform.corner(row as f64, col as f64))
            .collect())
    };

    let mut exterior = None;
    let mut holes = Vec::new();
    for ring in &rings {
        if pixel_area(ring) > 0 {
            exterior = Some(to_world(ring));
        } else {
            holes.push(to_world(ring));
        }
    }

    let mut polygon = Polygon {
        exterior: exterior.unwrap_or_else(|| unreachable!("component has an exterior ring")),
        holes,
    };
    polygon.normalize_winding();
    polygon
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::GridTransform;

    fn grid_from(rows: usize, cols: usize, values: &[f64]) -> Grid {
        let transform = GridTransform::new(1000.0, 2000.0, 2.0, -2.0);
        Grid::new(rows, cols, values.to_vec(), transform, Some(3006), None).unwrap()
    }

    fn polygons_of(rows: usize, cols: usize, values: &[f64]) -> FeatureCollection {
        let grid = grid_from(rows, cols, values);
        let bins = DepthBins::default();
        let classified = bins.classify_grid(&grid);
        extract_polygons(&grid, &classified, &bins)
    }

    fn exterior_of(feature: &Feature) -> &Ring {
        match &feature.geometry {
            Geometry::Polygon(polygon) => &polygon.exterior,
            other => panic!("expected polygon, got {:?}", other),
        }
    }

    #[test]
    fn single_cell_becomes_a_square() {
        let collection = polygons_of(1, 1, &[0.3]);
        assert_eq!(collection.len(), 1);
        assert_eq!(collection.epsg, Some(3006));

        let exterior = exterior_of(&collection.features[0]);
        assert_eq!(exterior.len(), 5);
        // 2 m cells anchored at (1000, 2000), row axis pointing south
        assert!(exterior.0.contains(&(1000.0, 2000.0)));
        assert!(exterior.0.contains(&(1002.0, 1998.0)));
        // Exterior counterclockwise in world coordinates
        assert!(exterior.signed_area() > 0.0);
        assert_eq!(
            collection.features[0].properties[0],
            (DEPTH_CLASS_ATTRIBUTE.to_string(), AttrValue::Text("0.2-0.5 m".to_string())),
        );
    }

    #[test]
    fn empty_mask_yields_empty_collection() {
        let collection = polygons_of(2, 2, &[0.0, 0.05, -1.0, 0.0]);
        assert!(collection.is_empty());
        assert_eq!(collection.epsg, Some(3006));
    }

    #[test]
    fn touching_cells_of_different_classes_stay_separate() {
        // Left column class 0, right column class 2
        let collection = polygons_of(2, 2, &[0.15, 0.6, 0.15, 0.6]);
        assert_eq!(collection.len(), 2);
        let labels: Vec<_> = collection.features.iter()
            .map(|f| &f.properties[0].1)
            .collect();
        assert_eq!(labels, vec![
            &AttrValue::Text("0.1-0.2 m".to_string()),
            &AttrValue::Text("0.5-1 m".to_string()),
        ]);
    }

    #[test]
    fn diagonal_cells_are_separate_regions() {
        let collection = polygons_of(2, 2, &[0.3, 0.0, 0.0, 0.3]);
        assert_eq!(collection.len(), 2);
    }

    #[test]
    fn island_becomes_a_hole() {
        // 3x3 ring of one class around an invalid centre
        let values = [
            0.3, 0.3, 0.3,
            0.3, 0.0, 0.3,
            0.3, 0.3, 0.3,
        ];
        let collection = polygons_of(3, 3, &values);
        assert_eq!(collection.len(), 1);
        let polygon = match &collection.features[0].geometry {
            Geometry::Polygon(polygon) => polygon,
            other => panic!("expected polygon, got {:?}", other),
        };
        assert_eq!(polygon.holes.len(), 1);
        assert!(polygon.exterior.signed_area() > 0.0);
        assert!(polygon.holes[0].signed_area() < 0.0);
        // Hole is the centre cell, 2 m on a side
        assert!((polygon.holes[0].signed_area().abs() - 4.0).abs() < 1e-9);
    }

    #[test]
    fn collinear_edges_are_merged() {
        // 1x3 run of one class: a rectangle needs only 5 vertices
        let collection = polygons_of(1, 3, &[0.3, 0.3, 0.4]);
        assert_eq!(collection.len(), 1);
        assert_eq!(exterior_of(&collection.features[0]).len(), 5);
    }

    #[test]
    fn checkerboard_corner_keeps_rings_separate() {
        // Two cells of the same class touching only diagonally are two
        // regions, each with a simple 4-corner outline
        let collection = polygons_of(2, 2, &[0.3, 0.0, 0.0, 0.4]);
        assert_eq!(collection.len(), 2);
        for feature in &collection.features {
            assert_eq!(exterior_of(feature).len(), 5);
        }
    }

    #[test]
    fn regions_ordered_by_class_then_position() {
        // Deep region appears first in the grid but sorts after shallow
        let values = [
            1.5, 0.0, 0.15,
            0.0, 0.0, 0.15,
        ];
        let collection = polygons_of(2, 3, &values);
        assert_eq!(collection.len(), 2);
        assert_eq!(
            collection.features[0].properties[0].1,
            AttrValue::Text("0.1-0.2 m".to_string()),
        );
        assert_eq!(
            collection.features[1].properties[0].1,
            AttrValue::Text("1.0<".to_string()),
        );
    }
}
