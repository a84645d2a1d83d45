//! Vector geometry model
//!
//! Plain in-memory geometries for the vectorizer output: points and
//! polygons with holes, grouped into a feature collection that carries
//! one spatial reference for all of its members.

pub mod crs;
pub mod transform;

pub use transform::CrsTransformer;

/// A closed linear ring of (x, y) vertices; first vertex equals last
#[derive(Debug, Clone, PartialEq)]
pub struct Ring(pub Vec<(f64, f64)>);

impl Ring {
    /// Signed area via the shoelace formula
    ///
    /// Positive for counterclockwise orientation in conventional
    /// (x-east, y-north) axes.
    pub fn signed_area(&self) -> f64 {
        let points = &self.0;
        if points.len() < 4 {
            return 0.0;
        }
        let mut sum = 0.0;
        for pair in points.windows(2) {
            let (x0, y0) = pair[0];
            let (x1, y1) = pair[1];
            sum += x0 * y1 - x1 * y0;
        }
        sum / 2.0
    }

    /// Reverses the winding direction in place
    pub fn reverse(&mut self) {
        self.0.reverse();
    }

    /// Number of vertices including the closing one
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the ring has no vertices
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A polygon with an exterior ring and zero or more interior holes
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    pub exterior: Ring,
    pub holes: Vec<Ring>,
}

impl Polygon {
    /// Creates a polygon without holes
    pub fn new(exterior: Ring) -> Self {
        Polygon { exterior, holes: Vec::new() }
    }

    /// Normalizes winding to the GeoJSON convention:
    /// exterior counterclockwise, holes clockwise
    pub fn normalize_winding(&mut self) {
        if self.exterior.signed_area() < 0.0 {
            self.exterior.reverse();
        }
        for hole in &mut self.holes {
            if hole.signed_area() > 0.0 {
                hole.reverse();
            }
        }
    }
}

/// A point or polygon geometry
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Point(f64, f64),
    Polygon(Polygon),
    MultiPolygon(Vec<Polygon>),
}

impl Geometry {
    /// Applies a fallible transform to every vertex, producing a new geometry
    ///
    /// The first vertex failure aborts the whole mapping; no partially
    /// transformed geometry is ever returned.
    pub fn try_map_vertices<F>(&self, f: &mut F) -> Result<Geometry, String>
    where
        F: FnMut(f64, f64) -> Result<(f64, f64), String>,
    {
        let map_ring = |ring: &Ring, f: &mut F| -> Result<Ring, String> {
            let mut mapped = Vec::with_capacity(ring.0.len());
            for &(x, y) in &ring.0 {
                mapped.push(f(x, y)?);
            }
            Ok(Ring(mapped))
        };
        let map_polygon = |polygon: &Polygon, f: &mut F| -> Result<Polygon, String> {
            let exterior = map_ring(&polygon.exterior, f)?;
            let mut holes = Vec::with_capacity(polygon.holes.len());
            for hole in &polygon.holes {
                holes.push(map_ring(hole, f)?);
            }
            Ok(Polygon { exterior, holes })
        };

        match self {
            Geometry::Point(x, y) => {
                let (x, y) = f(*x, *y)?;
                Ok(Geometry::Point(x, y))
            }
            Geometry::Polygon(polygon) => Ok(Geometry::Polygon(map_polygon(polygon, f)?)),
            Geometry::MultiPolygon(polygons) => {
                let mut mapped = Vec::with_capacity(polygons.len());
                for polygon in polygons {
                    mapped.push(map_polygon(polygon, f)?);
                }
                Ok(Geometry::MultiPolygon(mapped))
            }
        }
    }
}

/// A flat attribute value on a feature
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Text(String),
    Number(f64),
}

/// One output record: a geometry plus flat attributes
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub geometry: Geometry,
    pub properties: Vec<(String, AttrValue)>,
}

impl Feature {
    /// Creates a feature with a single attribute
    pub fn new(geometry: Geometry, key: &str, value: AttrValue) -> Self {
        Feature {
            geometry,
            properties: vec![(key.to_string(), value)],
        }
    }
}

/// An ordered sequence of features sharing one spatial reference
#[derive(Debug, Clone, Default)]
pub struct FeatureCollection {
    pub features: Vec<Feature>,
    /// EPSG code the coordinates are expressed in, if known
    pub epsg: Option<u32>,
}

impl FeatureCollection {
    /// Creates an empty collection in the given reference
    pub fn new(epsg: Option<u32>) -> Self {
        FeatureCollection { features: Vec::new(), epsg }
    }

    /// Number of features
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// Whether the collection holds no features
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_square() -> Ring {
        Ring(vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0), (0.0, 0.0)])
    }

    #[test]
    fn shoelace_signed_area() {
        assert_eq!(unit_square().signed_area(), 1.0);
        let mut reversed = unit_square();
        reversed.reverse();
        assert_eq!(reversed.signed_area(), -1.0);
    }

    #[test]
    fn normalize_winding_fixes_orientation() {
        let mut exterior = unit_square();
        exterior.reverse(); // clockwise
        let mut hole = Ring(vec![
            (0.25, 0.25), (0.75, 0.25), (0.75, 0.75), (0.25, 0.75), (0.25, 0.25),
        ]); // counterclockwise
        let mut polygon = Polygon { exterior, holes: vec![hole.clone()] };
        polygon.normalize_winding();
        assert!(polygon.exterior.signed_area() > 0.0);
        assert!(polygon.holes[0].signed_area() < 0.0);
        hole.reverse();
        assert_eq!(polygon.holes[0], hole);
    }

    #[test]
    fn map_vertices_aborts_on_failure() {
        let geometry = Geometry::Polygon(Polygon::new(unit_square()));
        let result = geometry.try_map_vertices(&mut |x, _| {
            if x > 0.5 {
                Err("out of range".to_string())
            } else {
                Ok((x, 0.0))
            }
        });
        assert!(result.is_err());
    }
}
