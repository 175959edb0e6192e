//! GeoJSON polygon geometries used as region-query input.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{GridError, Result};

/// A `[lon, lat]` position. Extra members (altitude) are accepted and dropped.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "[f64; 2]")]
pub struct Position {
    pub lon: f64,
    pub lat: f64,
}

impl Position {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }
}

impl TryFrom<Vec<f64>> for Position {
    type Error = String;

    fn try_from(v: Vec<f64>) -> std::result::Result<Self, Self::Error> {
        match v.as_slice() {
            [lon, lat, ..] => Ok(Self::new(*lon, *lat)),
            _ => Err(format!("position needs at least 2 members, got {}", v.len())),
        }
    }
}

impl From<Position> for [f64; 2] {
    fn from(p: Position) -> Self {
        [p.lon, p.lat]
    }
}

/// Axis-aligned box in geographic degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl BoundingBox {
    pub fn new(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Self {
        Self {
            min_lon,
            min_lat,
            max_lon,
            max_lat,
        }
    }

    /// Inclusive containment test.
    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        lon >= self.min_lon && lon <= self.max_lon && lat >= self.min_lat && lat <= self.max_lat
    }

    pub fn width(&self) -> f64 {
        self.max_lon - self.min_lon
    }

    pub fn height(&self) -> f64 {
        self.max_lat - self.min_lat
    }

    fn empty() -> Self {
        Self::new(
            f64::INFINITY,
            f64::INFINITY,
            f64::NEG_INFINITY,
            f64::NEG_INFINITY,
        )
    }

    fn include(&mut self, p: &Position) {
        self.min_lon = self.min_lon.min(p.lon);
        self.min_lat = self.min_lat.min(p.lat);
        self.max_lon = self.max_lon.max(p.lon);
        self.max_lat = self.max_lat.max(p.lat);
    }
}

/// Nested coordinate arrays, walked recursively down to positions.
trait Positions {
    fn visit(&self, f: &mut dyn FnMut(&Position));
}

impl Positions for Position {
    fn visit(&self, f: &mut dyn FnMut(&Position)) {
        f(self)
    }
}

impl<T: Positions> Positions for Vec<T> {
    fn visit(&self, f: &mut dyn FnMut(&Position)) {
        for item in self {
            item.visit(f);
        }
    }
}

/// Polygon geometries accepted by area queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Geometry {
    /// Rings of positions; the first ring is the exterior.
    Polygon { coordinates: Vec<Vec<Position>> },

    /// One ring list per member polygon.
    MultiPolygon {
        coordinates: Vec<Vec<Vec<Position>>>,
    },
}

impl Geometry {
    /// Create a polygon geometry from `[lon, lat]` rings.
    pub fn polygon(rings: Vec<Vec<[f64; 2]>>) -> Self {
        Geometry::Polygon {
            coordinates: rings.into_iter().map(to_ring).collect(),
        }
    }

    /// Create a multipolygon geometry from per-polygon `[lon, lat]` rings.
    pub fn multi_polygon(polygons: Vec<Vec<Vec<[f64; 2]>>>) -> Self {
        Geometry::MultiPolygon {
            coordinates: polygons
                .into_iter()
                .map(|rings| rings.into_iter().map(to_ring).collect())
                .collect(),
        }
    }

    /// Parse a GeoJSON geometry, or a `Feature` wrapping one.
    pub fn from_geojson(text: &str) -> Result<Self> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| GridError::invalid_geometry(e.to_string()))?;
        Self::from_value(value)
    }

    /// Convert a parsed GeoJSON value, unwrapping `Feature` objects.
    pub fn from_value(value: Value) -> Result<Self> {
        let value = match value.get("type").and_then(Value::as_str) {
            Some("Feature") => value
                .get("geometry")
                .cloned()
                .ok_or_else(|| GridError::invalid_geometry("feature has no geometry"))?,
            Some("Polygon") | Some("MultiPolygon") => value,
            Some(other) => {
                return Err(GridError::invalid_geometry(format!(
                    "unsupported geometry type '{}'",
                    other
                )))
            }
            None => return Err(GridError::invalid_geometry("missing 'type' member")),
        };

        if value.get("type").and_then(Value::as_str) == Some("Feature") {
            return Err(GridError::invalid_geometry("nested features are not supported"));
        }

        serde_json::from_value(value).map_err(|e| GridError::invalid_geometry(e.to_string()))
    }

    /// Bounding box over every position of every ring, holes included.
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        let mut bbox = BoundingBox::empty();
        let mut seen = false;
        let mut visit = |p: &Position| {
            bbox.include(p);
            seen = true;
        };

        match self {
            Geometry::Polygon { coordinates } => coordinates.visit(&mut visit),
            Geometry::MultiPolygon { coordinates } => coordinates.visit(&mut visit),
        }

        seen.then_some(bbox)
    }

    /// Exterior rings of every member polygon.
    pub fn outer_rings(&self) -> Vec<&[Position]> {
        match self {
            Geometry::Polygon { coordinates } => {
                coordinates.first().map(Vec::as_slice).into_iter().collect()
            }
            Geometry::MultiPolygon { coordinates } => coordinates
                .iter()
                .filter_map(|rings| rings.first().map(Vec::as_slice))
                .collect(),
        }
    }

    /// Even-odd containment against the exterior rings; holes are not honored.
    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        self.outer_rings()
            .into_iter()
            .any(|ring| ring_contains(ring, lon, lat))
    }
}

fn to_ring(ring: Vec<[f64; 2]>) -> Vec<Position> {
    ring.into_iter().map(|[lon, lat]| Position::new(lon, lat)).collect()
}

/// Ray-casting point-in-polygon test for a single ring.
///
/// The ring does not need to repeat its first position at the end.
pub fn ring_contains(ring: &[Position], lon: f64, lat: f64) -> bool {
    let n = ring.len();
    if n < 3 {
        return false;
    }

    let mut inside = false;
    let mut j = n - 1;

    for i in 0..n {
        let (xi, yi) = (ring[i].lon, ring[i].lat);
        let (xj, yj) = (ring[j].lon, ring[j].lat);

        if ((yi > lat) != (yj > lat)) && (lon < (xj - xi) * (lat - yi) / (yj - yi) + xi) {
            inside = !inside;
        }
        j = i;
    }

    inside
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(min: f64, max: f64) -> Vec<[f64; 2]> {
        vec![[min, min], [max, min], [max, max], [min, max], [min, min]]
    }

    #[test]
    fn test_parse_polygon() {
        let geom = Geometry::from_geojson(
            r#"{"type":"Polygon","coordinates":[[[100,-5],[102,-5],[102,-3],[100,-3],[100,-5]]]}"#,
        )
        .unwrap();
        assert_eq!(geom.outer_rings().len(), 1);
        assert_eq!(geom.outer_rings()[0][1], Position::new(102.0, -5.0));
    }

    #[test]
    fn test_parse_feature_wrapper() {
        let geom = Geometry::from_geojson(
            r#"{"type":"Feature","properties":{"name":"x"},
                "geometry":{"type":"MultiPolygon","coordinates":[[[[0,0],[1,0],[1,1],[0,0]]]]}}"#,
        )
        .unwrap();
        assert!(matches!(geom, Geometry::MultiPolygon { .. }));
    }

    #[test]
    fn test_positions_with_altitude() {
        let geom = Geometry::from_geojson(
            r#"{"type":"Polygon","coordinates":[[[0,0,12],[1,0,12],[1,1,12],[0,0,12]]]}"#,
        )
        .unwrap();
        assert_eq!(geom.outer_rings()[0][2], Position::new(1.0, 1.0));
    }

    #[test]
    fn test_rejects_unsupported_types() {
        let err = Geometry::from_geojson(r#"{"type":"Point","coordinates":[0,0]}"#).unwrap_err();
        assert!(matches!(err, GridError::InvalidGeometry(_)));
        assert!(!err.is_malformed());

        let err = Geometry::from_geojson(r#"{"type":"Polygon","coordinates":[[[0]]]}"#).unwrap_err();
        assert!(matches!(err, GridError::InvalidGeometry(_)));

        assert!(Geometry::from_geojson("not json").is_err());
    }

    #[test]
    fn test_bounding_box_multi_polygon() {
        let geom = Geometry::multi_polygon(vec![
            vec![square(0.0, 1.0)],
            vec![square(5.0, 7.0)],
        ]);
        let bbox = geom.bounding_box().unwrap();
        assert_eq!(bbox, BoundingBox::new(0.0, 0.0, 7.0, 7.0));
        assert!((bbox.width() - 7.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_bounding_box_empty() {
        let geom = Geometry::Polygon {
            coordinates: vec![],
        };
        assert!(geom.bounding_box().is_none());
        assert!(!geom.contains(0.0, 0.0));
    }

    #[test]
    fn test_ring_contains() {
        let ring = to_ring(square(0.0, 2.0));
        assert!(ring_contains(&ring, 1.0, 1.0));
        assert!(!ring_contains(&ring, 3.0, 1.0));
        assert!(!ring_contains(&ring, 1.0, -0.5));

        // Open rings close implicitly
        let open = to_ring(vec![[0.0, 0.0], [2.0, 0.0], [2.0, 2.0], [0.0, 2.0]]);
        assert!(ring_contains(&open, 1.0, 1.0));
    }

    #[test]
    fn test_holes_are_ignored() {
        let geom = Geometry::polygon(vec![square(0.0, 4.0), square(1.0, 3.0)]);
        assert!(geom.contains(2.0, 2.0));
    }

    #[test]
    fn test_geometry_roundtrip_json() {
        let geom = Geometry::polygon(vec![square(0.0, 1.0)]);
        let json = serde_json::to_string(&geom).unwrap();
        assert!(json.contains("\"type\":\"Polygon\""));
        assert_eq!(Geometry::from_geojson(&json).unwrap(), geom);
    }
}
