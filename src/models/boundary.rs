//! Boundary types, from raw source records to packed rows.

use geo::Coord;

use crate::codec;
use crate::error::RegionError;

/// One polygon ring in degrees, without a repeated closing vertex
pub type Ring = Vec<Coord<f64>>;

/// One ring of quantized (lon, lat) pairs
pub type QuantizedRing = Vec<(i32, i32)>;

/// ESRI shape type tag carried by each source record.
/// See: https://www.esri.com/content/dam/esrisites/sitecore-archive/Files/Pdfs/library/whitepapers/pdfs/shapefile.pdf
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShapeType {
    /// Null shape (0)
    Null,
    /// Point (1)
    Point,
    /// PolyLine (3)
    PolyLine,
    /// Polygon (5), the only type that gets packed
    Polygon,
    /// MultiPoint (8)
    MultiPoint,
    /// Anything else, kept as its raw code
    Other(i32),
}

impl ShapeType {
    /// Convert a shapefile shape type code to ShapeType
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => ShapeType::Null,
            1 => ShapeType::Point,
            3 => ShapeType::PolyLine,
            5 => ShapeType::Polygon,
            8 => ShapeType::MultiPoint,
            other => ShapeType::Other(other),
        }
    }

    /// Get the shapefile shape type code
    pub fn code(&self) -> i32 {
        match self {
            ShapeType::Null => 0,
            ShapeType::Point => 1,
            ShapeType::PolyLine => 3,
            ShapeType::Polygon => 5,
            ShapeType::MultiPoint => 8,
            ShapeType::Other(code) => *code,
        }
    }
}

impl std::fmt::Display for ShapeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShapeType::Null => write!(f, "null"),
            ShapeType::Point => write!(f, "point"),
            ShapeType::PolyLine => write!(f, "polyline"),
            ShapeType::Polygon => write!(f, "polygon"),
            ShapeType::MultiPoint => write!(f, "multipoint"),
            ShapeType::Other(code) => write!(f, "type {}", code),
        }
    }
}

/// A single record as delivered by a vertex source
#[derive(Debug, Clone, PartialEq)]
pub struct SourceRecord {
    /// Position of the record in its source
    pub index: usize,
    pub name: String,
    pub shape_type: ShapeType,
    /// Rings in source order; empty for non-polygon shapes
    pub rings: Vec<Ring>,
}

impl SourceRecord {
    pub fn polygon(index: usize, name: impl Into<String>, rings: Vec<Ring>) -> Self {
        Self {
            index,
            name: name.into(),
            shape_type: ShapeType::Polygon,
            rings,
        }
    }
}

/// Axis-aligned bounding rectangle in quantized coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    pub min_lon: i32,
    pub min_lat: i32,
    pub max_lon: i32,
    pub max_lat: i32,
}

impl Bounds {
    /// Neutral element for folding vertices into a rectangle
    pub const EMPTY: Bounds = Bounds {
        min_lon: i32::MAX,
        min_lat: i32::MAX,
        max_lon: i32::MIN,
        max_lat: i32::MIN,
    };

    pub fn new(min_lon: i32, min_lat: i32, max_lon: i32, max_lat: i32) -> Self {
        Self {
            min_lon,
            min_lat,
            max_lon,
            max_lat,
        }
    }

    /// Grow the rectangle to include a vertex
    pub fn extend(self, lon: i32, lat: i32) -> Self {
        Self {
            min_lon: self.min_lon.min(lon),
            min_lat: self.min_lat.min(lat),
            max_lon: self.max_lon.max(lon),
            max_lat: self.max_lat.max(lat),
        }
    }

    /// True until at least one vertex has been folded in
    pub fn is_empty(&self) -> bool {
        self.min_lon > self.max_lon || self.min_lat > self.max_lat
    }

    /// Edge-inclusive containment test
    pub fn contains(&self, lon: i32, lat: i32) -> bool {
        self.min_lon <= lon && lon <= self.max_lon && self.min_lat <= lat && lat <= self.max_lat
    }

    /// Rectangle in degrees as (min_lon, min_lat, max_lon, max_lat)
    pub fn to_degrees(&self) -> (f64, f64, f64, f64) {
        (
            codec::dequantize(self.min_lon),
            codec::dequantize(self.min_lat),
            codec::dequantize(self.max_lon),
            codec::dequantize(self.max_lat),
        )
    }
}

/// A named boundary ready to persist: rectangle plus packed ring sequence
#[derive(Debug, Clone, PartialEq)]
pub struct Boundary {
    pub name: String,
    pub bounds: Bounds,
    /// Quantized pairs, rings separated by [`codec::DELIMITER`]
    pub region: Vec<i32>,
}

impl Boundary {
    /// Decode the packed region back into quantized rings
    pub fn rings(&self) -> Result<Vec<QuantizedRing>, RegionError> {
        codec::unpack(&self.region)
    }

    /// Decode the packed region into rings in degrees
    pub fn rings_degrees(&self) -> Result<Vec<Ring>, RegionError> {
        codec::unpack_degrees(&self.region)
    }

    /// Number of rings in the packed region
    pub fn ring_count(&self) -> usize {
        if self.region.is_empty() {
            return 0;
        }
        self.region.iter().filter(|v| **v == codec::DELIMITER).count() + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_type_codes() {
        for code in [0, 1, 3, 5, 8, 15, 25, 31] {
            assert_eq!(ShapeType::from_code(code).code(), code);
        }
        assert_eq!(ShapeType::from_code(5), ShapeType::Polygon);
        assert_eq!(ShapeType::from_code(15), ShapeType::Other(15));
    }

    #[test]
    fn test_bounds_fold() {
        let bounds = [(3, -4), (-1, 7), (2, 2)]
            .iter()
            .fold(Bounds::EMPTY, |b, (lon, lat)| b.extend(*lon, *lat));
        assert_eq!(bounds, Bounds::new(-1, -4, 3, 7));
        assert!(!bounds.is_empty());
        assert!(Bounds::EMPTY.is_empty());
    }

    #[test]
    fn test_bounds_contains_edges() {
        let bounds = Bounds::new(0, 0, 10, 10);
        assert!(bounds.contains(0, 0));
        assert!(bounds.contains(10, 10));
        assert!(bounds.contains(5, 10));
        assert!(!bounds.contains(11, 5));
        assert!(!bounds.contains(5, -1));
    }

    #[test]
    fn test_bounds_in_degrees() {
        let bounds = Bounds::new(-739_857_000, 407_484_000, 25_000_000, 488_566_000);
        assert_eq!(bounds.to_degrees(), (-73.9857, 40.7484, 2.5, 48.8566));
    }
}
