//! Packing rings into a delimited sequence, and splitting it back apart.

use geo::Coord;

use super::quantize::{dequantize, is_legal, quantize, DELIMITER};
use crate::error::{PackError, RegionError};
use crate::models::{Bounds, QuantizedRing, Ring};

/// Result of packing one boundary
#[derive(Debug, Clone, PartialEq)]
pub struct PackedRegion {
    /// Exact min/max over every vertex of every ring
    pub bounds: Bounds,
    pub values: Vec<i32>,
}

/// Quantize and flatten rings in source order, folding the bounding rectangle.
pub fn pack(rings: &[Ring]) -> Result<PackedRegion, PackError> {
    if rings.is_empty() {
        return Err(PackError::NoRings);
    }

    let capacity = rings.iter().map(|r| r.len() * 2).sum::<usize>() + rings.len() - 1;
    let last = rings.len() - 1;
    let start = PackedRegion {
        bounds: Bounds::EMPTY,
        values: Vec::with_capacity(capacity),
    };

    rings
        .iter()
        .enumerate()
        .try_fold(start, |mut packed, (ring_idx, ring)| {
            if ring.is_empty() {
                return Err(PackError::EmptyRing { ring: ring_idx });
            }

            for (vertex, coord) in ring.iter().enumerate() {
                if !is_legal(coord.x, coord.y) {
                    return Err(PackError::OutOfRange {
                        ring: ring_idx,
                        vertex,
                        lon: coord.x,
                        lat: coord.y,
                    });
                }
                let (lon, lat) = (quantize(coord.x), quantize(coord.y));
                packed.values.push(lon);
                packed.values.push(lat);
                packed.bounds = packed.bounds.extend(lon, lat);
            }

            if ring_idx != last {
                packed.values.push(DELIMITER);
            }
            Ok(packed)
        })
}

/// Split a packed sequence on the delimiter into quantized rings
pub fn unpack(values: &[i32]) -> Result<Vec<QuantizedRing>, RegionError> {
    if values.is_empty() {
        return Err(RegionError::Empty);
    }

    values
        .split(|v| *v == DELIMITER)
        .enumerate()
        .map(|(ring, chunk)| {
            if chunk.is_empty() {
                return Err(RegionError::EmptyRing { ring });
            }
            if chunk.len() % 2 != 0 {
                return Err(RegionError::OddLength {
                    ring,
                    len: chunk.len(),
                });
            }
            Ok(chunk.chunks_exact(2).map(|pair| (pair[0], pair[1])).collect())
        })
        .collect()
}

/// Like [`unpack`], with coordinates converted back to degrees
pub fn unpack_degrees(values: &[i32]) -> Result<Vec<Ring>, RegionError> {
    Ok(unpack(values)?
        .into_iter()
        .map(|ring| {
            ring.into_iter()
                .map(|(lon, lat)| Coord {
                    x: dequantize(lon),
                    y: dequantize(lat),
                })
                .collect()
        })
        .collect())
}
