/// Degrees are stored as `round(degrees * SCALE)`; about 1cm at the equator.
pub const SCALE: i32 = 10_000_000;

/// Ring separator. Larger than any quantized coordinate (|v| <= 180 * SCALE).
pub const DELIMITER: i32 = 200 * SCALE;

pub const MAX_LON: f64 = 180.0;
pub const MAX_LAT: f64 = 90.0;

pub fn quantize(degree: f64) -> i32 {
    (degree * SCALE as f64).round() as i32
}

pub fn dequantize(value: i32) -> f64 {
    value as f64 / SCALE as f64
}

/// Whether a vertex lies in the legal longitude/latitude ranges
pub fn is_legal(lon: f64, lat: f64) -> bool {
    lon.is_finite()
        && lat.is_finite()
        && (-MAX_LON..=MAX_LON).contains(&lon)
        && (-MAX_LAT..=MAX_LAT).contains(&lat)
}
