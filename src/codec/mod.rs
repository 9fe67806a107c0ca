//! Coordinate quantization and the packed region format.
//!
//! A region is a flat sequence of i32 values: quantized `(lon, lat)` pairs
//! for each ring in order, with rings separated by a single [`DELIMITER`].
//! Persisted blobs hold that sequence as consecutive little-endian i32s.
//!
//! ```text
//! lon0 lat0 lon1 lat1 ... DELIMITER lon0 lat0 ... DELIMITER ...
//! └──────── ring 0 ────┘           └─ ring 1 ─┘
//! ```

mod blob;
mod packer;
mod quantize;

pub use blob::{decode_blob, decode_region, encode_blob, VALUE_WIDTH};
pub use packer::{pack, unpack, unpack_degrees, PackedRegion};
pub use quantize::{dequantize, is_legal, quantize, DELIMITER, MAX_LAT, MAX_LON, SCALE};
