//! Byte layout of the persisted `region` column.

use super::packer::unpack;
use crate::error::RegionError;
use crate::models::QuantizedRing;

/// Bytes per stored value (i32, little-endian)
pub const VALUE_WIDTH: usize = 4;

pub fn encode_blob(values: &[i32]) -> Vec<u8> {
    let mut blob = Vec::with_capacity(values.len() * VALUE_WIDTH);
    for value in values {
        blob.extend_from_slice(&value.to_le_bytes());
    }
    blob
}

pub fn decode_blob(blob: &[u8]) -> Result<Vec<i32>, RegionError> {
    if blob.len() % VALUE_WIDTH != 0 {
        return Err(RegionError::TruncatedBlob(blob.len()));
    }
    Ok(blob
        .chunks_exact(VALUE_WIDTH)
        .map(|b| i32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect())
}

/// Decode a stored blob straight into quantized rings
pub fn decode_region(blob: &[u8]) -> Result<Vec<QuantizedRing>, RegionError> {
    unpack(&decode_blob(blob)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::DELIMITER;

    #[test]
    fn test_blob_is_little_endian_i32() {
        let blob = encode_blob(&[1, -1, DELIMITER]);
        assert_eq!(
            blob,
            vec![
                0x01, 0x00, 0x00, 0x00, //
                0xff, 0xff, 0xff, 0xff, //
                0x00, 0x94, 0x35, 0x77,
            ]
        );
    }

    #[test]
    fn test_decode_region_from_blob() {
        let blob = encode_blob(&[10, 20, 30, 40, DELIMITER, -5, -6]);
        let rings = decode_region(&blob).unwrap();
        assert_eq!(rings, vec![vec![(10, 20), (30, 40)], vec![(-5, -6)]]);
    }

    #[test]
    fn test_decode_truncated_blob() {
        assert_eq!(decode_blob(&[0, 0, 0]), Err(RegionError::TruncatedBlob(3)));
    }
}
