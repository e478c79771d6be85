//! N5 block encoding
//!
//! A block file is a big-endian header followed by the (compressed) element
//! payload:
//!
//! ```text
//! u16 mode | u16 ndim | u32 size[ndim] | (mode 1: u32 num_elements) | payload
//! ```
//!
//! `size` is fastest axis first. The payload is laid out x fastest, which is
//! C order for an array indexed (z, y, x).

use crate::compression::Compressor;
use crate::error::{N5Error, Result};
use crate::types::{reverse3, to_array_order, NDIM};
use bytes::{Buf, BufMut};

const MODE_DEFAULT: u16 = 0;
const MODE_VARLENGTH: u16 = 1;

/// A decoded block: shape in array order and its uncompressed payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataBlock {
    pub shape: [usize; 3],
    pub data: Vec<u8>,
}

/// Decode a block file
pub fn decode_block(
    mut bytes: &[u8],
    compressor: &dyn Compressor,
    element_size: usize,
) -> Result<DataBlock> {
    let truncated = || N5Error::InvalidFormat("truncated block header".to_string());

    if bytes.remaining() < 4 {
        return Err(truncated());
    }
    let mode = bytes.get_u16();
    let ndim = bytes.get_u16() as usize;
    if ndim != NDIM {
        return Err(N5Error::InvalidDimensions(format!(
            "block has {} dimensions, expected {}",
            ndim, NDIM
        )));
    }
    if bytes.remaining() < ndim * 4 {
        return Err(truncated());
    }
    let size: Vec<u32> = (0..ndim).map(|_| bytes.get_u32()).collect();
    let shape = to_array_order(&size)?;
    let too_large = || N5Error::InvalidFormat(format!("block of {:?} elements is too large", size));
    let voxels = shape
        .iter()
        .try_fold(1usize, |acc, &n| acc.checked_mul(n))
        .ok_or_else(too_large)?;
    let payload_len = voxels.checked_mul(element_size).ok_or_else(too_large)?;

    let num_elements = match mode {
        MODE_DEFAULT => voxels,
        MODE_VARLENGTH => {
            if bytes.remaining() < 4 {
                return Err(truncated());
            }
            bytes.get_u32() as usize
        }
        other => {
            return Err(N5Error::InvalidFormat(format!(
                "unsupported block mode {}",
                other
            )))
        }
    };

    let expected = num_elements.checked_mul(element_size).ok_or_else(too_large)?;
    let data = compressor.decompress(bytes, Some(expected))?;
    if data.len() < payload_len {
        return Err(N5Error::InvalidFormat(format!(
            "block payload has {} bytes, expected {}",
            data.len(),
            payload_len
        )));
    }

    Ok(DataBlock { shape, data })
}

/// Encode a block whose payload is already in N5 element byte order
pub fn encode_block(block: &DataBlock, compressor: &dyn Compressor) -> Result<Vec<u8>> {
    let payload = compressor.compress(&block.data)?;
    let mut out = Vec::with_capacity(4 + NDIM * 4 + payload.len());

    out.put_u16(MODE_DEFAULT);
    out.put_u16(NDIM as u16);
    for extent in reverse3(block.shape) {
        let extent = u32::try_from(extent)
            .map_err(|_| N5Error::InvalidDimensions(format!("block extent {} too large", extent)))?;
        out.put_u32(extent);
    }
    out.extend_from_slice(&payload);
    Ok(out)
}

/// Swap big-endian elements to little-endian in place
pub fn big_to_little_endian(data: &mut [u8], element_size: usize) {
    if element_size > 1 {
        for element in data.chunks_exact_mut(element_size) {
            element.reverse();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compression::{CompressionLevel, GzipCompressor, RawCompressor};

    #[test]
    fn test_header_layout() {
        let block = DataBlock {
            shape: [1, 2, 3],
            data: (0..6).collect(),
        };
        let encoded = encode_block(&block, &RawCompressor).unwrap();
        assert_eq!(
            encoded,
            vec![
                0, 0, // mode
                0, 3, // ndim
                0, 0, 0, 3, // x
                0, 0, 0, 2, // y
                0, 0, 0, 1, // z
                0, 1, 2, 3, 4, 5,
            ]
        );
        assert_eq!(decode_block(&encoded, &RawCompressor, 1).unwrap(), block);
    }

    #[test]
    fn test_gzip_block() {
        let block = DataBlock {
            shape: [4, 4, 4],
            data: vec![9; 64],
        };
        let compressor = GzipCompressor::default();
        let encoded = encode_block(&block, &compressor).unwrap();
        assert_eq!(decode_block(&encoded, &compressor, 1).unwrap(), block);
    }

    #[test]
    fn test_varlength_mode() {
        let mut encoded = vec![0, 1, 0, 3];
        for extent in [2u32, 1, 1] {
            encoded.extend_from_slice(&extent.to_be_bytes());
        }
        encoded.extend_from_slice(&2u32.to_be_bytes());
        encoded.extend_from_slice(&[7, 8]);

        let block = decode_block(&encoded, &RawCompressor, 1).unwrap();
        assert_eq!(block.shape, [1, 1, 2]);
        assert_eq!(block.data, vec![7, 8]);
    }

    #[test]
    fn test_malformed_blocks() {
        assert!(decode_block(&[0, 0], &RawCompressor, 1).is_err());
        assert!(decode_block(&[0, 2, 0, 3], &RawCompressor, 1).is_err());

        let mut short = vec![0, 0, 0, 3];
        for extent in [2u32, 2, 2] {
            short.extend_from_slice(&extent.to_be_bytes());
        }
        short.extend_from_slice(&[1, 2, 3]);
        assert!(decode_block(&short, &RawCompressor, 1).is_err());

        let mut huge = vec![0, 0, 0, 3];
        for extent in [u32::MAX; 3] {
            huge.extend_from_slice(&extent.to_be_bytes());
        }
        huge.extend_from_slice(&[1, 2, 3]);
        assert!(matches!(
            decode_block(&huge, &RawCompressor, 1),
            Err(N5Error::InvalidFormat(_))
        ));
        assert!(matches!(
            decode_block(&huge, &GzipCompressor::new(CompressionLevel::default()), 8),
            Err(N5Error::InvalidFormat(_))
        ));

        let mut wide = vec![0, 1, 0, 3];
        for extent in [u32::MAX, 1, 1] {
            wide.extend_from_slice(&extent.to_be_bytes());
        }
        wide.extend_from_slice(&u32::MAX.to_be_bytes());
        wide.extend_from_slice(&[1, 2, 3]);
        assert!(matches!(
            decode_block(&wide, &RawCompressor, 1),
            Err(N5Error::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_endian_swap() {
        let mut data = vec![0x01, 0x02, 0x03, 0x04];
        big_to_little_endian(&mut data, 2);
        assert_eq!(data, vec![0x02, 0x01, 0x04, 0x03]);
        big_to_little_endian(&mut data, 1);
        assert_eq!(data, vec![0x02, 0x01, 0x04, 0x03]);
    }
}
