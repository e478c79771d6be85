//! Dataset access - reading and writing boxes of an N5 array

use crate::block::{big_to_little_endian, decode_block, encode_block, DataBlock};
use crate::compression::get_compressor;
use crate::error::{N5Error, Result};
use crate::io::Store;
use crate::layout::{BlockGrid, Bounds};
use crate::metadata::{DatasetAttributes, ScaleAttributes};
use crate::types::DataType;
use crate::utils::{block_key, format_bytes};
use bytes::Bytes;
use futures::future::try_join_all;
use ndarray::{s, Array3, ArrayView3};
use std::sync::Arc;
use tracing::debug;

/// An opened N5 dataset (one 3D array)
#[derive(Clone)]
pub struct Dataset {
    /// Path of the dataset inside its container
    path: String,

    attributes: DatasetAttributes,

    grid: BlockGrid,

    store: Arc<dyn Store>,
}

impl std::fmt::Debug for Dataset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dataset")
            .field("path", &self.path)
            .field("grid", &self.grid)
            .field("data_type", &self.attributes.data_type)
            .finish()
    }
}

impl Dataset {
    pub(crate) fn new(
        store: Arc<dyn Store>,
        path: impl Into<String>,
        attributes: DatasetAttributes,
    ) -> Result<Self> {
        let grid = attributes.grid()?;
        Ok(Self {
            path: path.into(),
            attributes,
            grid,
            store,
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn attributes(&self) -> &DatasetAttributes {
        &self.attributes
    }

    /// Block grid in array order (z, y, x)
    pub fn grid(&self) -> &BlockGrid {
        &self.grid
    }

    /// Array shape in array order (z, y, x)
    pub fn shape(&self) -> [usize; 3] {
        self.grid.shape
    }

    /// Block shape in array order (z, y, x)
    pub fn block_shape(&self) -> [usize; 3] {
        self.grid.block_shape
    }

    pub fn data_type(&self) -> DataType {
        self.attributes.data_type
    }

    pub fn scale_attributes(&self) -> ScaleAttributes {
        self.attributes.scale_attributes()
    }

    /// Read one block; `None` if it was never written
    pub async fn read_block(&self, block: [usize; 3]) -> Result<Option<DataBlock>> {
        let key = block_key(&self.path, block);
        let Some(bytes) = self.store.read(&key).await? else {
            return Ok(None);
        };
        let compressor = get_compressor(&self.attributes.compression);
        let decoded = decode_block(
            &bytes,
            compressor.as_ref(),
            self.attributes.data_type.size_in_bytes(),
        )?;
        if (0..3).any(|axis| decoded.shape[axis] > self.grid.block_shape[axis]) {
            return Err(N5Error::InvalidFormat(format!(
                "{} has shape {:?}, larger than the block shape {:?}",
                key, decoded.shape, self.grid.block_shape
            )));
        }
        Ok(Some(decoded))
    }

    /// Write one block; `data` is in N5 element byte order, x fastest, and
    /// must cover the block trimmed to the array bounds
    pub async fn write_block(&self, block: [usize; 3], data: Vec<u8>) -> Result<()> {
        let count = self.grid.block_count();
        if (0..3).any(|axis| block[axis] >= count[axis]) {
            return Err(N5Error::OutOfBounds(format!(
                "block {:?} outside grid {:?}",
                block, count
            )));
        }

        let shape = self.grid.block_bounds(block).shape();
        let expected = shape.iter().product::<usize>() * self.attributes.data_type.size_in_bytes();
        if data.len() != expected {
            return Err(N5Error::InvalidDimensions(format!(
                "Data size mismatch: expected {} bytes, got {}",
                expected,
                data.len()
            )));
        }

        let compressor = get_compressor(&self.attributes.compression);
        let encoded = encode_block(&DataBlock { shape, data }, compressor.as_ref())?;
        self.store.write(&block_key(&self.path, block), &encoded).await
    }

    /// Read a box of the array.
    ///
    /// Returns the elements in C order (x fastest) with little-endian byte
    /// order. Missing blocks read as zeros. A box that is inverted or extends
    /// past the array is rejected.
    pub async fn read_box(&self, bounds: &Bounds) -> Result<Bytes> {
        if (0..3).any(|axis| bounds.min[axis] > bounds.max[axis]) {
            return Err(N5Error::InvalidRequest(format!(
                "inverted box {:?}..{:?}",
                bounds.min, bounds.max
            )));
        }
        if !self.grid.contains(bounds) {
            return Err(N5Error::OutOfBounds(format!(
                "box {:?}..{:?} exceeds array shape {:?}",
                bounds.min, bounds.max, self.grid.shape
            )));
        }

        let element_size = self.attributes.data_type.size_in_bytes();
        let out_shape = bounds.shape();
        let mut out = vec![0u8; bounds.num_elements() * element_size];

        let block_indices = self.grid.blocks_in(bounds);

        // Read all blocks concurrently
        let blocks = try_join_all(block_indices.iter().map(|&index| async move {
            let block = self.read_block(index).await?;
            Ok::<_, N5Error>((index, block))
        }))
        .await?;

        for (index, block) in blocks {
            let Some(block) = block else { continue };
            let origin = self.grid.block_bounds(index).min;
            let extent = Bounds::new(
                origin,
                [
                    origin[0] + block.shape[0],
                    origin[1] + block.shape[1],
                    origin[2] + block.shape[2],
                ],
            );
            let Some(region) = bounds.intersect(&extent) else {
                continue;
            };

            let run = (region.max[2] - region.min[2]) * element_size;
            for z in region.range(0) {
                for y in region.range(1) {
                    let src = (((z - origin[0]) * block.shape[1] + (y - origin[1]))
                        * block.shape[2]
                        + (region.min[2] - origin[2]))
                        * element_size;
                    let dst = (((z - bounds.min[0]) * out_shape[1] + (y - bounds.min[1]))
                        * out_shape[2]
                        + (region.min[2] - bounds.min[2]))
                        * element_size;
                    out[dst..dst + run].copy_from_slice(&block.data[src..src + run]);
                }
            }
        }

        big_to_little_endian(&mut out, element_size);
        debug!(
            "read {} from {} ({} blocks)",
            format_bytes(out.len()),
            self.path,
            block_indices.len()
        );
        Ok(Bytes::from(out))
    }

    /// Read a box of a `uint8` dataset as an array
    pub async fn read_array(&self, bounds: &Bounds) -> Result<Array3<u8>> {
        self.expect_u8()?;
        let bytes = self.read_box(bounds).await?;
        let shape = bounds.shape();
        Array3::from_shape_vec((shape[0], shape[1], shape[2]), bytes.to_vec())
            .map_err(|e| N5Error::InvalidDimensions(e.to_string()))
    }

    /// Write a whole `uint8` array, one block at a time
    pub async fn write_array(&self, array: ArrayView3<'_, u8>) -> Result<()> {
        self.expect_u8()?;
        let shape = self.grid.shape;
        if array.shape() != shape {
            return Err(N5Error::InvalidDimensions(format!(
                "array shape {:?} does not match dataset shape {:?}",
                array.shape(),
                shape
            )));
        }

        let blocks = self.grid.blocks_in(&self.grid.full_bounds());
        let writes = blocks.into_iter().map(|index| {
            let b = self.grid.block_bounds(index);
            let data: Vec<u8> = array
                .slice(s![b.range(0), b.range(1), b.range(2)])
                .iter()
                .copied()
                .collect();
            self.write_block(index, data)
        });
        try_join_all(writes).await?;
        Ok(())
    }

    fn expect_u8(&self) -> Result<()> {
        if self.attributes.data_type != DataType::Uint8 {
            return Err(N5Error::Metadata(format!(
                "{} has data type {}, expected uint8",
                self.path, self.attributes.data_type
            )));
        }
        Ok(())
    }
}
