//! Block grid - how a 3D array is divided into N5 blocks
//!
//! All coordinates here are in array order (z, y, x).

use crate::error::{N5Error, Result};
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Half-open box in array order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    pub min: [usize; 3],
    pub max: [usize; 3],
}

impl Bounds {
    pub fn new(min: [usize; 3], max: [usize; 3]) -> Self {
        Self { min, max }
    }

    /// Extent along each axis
    pub fn shape(&self) -> [usize; 3] {
        [
            self.max[0].saturating_sub(self.min[0]),
            self.max[1].saturating_sub(self.min[1]),
            self.max[2].saturating_sub(self.min[2]),
        ]
    }

    pub fn num_elements(&self) -> usize {
        self.shape().iter().product()
    }

    pub fn is_empty(&self) -> bool {
        self.num_elements() == 0
    }

    pub fn range(&self, axis: usize) -> Range<usize> {
        self.min[axis]..self.max[axis]
    }

    /// Overlap with another box, `None` when disjoint
    pub fn intersect(&self, other: &Bounds) -> Option<Bounds> {
        let mut out = *self;
        for axis in 0..3 {
            out.min[axis] = self.min[axis].max(other.min[axis]);
            out.max[axis] = self.max[axis].min(other.max[axis]);
            if out.min[axis] >= out.max[axis] {
                return None;
            }
        }
        Some(out)
    }
}

/// Shape of an array and of its blocks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockGrid {
    /// Array shape
    pub shape: [usize; 3],
    /// Block shape
    pub block_shape: [usize; 3],
}

impl BlockGrid {
    /// Create a new grid; block extents must be non-zero
    pub fn new(shape: [usize; 3], block_shape: [usize; 3]) -> Result<Self> {
        if block_shape.iter().any(|&b| b == 0) {
            return Err(N5Error::InvalidDimensions(format!(
                "block shape {:?} has a zero extent",
                block_shape
            )));
        }
        Ok(Self { shape, block_shape })
    }

    /// Get the number of blocks along each axis
    pub fn block_count(&self) -> [usize; 3] {
        let mut count = [0; 3];
        for (axis, c) in count.iter_mut().enumerate() {
            *c = self.shape[axis].div_ceil(self.block_shape[axis]);
        }
        count
    }

    /// Get the total number of blocks
    pub fn total_blocks(&self) -> usize {
        self.block_count().iter().product()
    }

    /// Voxel range covered by a block, trimmed to the array bounds
    pub fn block_bounds(&self, block: [usize; 3]) -> Bounds {
        let mut bounds = Bounds::new([0; 3], [0; 3]);
        for axis in 0..3 {
            let start = block[axis] * self.block_shape[axis];
            bounds.min[axis] = start;
            bounds.max[axis] = (start + self.block_shape[axis]).min(self.shape[axis]);
        }
        bounds
    }

    /// Whole array as a box
    pub fn full_bounds(&self) -> Bounds {
        Bounds::new([0; 3], self.shape)
    }

    /// Check that a box lies within the array
    pub fn contains(&self, bounds: &Bounds) -> bool {
        (0..3).all(|axis| bounds.min[axis] <= bounds.max[axis] && bounds.max[axis] <= self.shape[axis])
    }

    /// Block coordinates of every block overlapping a non-empty box, z slowest
    pub fn blocks_in(&self, bounds: &Bounds) -> Vec<[usize; 3]> {
        if bounds.is_empty() {
            return Vec::new();
        }

        let first: Vec<usize> = (0..3)
            .map(|axis| bounds.min[axis] / self.block_shape[axis])
            .collect();
        let last: Vec<usize> = (0..3)
            .map(|axis| (bounds.max[axis] - 1) / self.block_shape[axis])
            .collect();

        let mut blocks = Vec::new();
        for z in first[0]..=last[0] {
            for y in first[1]..=last[1] {
                for x in first[2]..=last[2] {
                    blocks.push([z, y, x]);
                }
            }
        }
        blocks
    }

    /// Get a summary string of the grid
    pub fn summary(&self) -> String {
        let size_str = self
            .shape
            .iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>()
            .join(" x ");

        format!(
            "{} voxels in {} blocks of {:?}",
            size_str,
            self.total_blocks(),
            self.block_shape
        )
    }
}
