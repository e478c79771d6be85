//! N5 attribute structures

use crate::compression::CompressionMethod;
use crate::error::{N5Error, Result};
use crate::layout::BlockGrid;
use crate::types::{reverse3, to_array_order, DataType};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Attribute key holding the container version
pub const VERSION_KEY: &str = "n5";
/// Attribute key marking a multiscale group
pub const DOWNSAMPLING_FACTORS_KEY: &str = "downsamplingFactors";
/// Attribute key holding a physical voxel size
pub const RESOLUTION_KEY: &str = "resolution";
/// Attribute key holding a voxel offset
pub const OFFSET_KEY: &str = "offset";

/// N5 format version stored in the root `attributes.json`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct N5Version {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl N5Version {
    /// Version written by this crate
    pub const CURRENT: Self = Self {
        major: 2,
        minor: 0,
        patch: 0,
    };

    /// Newest major version this crate understands
    pub const MAX_MAJOR: u32 = 4;

    pub fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    pub fn is_supported(&self) -> bool {
        self.major <= Self::MAX_MAJOR
    }
}

impl Default for N5Version {
    fn default() -> Self {
        Self::CURRENT
    }
}

impl fmt::Display for N5Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for N5Version {
    type Err = N5Error;

    fn from_str(s: &str) -> Result<Self> {
        // Suffixes such as "-SNAPSHOT" are ignored
        let core = s.split('-').next().unwrap_or_default();
        let mut parts = core.split('.').map(|p| p.parse::<u32>());
        let mut next = || -> Result<u32> {
            match parts.next() {
                Some(Ok(n)) => Ok(n),
                Some(Err(_)) => Err(N5Error::InvalidFormat(format!("bad N5 version {:?}", s))),
                None => Ok(0),
            }
        };
        let major = next()?;
        let minor = next()?;
        let patch = next()?;
        Ok(Self::new(major, minor, patch))
    }
}

/// Attributes of an N5 dataset (the array part of `attributes.json`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetAttributes {
    /// Array extent, fastest axis first (x, y, z)
    pub dimensions: Vec<u64>,
    /// Block extent, fastest axis first
    pub block_size: Vec<u32>,
    pub data_type: DataType,
    #[serde(default)]
    pub compression: CompressionMethod,
    /// User attributes stored alongside the array attributes
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl DatasetAttributes {
    /// Build attributes for a 3D array given in array order (z, y, x)
    pub fn new(
        shape: [usize; 3],
        block_shape: [usize; 3],
        data_type: DataType,
        compression: CompressionMethod,
    ) -> Result<Self> {
        let block_size = reverse3(block_shape)
            .iter()
            .map(|&b| {
                u32::try_from(b)
                    .map_err(|_| N5Error::InvalidDimensions(format!("block extent {} too large", b)))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            dimensions: reverse3(shape).iter().map(|&d| d as u64).collect(),
            block_size,
            data_type,
            compression,
            extra: Map::new(),
        })
    }

    /// Whether a raw attribute map describes a dataset rather than a group
    pub fn is_dataset(attributes: &Map<String, Value>) -> bool {
        attributes.contains_key("dimensions") && attributes.contains_key("dataType")
    }

    /// Block grid in array order; fails for anything but 3D arrays
    pub fn grid(&self) -> Result<BlockGrid> {
        if self.block_size.len() != self.dimensions.len() {
            return Err(N5Error::InvalidFormat(format!(
                "blockSize has {} entries but dimensions has {}",
                self.block_size.len(),
                self.dimensions.len()
            )));
        }
        BlockGrid::new(
            to_array_order(&self.dimensions)?,
            to_array_order(&self.block_size)?,
        )
    }

    /// Typed view of the scale attributes
    pub fn scale_attributes(&self) -> ScaleAttributes {
        ScaleAttributes::from_attributes(&self.extra)
    }
}

/// Scale related user attributes, all in wire order (x, y, z)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScaleAttributes {
    pub resolution: Option<[f64; 3]>,
    pub downsampling_factors: Option<[f64; 3]>,
    pub offset: Option<[i64; 3]>,
}

impl ScaleAttributes {
    /// Pick the scale attributes out of a loosely typed attribute map.
    /// Values of the wrong shape are treated as absent.
    pub fn from_attributes(attributes: &Map<String, Value>) -> Self {
        Self {
            resolution: attributes.get(RESOLUTION_KEY).and_then(float3),
            downsampling_factors: attributes.get(DOWNSAMPLING_FACTORS_KEY).and_then(float3),
            offset: attributes.get(OFFSET_KEY).and_then(int3),
        }
    }

    /// Voxel offset, zero when absent
    pub fn voxel_offset(&self) -> [i64; 3] {
        self.offset.unwrap_or([0; 3])
    }
}

fn float3(value: &Value) -> Option<[f64; 3]> {
    let values: Vec<f64> = serde_json::from_value(value.clone()).ok()?;
    values.try_into().ok()
}

fn int3(value: &Value) -> Option<[i64; 3]> {
    if let Ok(values) = serde_json::from_value::<Vec<i64>>(value.clone()) {
        return values.try_into().ok();
    }
    float3(value).map(|v| v.map(|c| c.round() as i64))
}

/// Physical voxel size of a scale level.
///
/// An explicit `resolution` wins, then `downsamplingFactors * base`, then
/// `base * 2^level`.
pub fn resolve_resolution(attributes: &ScaleAttributes, base: [f64; 3], level: u32) -> [f64; 3] {
    if let Some(resolution) = attributes.resolution {
        return resolution;
    }
    if let Some(factors) = attributes.downsampling_factors {
        return [base[0] * factors[0], base[1] * factors[1], base[2] * factors[2]];
    }
    let factor = 2f64.powi(level as i32);
    base.map(|b| b * factor)
}
