//! Neuroglancer precomputed protocol on top of N5 multiscale groups
//!
//! Path grammar understood by the tile server (`{dataset}` may contain `/`):
//!
//! ```text
//! info  := {dataset} "/info"
//! chunk := {dataset} "/" level "/" x1 "-" x2 "_" y1 "-" y2 "_" z1 "-" z2
//! level := digit+
//! ```
//!
//! Scale levels of a group are the child datasets named `s{level}`. Any
//! subset of them may exist; no group attribute is required.

use crate::access::Dataset;
use crate::container::N5Container;
use crate::error::{N5Error, Result};
use crate::layout::Bounds;
use crate::metadata::resolve_resolution;
use crate::types::{reverse3, DataType};
use crate::utils::join_key;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

/// Encoding of every served scale
pub const RAW_ENCODING: &str = "raw";

/// Name of the dataset holding a scale level
pub fn level_name(level: u32) -> String {
    format!("s{}", level)
}

/// Parse an `s{level}` name; `None` for anything else
pub fn parse_level_name(name: &str) -> Option<u32> {
    let digits = name.strip_prefix('s')?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Requested box in wire order (x, y, z), half-open
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkBox {
    pub min: [usize; 3],
    pub max: [usize; 3],
}

impl ChunkBox {
    /// Same box in array order (z, y, x)
    pub fn to_bounds(&self) -> Bounds {
        Bounds::new(reverse3(self.min), reverse3(self.max))
    }
}

impl FromStr for ChunkBox {
    type Err = N5Error;

    fn from_str(s: &str) -> Result<Self> {
        let bad = || N5Error::InvalidRequest(format!("malformed chunk name {:?}", s));

        let ranges: Vec<&str> = s.split('_').collect();
        if ranges.len() != 3 {
            return Err(bad());
        }

        let mut out = ChunkBox {
            min: [0; 3],
            max: [0; 3],
        };
        for (axis, range) in ranges.iter().enumerate() {
            let (lo, hi) = range.split_once('-').ok_or_else(bad)?;
            let parse = |v: &str| -> Result<usize> {
                if v.is_empty() || !v.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(bad());
                }
                v.parse().map_err(|_| bad())
            };
            out.min[axis] = parse(lo)?;
            out.max[axis] = parse(hi)?;
            if out.min[axis] > out.max[axis] {
                return Err(N5Error::InvalidRequest(format!(
                    "inverted range {:?} in chunk name",
                    range
                )));
            }
        }
        Ok(out)
    }
}

impl fmt::Display for ChunkBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}_{}-{}_{}-{}",
            self.min[0], self.max[0], self.min[1], self.max[1], self.min[2], self.max[2]
        )
    }
}

/// A parsed tile server path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Info {
        dataset: String,
    },
    Chunk {
        dataset: String,
        level: u32,
        chunk: ChunkBox,
    },
}

/// Parse a request path (leading `/` optional).
///
/// Paths that fit neither shape are `NotFound`; a chunk path whose box is
/// malformed is `InvalidRequest`.
pub fn parse_route(path: &str) -> Result<Route> {
    let path = path.trim_start_matches('/');
    let not_found = || N5Error::NotFound(format!("no route for /{}", path));

    if let Some(dataset) = path.strip_suffix("/info") {
        if dataset.is_empty() {
            return Err(not_found());
        }
        return Ok(Route::Info {
            dataset: dataset.to_string(),
        });
    }

    let mut parts = path.rsplitn(3, '/');
    let (Some(chunk), Some(level), Some(dataset)) = (parts.next(), parts.next(), parts.next())
    else {
        return Err(not_found());
    };
    if dataset.is_empty() || level.is_empty() || !level.bytes().all(|b| b.is_ascii_digit()) {
        return Err(not_found());
    }
    let level = level.parse().map_err(|_| not_found())?;
    if !chunk.contains('_') {
        return Err(not_found());
    }

    Ok(Route::Chunk {
        dataset: dataset.to_string(),
        level,
        chunk: chunk.parse()?,
    })
}

/// One entry of the `scales` list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScaleInfo {
    pub chunk_sizes: Vec<[usize; 3]>,
    pub resolution: [f64; 3],
    pub size: [usize; 3],
    pub key: String,
    pub encoding: String,
    pub voxel_offset: [i64; 3],
}

impl ScaleInfo {
    /// Describe one level; shapes are reported in wire order
    pub fn from_dataset(dataset: &Dataset, level: u32, base_resolution: [f64; 3]) -> Self {
        let attributes = dataset.scale_attributes();
        Self {
            chunk_sizes: vec![reverse3(dataset.block_shape())],
            resolution: resolve_resolution(&attributes, base_resolution, level),
            size: reverse3(dataset.shape()),
            key: level.to_string(),
            encoding: RAW_ENCODING.to_string(),
            voxel_offset: attributes.voxel_offset(),
        }
    }
}

/// The `info` document of a precomputed image source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrecomputedInfo {
    pub data_type: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub num_channels: u32,
    pub scales: Vec<ScaleInfo>,
}

impl PrecomputedInfo {
    pub fn image(scales: Vec<ScaleInfo>) -> Self {
        Self {
            data_type: DataType::Uint8.name().to_string(),
            kind: "image".to_string(),
            num_channels: 1,
            scales,
        }
    }
}

/// Open the dataset holding one level of a group.
///
/// Level `N` lives at `{group}/sN`. A group that has no `s0` but is itself a
/// dataset is served as that dataset at level 0.
pub async fn open_level(container: &N5Container, group: &str, level: u32) -> Result<Dataset> {
    let path = join_key(group, &level_name(level));
    match container.open_dataset(&path).await {
        Err(N5Error::NotFound(_)) if level == 0 && container.is_dataset(group).await? => {
            container.open_dataset(group).await
        }
        opened => opened,
    }
}

/// Build the info document for a group, probing levels `0..max_levels`.
///
/// Missing levels are skipped, so scales come out in ascending level order
/// with holes closed up. Levels that exist but cannot be opened are logged
/// and skipped too. Only when no level is found is the group itself served
/// as a single level, if it is a dataset.
pub async fn build_info(
    container: &N5Container,
    group: &str,
    base_resolution: [f64; 3],
    max_levels: u32,
) -> Result<PrecomputedInfo> {
    let mut scales = Vec::new();

    for level in 0..max_levels {
        let path = join_key(group, &level_name(level));
        match container.open_dataset(&path).await {
            Ok(dataset) => scales.push(ScaleInfo::from_dataset(&dataset, level, base_resolution)),
            Err(N5Error::NotFound(_)) => debug!("{} has no level {}", group, level),
            Err(e) => warn!("skipping {} in {}: {}", path, container.root().display(), e),
        }
    }

    if scales.is_empty() {
        if !container.is_dataset(group).await? {
            return Err(N5Error::NotFound(format!(
                "no scale levels or dataset at {:?}",
                group
            )));
        }
        debug!("no scales found for {}, serving it as a single level", group);
        let dataset = container.open_dataset(group).await?;
        scales.push(ScaleInfo::from_dataset(&dataset, 0, base_resolution));
    }

    Ok(PrecomputedInfo::image(scales))
}
