//! Core data types for N5 arrays

use crate::error::{N5Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Element types an N5 dataset can declare in its `dataType` attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Int8,
    Int16,
    Int32,
    Int64,
    Float32,
    Float64,
}

impl DataType {
    /// Size in bytes of this data type
    pub fn size_in_bytes(&self) -> usize {
        match self {
            DataType::Uint8 | DataType::Int8 => 1,
            DataType::Uint16 | DataType::Int16 => 2,
            DataType::Uint32 | DataType::Int32 | DataType::Float32 => 4,
            DataType::Uint64 | DataType::Int64 | DataType::Float64 => 8,
        }
    }

    /// Name used in N5 attributes and the precomputed `data_type` field
    pub fn name(&self) -> &'static str {
        match self {
            DataType::Uint8 => "uint8",
            DataType::Uint16 => "uint16",
            DataType::Uint32 => "uint32",
            DataType::Uint64 => "uint64",
            DataType::Int8 => "int8",
            DataType::Int16 => "int16",
            DataType::Int32 => "int32",
            DataType::Int64 => "int64",
            DataType::Float32 => "float32",
            DataType::Float64 => "float64",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Number of axes every served array has
pub const NDIM: usize = 3;

/// Reverse a 3-vector between array order (z, y, x) and N5/wire order (x, y, z)
pub fn reverse3<T: Copy>(v: [T; 3]) -> [T; 3] {
    [v[2], v[1], v[0]]
}

/// Convert an N5 attribute vector (x, y, z) into array order (z, y, x)
pub fn to_array_order<T: Copy + Into<u64>>(n5: &[T]) -> Result<[usize; 3]> {
    if n5.len() != NDIM {
        return Err(N5Error::InvalidDimensions(format!(
            "expected {} dimensions, found {}",
            NDIM,
            n5.len()
        )));
    }
    let mut out = [0usize; 3];
    for (o, v) in out.iter_mut().zip(n5.iter().rev()) {
        *o = usize::try_from((*v).into())
            .map_err(|_| N5Error::InvalidDimensions("dimension exceeds usize".to_string()))?;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_type_sizes() {
        assert_eq!(DataType::Uint8.size_in_bytes(), 1);
        assert_eq!(DataType::Uint16.size_in_bytes(), 2);
        assert_eq!(DataType::Float32.size_in_bytes(), 4);
        assert_eq!(DataType::Float64.size_in_bytes(), 8);
    }

    #[test]
    fn test_data_type_serde_names() {
        let json = serde_json::to_string(&DataType::Uint8).unwrap();
        assert_eq!(json, "\"uint8\"");
        let parsed: DataType = serde_json::from_str("\"float64\"").unwrap();
        assert_eq!(parsed, DataType::Float64);
        assert_eq!(DataType::Int16.to_string(), "int16");
    }

    #[test]
    fn test_axis_order() {
        assert_eq!(reverse3([1, 2, 3]), [3, 2, 1]);
        assert_eq!(to_array_order(&[10u32, 20, 30]).unwrap(), [30, 20, 10]);
        assert!(to_array_order(&[10u32, 20]).is_err());
    }
}
